use std::time::{
    Duration,
    Instant,
};

pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);
/// Terminal rows taken by one toast, border included.
pub const NOTIFICATION_STACK_OFFSET: u16 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub tx_hash: String,
    pub timestamp: Instant,
}

impl Notification {
    /// `0x12ab34cd...9f8e7d` style rendering of the transaction hash.
    pub fn short_hash(&self) -> String {
        let chars: Vec<char> = self.tx_hash.chars().collect();
        if chars.len() <= 14 {
            return self.tx_hash.clone();
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 6..].iter().collect();
        format!("{head}...{tail}")
    }

    pub fn expires_at(&self) -> Instant {
        self.timestamp + NOTIFICATION_TTL
    }
}

/// Transaction toasts in insertion order.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    next_id: u64,
    entries: Vec<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tx_hash: impl Into<String>, now: Instant) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;
        self.entries.push(Notification {
            id,
            tx_hash: tx_hash.into(),
            timestamp: now,
        });
        id
    }

    /// Returns `false` when the notification was already gone.
    pub fn remove(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Drops every notification whose lifetime has elapsed; returns how many.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| now < n.expires_at());
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row offset of the toast at `index`, counted from the first one.
    pub fn offset(index: usize) -> u16 {
        u16::try_from(index)
            .unwrap_or(u16::MAX)
            .saturating_mul(NOTIFICATION_STACK_OFFSET)
    }
}
