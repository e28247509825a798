use crate::{
    error::ApiError,
    indexer_client::IndexerApi,
    table::{
        Token,
        TokenBalances,
    },
};
use std::time::{
    Duration,
    Instant,
};
use tracing::warn;

/// How long balances are considered unsettled after a transaction.
pub const BALANCE_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Assembles the player's balances from three independent lookups.
///
/// A lookup that fails is logged and leaves its fields unresolved; it never
/// affects the others.
pub async fn fetch_token_balances<I: IndexerApi>(
    indexer: &I,
    contract: &str,
    identity: &str,
) -> TokenBalances {
    let (custody, oranj, vitamin) = futures::join!(
        indexer.user_balances(contract, identity),
        indexer.token_balance(Token::Oranj, identity),
        indexer.token_balance(Token::Vitamin, identity),
    );

    let custody = custody
        .inspect_err(|err| warn!(?err, %contract, "failed to fetch deposited balances"))
        .ok();
    let oranj_balance = wallet_balance(Token::Oranj, oranj);
    let vit_balance = wallet_balance(Token::Vitamin, vitamin);

    TokenBalances {
        oranj_balance,
        oranj_deposited: custody.map(|c| c.oranj),
        vit_balance,
        vit_earned: custody.map(|c| c.vitamin),
    }
}

fn wallet_balance(token: Token, result: Result<u64, ApiError>) -> Option<u64> {
    result
        .inspect_err(|err| warn!(?err, %token, "failed to fetch wallet balance"))
        .ok()
}

/// Pending balance refetch.
///
/// Scheduling again before the refresh ran pushes it out, so a burst of
/// transactions leads to a single refetch once things settle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BalanceRefresh {
    due: Option<Instant>,
}

impl BalanceRefresh {
    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + BALANCE_SETTLE_DELAY);
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.due
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Returns `true` exactly once per schedule, when the delay has elapsed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }
}
