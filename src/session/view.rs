use super::{
    EffectKind,
    GameSession,
    Phase,
};
use crate::{
    card::Card,
    error::truncate_key,
    hand::calculate_hand_value,
    notifications::{
        NotificationId,
        NotificationQueue,
    },
    table::TokenBalances,
    wallet::WalletProvider,
};
use std::time::Instant;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CardView {
    FaceUp(Card),
    FaceDown,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HandView {
    pub cards: Vec<CardView>,
    /// Total of the face-up cards; `None` before the first deal.
    pub total: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NotificationView {
    pub id: NotificationId,
    pub short_hash: String,
    /// Rows below the first toast.
    pub offset: u16,
}

/// Everything a front-end needs to draw one frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub address: Option<String>,
    pub session_key: Option<String>,
    pub dealer: HandView,
    pub player: HandView,
    pub bet: u64,
    pub table_balance: Option<u64>,
    pub balances: Option<TokenBalances>,
    pub loading: bool,
    pub error: Option<String>,
    pub deposit_prompt: bool,
    pub offer_new_deal: bool,
    pub effect: Option<EffectKind>,
    pub notifications: Vec<NotificationView>,
}

impl<W: WalletProvider> GameSession<W> {
    pub fn view(&self, now: Instant) -> SessionView {
        let (dealer, player) = match &self.table {
            Some(table) => {
                let hole_hidden = table.dealer_hole_hidden();
                let dealer = if hole_hidden {
                    let visible: Vec<u8> = table
                        .bank
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| *index != 1)
                        .map(|(_, rank)| *rank)
                        .collect();
                    HandView {
                        cards: self
                            .dealer_cards
                            .iter()
                            .enumerate()
                            .map(|(index, card)| match index {
                                1 => CardView::FaceDown,
                                _ => CardView::FaceUp(card.clone()),
                            })
                            .collect(),
                        total: Some(calculate_hand_value(&visible)),
                    }
                } else {
                    HandView {
                        cards: face_up(&self.dealer_cards),
                        total: Some(table.dealer_total()),
                    }
                };
                let player = HandView {
                    cards: face_up(&self.player_cards),
                    total: Some(table.player_total()),
                };
                (dealer, player)
            }
            None => (HandView::default(), HandView::default()),
        };

        SessionView {
            phase: self.phase(),
            address: self.wallet.address().map(str::to_owned),
            session_key: self
                .wallet
                .session_key()
                .map(|key| truncate_key(&key.public_key)),
            dealer,
            player,
            bet: self.bet,
            table_balance: self.table.as_ref().and_then(|t| t.balance),
            balances: self.balances,
            loading: self.is_loading(),
            error: self.error.as_ref().map(ToString::to_string),
            deposit_prompt: self.deposit_prompt,
            offer_new_deal: self.offer_new_deal,
            effect: self.effect(now),
            notifications: self
                .notifications
                .iter()
                .enumerate()
                .map(|(index, n)| NotificationView {
                    id: n.id,
                    short_hash: n.short_hash(),
                    offset: NotificationQueue::offset(index),
                })
                .collect(),
        }
    }
}

fn face_up(cards: &[Card]) -> Vec<CardView> {
    cards.iter().cloned().map(CardView::FaceUp).collect()
}
