use crate::{
    card::{
        CardError,
        is_valid_rank,
    },
    hand::calculate_hand_value,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TableState {
    #[default]
    Ongoing,
    Won,
    Lost,
}

impl TableState {
    pub fn is_final(self) -> bool {
        !matches!(self, TableState::Ongoing)
    }
}

/// Server-authoritative view of one player's round.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub bank: Vec<u8>,
    pub user: Vec<u8>,
    #[serde(default)]
    pub bank_count: Option<u32>,
    #[serde(default)]
    pub user_count: Option<u32>,
    #[serde(default)]
    pub bet: u64,
    #[serde(default)]
    pub state: TableState,
    #[serde(default)]
    pub balance: Option<u64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BalanceMerge {
    /// Keep the locally known balance unless we have none yet.
    Preserve,
    /// The action moved funds, so the response's balance wins when present.
    Adopt,
}

impl GameState {
    pub fn validate(&self) -> Result<(), CardError> {
        match self
            .bank
            .iter()
            .chain(self.user.iter())
            .find(|rank| !is_valid_rank(**rank))
        {
            Some(rank) => Err(CardError(*rank)),
            None => Ok(()),
        }
    }

    pub fn dealer_total(&self) -> u32 {
        self.bank_count
            .unwrap_or_else(|| calculate_hand_value(&self.bank))
    }

    pub fn player_total(&self) -> u32 {
        self.user_count
            .unwrap_or_else(|| calculate_hand_value(&self.user))
    }

    /// Dealer's second card stays face down until the dealer draws or the
    /// round ends.
    pub fn dealer_hole_hidden(&self) -> bool {
        self.state == TableState::Ongoing && self.bank.len() <= 2
    }

    /// Folds a freshly received table into the local one.
    pub fn merged_with(&self, incoming: GameState, policy: BalanceMerge) -> GameState {
        let balance = match policy {
            BalanceMerge::Adopt => incoming.balance.or(self.balance),
            BalanceMerge::Preserve => self.balance.or(incoming.balance),
        };
        GameState {
            balance,
            ..incoming
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameResponse {
    pub tx_hash: String,
    pub table: GameState,
}

/// Indexed state of the blackjack contract.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContractState {
    #[serde(default)]
    pub tables: BTreeMap<String, GameState>,
    #[serde(default)]
    pub oranj_balances: BTreeMap<String, u64>,
    #[serde(default)]
    pub vitamin_balances: BTreeMap<String, u64>,
}

/// Balances assembled from independent sources; fields are not mutually
/// consistent. `None` marks a lookup that failed and is shown as zero.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenBalances {
    pub oranj_balance: Option<u64>,
    pub oranj_deposited: Option<u64>,
    pub vit_balance: Option<u64>,
    pub vit_earned: Option<u64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Oranj,
    Vitamin,
}

impl Token {
    pub fn contract_name(self) -> &'static str {
        match self {
            Token::Oranj => "oranj",
            Token::Vitamin => "vitamin",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

impl FromStr for Token {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oranj" => Ok(Token::Oranj),
            "vitamin" | "vit" => Ok(Token::Vitamin),
            other => Err(format!("unknown token '{other}'")),
        }
    }
}
