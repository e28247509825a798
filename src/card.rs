use rand::Rng;
use std::fmt;

pub const SUITS: [Suit; 4] = [Suit::Spades, Suit::Clubs, Suit::Hearts, Suit::Diamonds];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Suit {
    Spades,
    Clubs,
    Hearts,
    Diamonds,
}

impl Suit {
    pub fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Clubs => '♣',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
        }
    }

    pub fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
    pub value: String,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.suit.symbol())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("card rank {0} is outside 1..=13")]
pub struct CardError(pub u8);

pub fn is_valid_rank(rank: u8) -> bool {
    (1..=13).contains(&rank)
}

/// Face label for a rank as dealt by the table contract.
pub fn rank_label(rank: u8) -> Result<String, CardError> {
    let label = match rank {
        1 => "A".to_string(),
        11 => "J".to_string(),
        12 => "Q".to_string(),
        13 => "K".to_string(),
        2..=10 => rank.to_string(),
        other => return Err(CardError(other)),
    };
    Ok(label)
}

/// Maps a rank to a displayable card.
///
/// The table only ever transmits ranks, so the suit is drawn uniformly at
/// random and carries no game meaning.
pub fn convert_to_card<R: Rng + ?Sized>(rank: u8, rng: &mut R) -> Result<Card, CardError> {
    let value = rank_label(rank)?;
    let suit = SUITS[rng.random_range(0..SUITS.len())];
    Ok(Card { rank, suit, value })
}
