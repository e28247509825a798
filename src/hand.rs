pub const BLACKJACK: u32 = 21;

fn card_points(rank: u8) -> u32 {
    match rank {
        11..=13 => 10,
        other => u32::from(other),
    }
}

/// Blackjack total of a hand given as ranks (1 = ace, 11..=13 = faces).
///
/// Every ace starts at 1 and is upgraded to 11 while the total stays at or
/// below 21. The result is the best total that does not bust if one exists,
/// otherwise the smallest bust total. This is the same figure the table
/// contract reports in `bank_count` / `user_count`.
pub fn calculate_hand_value(ranks: &[u8]) -> u32 {
    let hard: u32 = ranks.iter().copied().map(card_points).sum();
    let aces = ranks.iter().filter(|rank| **rank == 1).count();

    let mut total = hard;
    for _ in 0..aces {
        if total + 10 > BLACKJACK {
            break;
        }
        total += 10;
    }
    total
}

pub fn is_blackjack(ranks: &[u8]) -> bool {
    ranks.len() == 2 && calculate_hand_value(ranks) == BLACKJACK
}

pub fn is_bust(ranks: &[u8]) -> bool {
    calculate_hand_value(ranks) > BLACKJACK
}
