// Battle score calculation.
//
// score = price * len(cuisine) - difficulty_penalty(difficulty)
// Harder dishes take a smaller subtraction.

use crate::meal::Difficulty;

pub const PENALTY_LOW: f64 = 3.0;
pub const PENALTY_MED: f64 = 2.0;
pub const PENALTY_HIGH: f64 = 1.0;

pub fn difficulty_penalty(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Low => PENALTY_LOW,
        Difficulty::Med => PENALTY_MED,
        Difficulty::High => PENALTY_HIGH,
    }
}

/// Price multiplier: number of characters in the cuisine label.
pub fn cuisine_weight(cuisine: &str) -> f64 {
    cuisine.chars().count() as f64
}

/// Compute the battle score for a meal's attributes.
pub fn battle_score(price: f64, cuisine: &str, difficulty: Difficulty) -> f64 {
    price * cuisine_weight(cuisine) - difficulty_penalty(difficulty)
}

/// Normalized score gap in [0, 1]. `None` when both scores are zero.
pub fn score_delta(score_a: f64, score_b: f64) -> Option<f64> {
    let total = score_a.abs() + score_b.abs();
    if total == 0.0 {
        return None;
    }
    Some((score_a - score_b).abs() / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_score_low_difficulty() {
        // 10.0 * len("Italian") - 3
        assert_eq!(battle_score(10.0, "Italian", Difficulty::Low), 67.0);
    }

    #[test]
    fn test_score_high_difficulty() {
        // 15.0 * len("Japanese") - 1
        assert_eq!(battle_score(15.0, "Japanese", Difficulty::High), 119.0);
    }

    #[test]
    fn test_score_low_price() {
        assert_eq!(battle_score(0.5, "American", Difficulty::Low), 1.0);
    }

    #[test]
    fn test_score_counts_characters_not_bytes() {
        assert_eq!(cuisine_weight("Crêpe"), 5.0);
    }

    #[test]
    fn test_penalty_ordering() {
        assert!(difficulty_penalty(Difficulty::High) <= difficulty_penalty(Difficulty::Med));
        assert!(difficulty_penalty(Difficulty::Med) <= difficulty_penalty(Difficulty::Low));
    }

    #[test]
    fn test_score_delta() {
        assert_eq!(score_delta(75.0, 25.0), Some(0.5));
        assert_eq!(score_delta(40.0, 40.0), Some(0.0));
        assert_eq!(score_delta(0.0, 0.0), None);
        let d = score_delta(-2.0, 2.0).unwrap();
        assert!((0.0..=1.0).contains(&d));
    }

    fn difficulty_strategy() -> impl Strategy<Value = Difficulty> {
        prop_oneof![
            Just(Difficulty::Low),
            Just(Difficulty::Med),
            Just(Difficulty::High)
        ]
    }

    proptest! {
        #[test]
        fn prop_score_increases_with_price(
            price in 0.01f64..10_000.0,
            bump in 0.01f64..100.0,
            cuisine in "[A-Za-z]{1,16}",
            difficulty in difficulty_strategy(),
        ) {
            let lower = battle_score(price, &cuisine, difficulty);
            let higher = battle_score(price + bump, &cuisine, difficulty);
            prop_assert!(higher > lower);
        }

        #[test]
        fn prop_delta_in_unit_range(a in -1_000.0f64..1_000.0, b in -1_000.0f64..1_000.0) {
            if let Some(d) = score_delta(a, b) {
                prop_assert!((0.0..=1.0).contains(&d));
            }
        }
    }
}
