// Battle resolution: compare two scored combatants and settle the winner with a
// single uniform draw.
//
// If r < d the higher score wins, otherwise the lower score wins, where
// d = |a - b| / (|a| + |b|). Equal scores are a coin flip on r < 0.5.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::MealMaxError;
use crate::meal::Meal;
use crate::scoring::score_delta;

/// Which staged combatant won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Result of applying the resolution rule to two scores and a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub winner: Side,
    pub delta: f64,
    pub upset: bool,
}

pub fn decide(score_a: f64, score_b: f64, draw: f64) -> Result<Decision, MealMaxError> {
    let delta = score_delta(score_a, score_b).ok_or(MealMaxError::DegenerateScore)?;

    if score_a == score_b {
        let winner = if draw < 0.5 { Side::First } else { Side::Second };
        return Ok(Decision {
            winner,
            delta,
            upset: false,
        });
    }

    let (higher, lower) = if score_a > score_b {
        (Side::First, Side::Second)
    } else {
        (Side::Second, Side::First)
    };
    let upset = draw >= delta;
    Ok(Decision {
        winner: if upset { lower } else { higher },
        delta,
        upset,
    })
}

/// One side of a resolved battle as reported to the caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Combatant {
    pub id: i64,
    pub meal: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BattleOutcome {
    pub winner: Combatant,
    pub loser: Combatant,
    pub delta: f64,
    pub random_draw: f64,
    pub upset: bool,
    pub resolved_at: DateTime<Utc>,
}

impl BattleOutcome {
    pub fn new(first: &Meal, second: &Meal, draw: f64) -> Result<Self, MealMaxError> {
        let first = Combatant {
            id: first.id,
            meal: first.meal.clone(),
            score: first.battle_score(),
        };
        let second = Combatant {
            id: second.id,
            meal: second.meal.clone(),
            score: second.battle_score(),
        };
        let decision = decide(first.score, second.score, draw)?;
        let (winner, loser) = match decision.winner {
            Side::First => (first, second),
            Side::Second => (second, first),
        };
        Ok(Self {
            winner,
            loser,
            delta: decision.delta,
            random_draw: draw,
            upset: decision.upset,
            resolved_at: Utc::now(),
        })
    }
}
