// Leaderboard ranking over catalog statistics.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::error::MealMaxError;
use crate::meal::{Difficulty, Meal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Wins,
    WinPct,
}

impl FromStr for SortKey {
    type Err = MealMaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wins" => Ok(SortKey::Wins),
            "win_pct" => Ok(SortKey::WinPct),
            other => Err(MealMaxError::Validation(format!(
                "Invalid sort_by parameter: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MealSummary {
    pub id: i64,
    pub meal: String,
    pub cuisine: String,
    pub price: f64,
    pub difficulty: Difficulty,
    pub battles: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_pct: f64,
}

impl From<&Meal> for MealSummary {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id,
            meal: meal.meal.clone(),
            cuisine: meal.cuisine.clone(),
            price: meal.price,
            difficulty: meal.difficulty,
            battles: meal.battles,
            wins: meal.wins,
            losses: meal.losses,
            win_pct: meal.win_pct(),
        }
    }
}

fn compare(a: &MealSummary, b: &MealSummary, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::Wins => b.wins.cmp(&a.wins),
        SortKey::WinPct => b.win_pct.total_cmp(&a.win_pct),
    };
    primary
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rank active meals by `key` descending, then wins descending, then id ascending.
pub fn rank(meals: &[Meal], key: SortKey) -> Vec<MealSummary> {
    let mut summaries: Vec<MealSummary> = meals
        .iter()
        .filter(|m| m.is_active())
        .map(MealSummary::from)
        .collect();
    summaries.sort_by(|a, b| compare(a, b, key));
    summaries
}
