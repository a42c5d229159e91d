// Meal records and the input validation applied before they reach the catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MealMaxError;

/// Preparation difficulty of a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Low,
    Med,
    High,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Low => "LOW",
            Difficulty::Med => "MED",
            Difficulty::High => "HIGH",
        }
    }
}

impl FromStr for Difficulty {
    type Err = MealMaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Difficulty::Low),
            "MED" => Ok(Difficulty::Med),
            "HIGH" => Ok(Difficulty::High),
            other => Err(MealMaxError::Validation(format!(
                "Invalid difficulty level: {other}. Must be 'LOW', 'MED', or 'HIGH'."
            ))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a catalog record. Deleted meals keep their counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealStatus {
    Active,
    Deleted,
}

impl MealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MealStatus::Active => "active",
            MealStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for MealStatus {
    type Err = MealMaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MealStatus::Active),
            "deleted" => Ok(MealStatus::Deleted),
            other => Err(MealMaxError::Internal(format!("unknown meal status '{other}'"))),
        }
    }
}

/// Outcome of a single battle from one meal's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleResult {
    Win,
    Loss,
}

impl FromStr for BattleResult {
    type Err = MealMaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(BattleResult::Win),
            "loss" => Ok(BattleResult::Loss),
            other => Err(MealMaxError::Validation(format!(
                "Invalid result: {other}. Expected 'win' or 'loss'."
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meal {
    pub id: i64,
    pub meal: String,
    pub cuisine: String,
    pub price: f64,
    pub difficulty: Difficulty,
    pub battles: i64,
    pub wins: i64,
    pub losses: i64,
    pub status: MealStatus,
}

impl Meal {
    pub fn is_active(&self) -> bool {
        self.status == MealStatus::Active
    }

    pub fn battle_score(&self) -> f64 {
        crate::scoring::battle_score(self.price, &self.cuisine, self.difficulty)
    }

    pub fn win_pct(&self) -> f64 {
        if self.battles > 0 {
            self.wins as f64 / self.battles as f64
        } else {
            0.0
        }
    }
}

/// Unvalidated meal attributes, as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeal {
    pub meal: String,
    pub cuisine: String,
    pub price: f64,
    pub difficulty: String,
}

/// Meal attributes that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMeal {
    pub meal: String,
    pub cuisine: String,
    pub price: f64,
    pub difficulty: Difficulty,
}

impl NewMeal {
    pub fn validate(self) -> Result<ValidMeal, MealMaxError> {
        let meal = self.meal.trim().to_string();
        if meal.is_empty() {
            return Err(MealMaxError::Validation("Meal name must not be empty.".into()));
        }
        let cuisine = validate_cuisine(&self.cuisine)?;
        let price = validate_price(self.price)?;
        let difficulty = self.difficulty.parse()?;
        Ok(ValidMeal {
            meal,
            cuisine,
            price,
            difficulty,
        })
    }
}

pub fn validate_price(price: f64) -> Result<f64, MealMaxError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(MealMaxError::Validation(format!(
            "Invalid price: {price}. Price must be a positive number."
        )));
    }
    Ok(price)
}

pub fn validate_cuisine(cuisine: &str) -> Result<String, MealMaxError> {
    let cuisine = cuisine.trim();
    if cuisine.is_empty() {
        return Err(MealMaxError::Validation("Cuisine must not be empty.".into()));
    }
    Ok(cuisine.to_string())
}
