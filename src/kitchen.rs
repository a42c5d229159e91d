// The meal battle service: catalog operations, combatant rosters, battle
// resolution and the leaderboard, behind one handle shared by the HTTP layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::battle::BattleOutcome;
use crate::db::Database;
use crate::error::{MealMaxError, Result};
use crate::leaderboard::{self, MealSummary, SortKey};
use crate::meal::{validate_cuisine, validate_price, BattleResult, Difficulty, Meal, NewMeal};
use crate::metrics;
use crate::random::RandomSource;
use crate::roster::{Roster, RosterRegistry};
use crate::scoring;

fn meal_not_found(id: i64) -> MealMaxError {
    MealMaxError::NotFound(format!("Meal with ID {id} not found"))
}

#[derive(Clone)]
pub struct Kitchen {
    db: Arc<Database>,
    rosters: RosterRegistry,
    random: Arc<dyn RandomSource>,
}

impl Kitchen {
    pub fn new(db: Arc<Database>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            db,
            rosters: RosterRegistry::new(),
            random,
        }
    }

    /// Replace the session registry with one capped at `max_sessions`.
    pub fn with_session_limit(mut self, max_sessions: usize) -> Self {
        self.rosters = RosterRegistry::with_session_limit(max_sessions);
        self
    }

    pub fn rosters(&self) -> &RosterRegistry {
        &self.rosters
    }

    pub async fn check_db(&self) -> Result<()> {
        if self.db.check_health().await? {
            Ok(())
        } else {
            Err(MealMaxError::StoreUnavailable(
                "meals table does not exist".into(),
            ))
        }
    }

    // ── Catalog ───────────────────────────────────────────────────────

    pub async fn create_meal(&self, new_meal: NewMeal) -> Result<Meal> {
        let valid = new_meal.validate()?;
        let meal = self.db.create_meal(&valid).await?;
        metrics::MEALS_CREATED_TOTAL.inc();
        tracing::info!(id = meal.id, "Created meal: {}", meal.meal);
        Ok(meal)
    }

    /// Soft-delete a meal and drop it from every roster.
    pub async fn delete_meal(&self, id: i64) -> Result<()> {
        if !self.db.soft_delete_meal(id).await? {
            return Err(match self.db.get_meal(id).await? {
                Some(_) => {
                    MealMaxError::NotFound(format!("Meal with ID {id} has already been deleted"))
                }
                None => meal_not_found(id),
            });
        }
        let evicted = self.rosters.evict_everywhere(id).await?;
        metrics::MEALS_DELETED_TOTAL.inc();
        tracing::info!(id, evicted, "Meal marked as deleted");
        self.observe_legacy_roster().await?;
        Ok(())
    }

    pub async fn get_meal(&self, id: i64) -> Result<Meal> {
        match self.db.get_meal(id).await? {
            Some(meal) if meal.is_active() => Ok(meal),
            Some(_) => Err(MealMaxError::NotFound(format!(
                "Meal with ID {id} has been deleted"
            ))),
            None => Err(meal_not_found(id)),
        }
    }

    pub async fn get_meal_by_name(&self, name: &str) -> Result<Meal> {
        self.db
            .get_active_meal_by_name(name)
            .await?
            .ok_or_else(|| MealMaxError::NotFound(format!("Meal with name {name} not found")))
    }

    pub async fn list_meals(&self) -> Result<Vec<Meal>> {
        self.db.list_active_meals().await
    }

    /// Hard reset: removes every meal, including soft-deleted ones, and empties all rosters.
    pub async fn clear_meals(&self) -> Result<u64> {
        let removed = self.db.clear_meals().await?;
        self.rosters.clear_everywhere().await?;
        metrics::LEGACY_ROSTER_SIZE.set(0);
        tracing::info!(removed, "Cleared all meals");
        Ok(removed)
    }

    pub async fn update_meal_stats(&self, id: i64, result: BattleResult) -> Result<Meal> {
        let meal = self
            .db
            .record_result(id, result)
            .await?
            .ok_or_else(|| meal_not_found(id))?;
        tracing::info!(id, ?result, "Updated meal stats");
        Ok(meal)
    }

    // ── Combatants ────────────────────────────────────────────────────

    /// Stage an active meal for the next battle and return the roster.
    pub async fn prep_combatant(&self, session: Option<Uuid>, id: i64) -> Result<Vec<Meal>> {
        let roster = self.rosters.roster(session)?;
        let mut roster = roster.lock().await;
        let meal = self.get_meal(id).await?;
        roster.prep(meal.id)?;
        tracing::debug!(id = meal.id, ?session, "Prepped combatant: {}", meal.meal);
        if session.is_none() {
            metrics::LEGACY_ROSTER_SIZE.set(roster.len() as i64);
        }
        self.load_combatants(&mut roster).await
    }

    pub async fn prep_combatant_by_name(
        &self,
        session: Option<Uuid>,
        name: &str,
    ) -> Result<Vec<Meal>> {
        let meal = self.get_meal_by_name(name).await?;
        self.prep_combatant(session, meal.id).await
    }

    pub async fn combatants(&self, session: Option<Uuid>) -> Result<Vec<Meal>> {
        let roster = self.rosters.roster(session)?;
        let mut roster = roster.lock().await;
        self.load_combatants(&mut roster).await
    }

    pub async fn clear_combatants(&self, session: Option<Uuid>) -> Result<()> {
        let roster = self.rosters.roster(session)?;
        roster.lock().await.clear();
        if session.is_none() {
            metrics::LEGACY_ROSTER_SIZE.set(0);
        }
        tracing::debug!(?session, "Cleared combatants");
        Ok(())
    }

    pub fn open_session(&self) -> Result<Uuid> {
        let id = self.rosters.open_session()?;
        metrics::BATTLE_SESSIONS_OPEN.set(self.rosters.session_count()? as i64);
        Ok(id)
    }

    pub fn close_session(&self, id: Uuid) -> Result<()> {
        self.rosters.close_session(id)?;
        metrics::BATTLE_SESSIONS_OPEN.set(self.rosters.session_count()? as i64);
        Ok(())
    }

    async fn load_combatants(&self, roster: &mut Roster) -> Result<Vec<Meal>> {
        let mut meals = Vec::with_capacity(roster.len());
        let mut stale = Vec::new();
        for &id in roster.list() {
            match self.db.get_meal(id).await? {
                Some(meal) if meal.is_active() => meals.push(meal),
                _ => stale.push(id),
            }
        }
        for id in stale {
            roster.evict(id);
        }
        Ok(meals)
    }

    async fn observe_legacy_roster(&self) -> Result<()> {
        let roster = self.rosters.roster(None)?;
        metrics::LEGACY_ROSTER_SIZE.set(roster.lock().await.len() as i64);
        Ok(())
    }

    // ── Scoring and battle ────────────────────────────────────────────

    /// Score meal attributes without touching the catalog.
    pub fn preview_score(&self, cuisine: &str, price: f64, difficulty: &str) -> Result<f64> {
        let cuisine = validate_cuisine(cuisine)?;
        let price = validate_price(price)?;
        let difficulty: Difficulty = difficulty.parse()?;
        Ok(scoring::battle_score(price, &cuisine, difficulty))
    }

    pub async fn score_meal(&self, id: i64) -> Result<f64> {
        Ok(self.get_meal(id).await?.battle_score())
    }

    /// Resolve the battle between the two staged combatants.
    pub async fn battle(&self, session: Option<Uuid>) -> Result<BattleOutcome> {
        let result = self.resolve(session).await;
        if let Err(e) = &result {
            metrics::BATTLES_FAILED_TOTAL
                .with_label_values(&[e.kind()])
                .inc();
            tracing::warn!(kind = e.kind(), "Battle failed: {e}");
        }
        result
    }

    async fn resolve(&self, session: Option<Uuid>) -> Result<BattleOutcome> {
        // The roster stays locked until the stats are written and it is cleared,
        // so prep/clear calls cannot interleave with a resolution.
        let roster = self.rosters.roster(session)?;
        let mut roster = roster.lock().await;
        let (first_id, second_id) = roster.pair()?;

        let (first, second) =
            futures::future::try_join(self.db.get_meal(first_id), self.db.get_meal(second_id))
                .await?;
        let (first, second) = match (
            first.filter(Meal::is_active),
            second.filter(Meal::is_active),
        ) {
            (Some(first), Some(second)) => (first, second),
            (first, second) => {
                if first.is_none() {
                    roster.evict(first_id);
                }
                if second.is_none() {
                    roster.evict(second_id);
                }
                return Err(MealMaxError::ConcurrentModification(
                    "A staged combatant was removed from the catalog".into(),
                ));
            }
        };

        tracing::info!(
            "Battle started between {} and {}",
            first.meal,
            second.meal
        );
        let draw = self.random.draw().await?;
        let outcome = BattleOutcome::new(&first, &second, draw)?;
        tracing::debug!(
            first_score = outcome_score(&outcome, first.id),
            second_score = outcome_score(&outcome, second.id),
            delta = outcome.delta,
            draw,
            "Scored combatants"
        );

        if self
            .db
            .record_battle(outcome.winner.id, outcome.loser.id)
            .await?
            .is_none()
        {
            // Nothing was written; drop whichever combatant went stale.
            self.load_combatants(&mut roster).await?;
            return Err(MealMaxError::ConcurrentModification(
                "A combatant was deleted while the battle was being recorded".into(),
            ));
        }

        roster.clear();
        if session.is_none() {
            metrics::LEGACY_ROSTER_SIZE.set(0);
        }
        metrics::BATTLES_RESOLVED_TOTAL.inc();
        metrics::BATTLE_SCORE.observe(outcome.winner.score);
        metrics::BATTLE_SCORE.observe(outcome.loser.score);
        if outcome.upset {
            metrics::BATTLE_UPSETS_TOTAL.inc();
        }
        tracing::info!("The winner is: {}", outcome.winner.meal);
        Ok(outcome)
    }

    // ── Leaderboard ───────────────────────────────────────────────────

    pub async fn leaderboard(&self, key: SortKey) -> Result<Vec<MealSummary>> {
        let meals = self.db.list_active_meals().await?;
        Ok(leaderboard::rank(&meals, key))
    }
}

fn outcome_score(outcome: &BattleOutcome, id: i64) -> f64 {
    if outcome.winner.id == id {
        outcome.winner.score
    } else {
        outcome.loser.score
    }
}
