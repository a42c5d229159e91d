// Meal catalog storage (SQLite via sqlx).

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::MealMaxError;
use crate::meal::{BattleResult, Difficulty, Meal, ValidMeal};

#[derive(Debug, Clone, sqlx::FromRow)]
struct MealRow {
    id: i64,
    meal: String,
    cuisine: String,
    price: f64,
    difficulty: String,
    battles: i64,
    wins: i64,
    losses: i64,
    status: String,
}

impl TryFrom<MealRow> for Meal {
    type Error = MealMaxError;

    fn try_from(row: MealRow) -> Result<Self, Self::Error> {
        let difficulty: Difficulty = row.difficulty.parse().map_err(|_| {
            MealMaxError::Internal(format!(
                "meal {} has unknown difficulty '{}'",
                row.id, row.difficulty
            ))
        })?;
        Ok(Meal {
            id: row.id,
            meal: row.meal,
            cuisine: row.cuisine,
            price: row.price,
            difficulty,
            battles: row.battles,
            wins: row.wins,
            losses: row.losses,
            status: row.status.parse()?,
        })
    }
}

const MEAL_COLUMNS: &str = "id, meal, cuisine, price, difficulty, battles, wins, losses, status";

fn into_meals(rows: Vec<MealRow>) -> Result<Vec<Meal>, MealMaxError> {
    rows.into_iter().map(Meal::try_from).collect()
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meal TEXT NOT NULL,
                cuisine TEXT NOT NULL,
                price REAL NOT NULL CHECK (price > 0),
                difficulty TEXT NOT NULL CHECK (difficulty IN ('LOW', 'MED', 'HIGH')),
                battles INTEGER NOT NULL DEFAULT 0,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_meals_active_name
            ON meals (meal COLLATE NOCASE) WHERE status = 'active'
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Health ────────────────────────────────────────────────────────

    /// True when the store answers and the meals table exists.
    pub async fn check_health(&self) -> Result<bool, sqlx::Error> {
        let table: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'meals'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(table.is_some())
    }

    // ── Meal CRUD ─────────────────────────────────────────────────────

    pub async fn create_meal(&self, meal: &ValidMeal) -> Result<Meal, MealMaxError> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            "INSERT INTO meals (meal, cuisine, price, difficulty) VALUES (?, ?, ?, ?) RETURNING {MEAL_COLUMNS}"
        ))
        .bind(&meal.meal)
        .bind(&meal.cuisine)
        .bind(meal.price)
        .bind(meal.difficulty.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match MealMaxError::from(e) {
            MealMaxError::AlreadyExists(_) => MealMaxError::AlreadyExists(format!(
                "Meal with name '{}' already exists",
                meal.meal
            )),
            other => other,
        })?;
        row.try_into()
    }

    /// Fetch a meal regardless of its status.
    pub async fn get_meal(&self, id: i64) -> Result<Option<Meal>, MealMaxError> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Meal::try_from).transpose()
    }

    /// Exact, case-insensitive name lookup over active meals.
    pub async fn get_active_meal_by_name(&self, name: &str) -> Result<Option<Meal>, MealMaxError> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE meal = ? COLLATE NOCASE AND status = 'active'"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Meal::try_from).transpose()
    }

    /// Active meals in insertion order.
    pub async fn list_active_meals(&self) -> Result<Vec<Meal>, MealMaxError> {
        let rows = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE status = 'active' ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        into_meals(rows)
    }

    /// Mark an active meal deleted. Returns false if no active meal has that id.
    pub async fn soft_delete_meal(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE meals SET status = 'deleted', updated_at = datetime('now') WHERE id = ? AND status = 'active'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Physically remove every meal. AUTOINCREMENT keeps ids from being reused.
    pub async fn clear_meals(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meals")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ── Stats ─────────────────────────────────────────────────────────

    /// Apply one result to an active meal. Returns None if the meal is absent or deleted.
    pub async fn record_result(
        &self,
        id: i64,
        result: BattleResult,
    ) -> Result<Option<Meal>, MealMaxError> {
        let row = sqlx::query_as::<_, MealRow>(&format!(
            "UPDATE meals SET {}, updated_at = datetime('now') WHERE id = ? AND status = 'active' RETURNING {MEAL_COLUMNS}",
            stats_increment(result)
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Meal::try_from).transpose()
    }

    /// Record a battle: a win for `winner_id` and a loss for `loser_id` in one
    /// transaction. Returns None, with nothing written, if either meal is no
    /// longer active.
    pub async fn record_battle(
        &self,
        winner_id: i64,
        loser_id: i64,
    ) -> Result<Option<(Meal, Meal)>, MealMaxError> {
        let mut tx = self.pool.begin().await?;

        let winner = sqlx::query_as::<_, MealRow>(&format!(
            "UPDATE meals SET {}, updated_at = datetime('now') WHERE id = ? AND status = 'active' RETURNING {MEAL_COLUMNS}",
            stats_increment(BattleResult::Win)
        ))
        .bind(winner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let loser = sqlx::query_as::<_, MealRow>(&format!(
            "UPDATE meals SET {}, updated_at = datetime('now') WHERE id = ? AND status = 'active' RETURNING {MEAL_COLUMNS}",
            stats_increment(BattleResult::Loss)
        ))
        .bind(loser_id)
        .fetch_optional(&mut *tx)
        .await?;

        match (winner, loser) {
            (Some(winner), Some(loser)) => {
                tx.commit().await?;
                Ok(Some((winner.try_into()?, loser.try_into()?)))
            }
            _ => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }
}

fn stats_increment(result: BattleResult) -> &'static str {
    match result {
        BattleResult::Win => "battles = battles + 1, wins = wins + 1",
        BattleResult::Loss => "battles = battles + 1, losses = losses + 1",
    }
}
