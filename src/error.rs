// Error taxonomy shared by the catalog, roster, battle and leaderboard layers.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MealMaxError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Roster is full: two combatants are already staged")]
    RosterFull,

    #[error("Two combatants must be prepped for a battle ({staged} staged)")]
    InsufficientCombatants { staged: usize },

    #[error("Both combatants scored zero; cannot compute a score delta")]
    DegenerateScore,

    #[error("{0}")]
    ConcurrentModification(String),

    #[error("Too many open battle sessions (limit {limit})")]
    TooManySessions { limit: usize },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    RandomSourceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MealMaxError>;

impl MealMaxError {
    /// Stable snake_case identifier reported to callers and used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            MealMaxError::Validation(_) => "validation",
            MealMaxError::NotFound(_) => "not_found",
            MealMaxError::AlreadyExists(_) => "already_exists",
            MealMaxError::RosterFull => "roster_full",
            MealMaxError::InsufficientCombatants { .. } => "insufficient_combatants",
            MealMaxError::DegenerateScore => "degenerate_score",
            MealMaxError::ConcurrentModification(_) => "concurrent_modification",
            MealMaxError::TooManySessions { .. } => "too_many_sessions",
            MealMaxError::StoreUnavailable(_) => "store_unavailable",
            MealMaxError::RandomSourceUnavailable(_) => "random_source_unavailable",
            MealMaxError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MealMaxError::Validation(_) => StatusCode::BAD_REQUEST,
            MealMaxError::NotFound(_) => StatusCode::NOT_FOUND,
            MealMaxError::AlreadyExists(_)
            | MealMaxError::RosterFull
            | MealMaxError::InsufficientCombatants { .. }
            | MealMaxError::ConcurrentModification(_) => StatusCode::CONFLICT,
            MealMaxError::DegenerateScore => StatusCode::UNPROCESSABLE_ENTITY,
            MealMaxError::StoreUnavailable(_)
            | MealMaxError::RandomSourceUnavailable(_)
            | MealMaxError::TooManySessions { .. } => StatusCode::SERVICE_UNAVAILABLE,
            MealMaxError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Transient failures; the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MealMaxError::StoreUnavailable(_)
                | MealMaxError::ConcurrentModification(_)
                | MealMaxError::RandomSourceUnavailable(_)
                | MealMaxError::TooManySessions { .. }
        )
    }
}

impl From<sqlx::Error> for MealMaxError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => MealMaxError::StoreUnavailable(e.to_string()),
            sqlx::Error::Database(db_err)
                if db_err.code().is_some_and(|code| is_busy_or_locked(&code)) =>
            {
                MealMaxError::StoreUnavailable(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                MealMaxError::AlreadyExists(db_err.message().to_string())
            }
            _ => MealMaxError::Internal(e.to_string()),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes.
fn is_busy_or_locked(code: &str) -> bool {
    matches!(code.parse::<i32>().map(|c| c & 0xff), Ok(5 | 6))
}

impl IntoResponse for MealMaxError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{self}");
        } else {
            tracing::debug!(kind = self.kind(), "{self}");
        }
        (
            status,
            Json(json!({
                "status": "error",
                "kind": self.kind(),
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
