// Two-slot combatant roster and the registry of battle sessions that own one.
//
// The roster stores meal ids only; the catalog owns the records. A process-wide
// legacy roster is always present, and callers may open session-scoped rosters
// to avoid battling each other's meals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::error::MealMaxError;

pub const ROSTER_CAPACITY: usize = 2;

/// Open sessions allowed before `open_session` refuses new ones.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Resolution state implied by the number of staged combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterState {
    Empty,
    Staging,
    Ready,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Roster {
    combatants: Vec<i64>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a meal. Fails without touching existing entries when full.
    pub fn prep(&mut self, meal_id: i64) -> Result<(), MealMaxError> {
        if self.combatants.len() >= ROSTER_CAPACITY {
            return Err(MealMaxError::RosterFull);
        }
        self.combatants.push(meal_id);
        Ok(())
    }

    /// Staged meal ids in staging order.
    pub fn list(&self) -> &[i64] {
        &self.combatants
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn clear(&mut self) {
        self.combatants.clear();
    }

    /// Drop every entry referencing `meal_id`. Returns how many were removed.
    pub fn evict(&mut self, meal_id: i64) -> usize {
        let before = self.combatants.len();
        self.combatants.retain(|&id| id != meal_id);
        before - self.combatants.len()
    }

    pub fn state(&self) -> RosterState {
        match self.combatants.len() {
            0 => RosterState::Empty,
            1 => RosterState::Staging,
            _ => RosterState::Ready,
        }
    }

    /// The two staged combatants, if the roster is ready.
    pub fn pair(&self) -> Result<(i64, i64), MealMaxError> {
        match self.combatants.as_slice() {
            [a, b] => Ok((*a, *b)),
            other => Err(MealMaxError::InsufficientCombatants {
                staged: other.len(),
            }),
        }
    }
}

pub type SharedRoster = Arc<AsyncMutex<Roster>>;

/// The legacy process-wide roster plus any session-scoped rosters.
#[derive(Debug, Clone)]
pub struct RosterRegistry {
    legacy: SharedRoster,
    sessions: Arc<Mutex<HashMap<Uuid, SharedRoster>>>,
    max_sessions: usize,
}

impl RosterRegistry {
    pub fn new() -> Self {
        Self::with_session_limit(DEFAULT_MAX_SESSIONS)
    }

    pub fn with_session_limit(max_sessions: usize) -> Self {
        Self {
            legacy: Arc::new(AsyncMutex::new(Roster::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions,
        }
    }

    /// Create a session roster. Fails once `max_sessions` are open.
    pub fn open_session(&self) -> Result<Uuid, MealMaxError> {
        let mut sessions = self.lock_sessions()?;
        if sessions.len() >= self.max_sessions {
            return Err(MealMaxError::TooManySessions {
                limit: self.max_sessions,
            });
        }
        let id = Uuid::new_v4();
        sessions.insert(id, Arc::new(AsyncMutex::new(Roster::new())));
        tracing::debug!(session = %id, "Opened battle session");
        Ok(id)
    }

    pub fn close_session(&self, id: Uuid) -> Result<(), MealMaxError> {
        match self.lock_sessions()?.remove(&id) {
            Some(_) => {
                tracing::debug!(session = %id, "Closed battle session");
                Ok(())
            }
            None => Err(session_not_found(id)),
        }
    }

    pub fn session_count(&self) -> Result<usize, MealMaxError> {
        Ok(self.lock_sessions()?.len())
    }

    /// Resolve the roster for a session, or the legacy roster when `None`.
    pub fn roster(&self, session: Option<Uuid>) -> Result<SharedRoster, MealMaxError> {
        match session {
            None => Ok(self.legacy.clone()),
            Some(id) => self
                .lock_sessions()?
                .get(&id)
                .cloned()
                .ok_or_else(|| session_not_found(id)),
        }
    }

    /// Remove references to a meal that left the catalog from every roster.
    pub async fn evict_everywhere(&self, meal_id: i64) -> Result<usize, MealMaxError> {
        let mut removed = 0;
        for roster in self.all_rosters()? {
            removed += roster.lock().await.evict(meal_id);
        }
        Ok(removed)
    }

    /// Empty every roster, e.g. after the catalog was cleared.
    pub async fn clear_everywhere(&self) -> Result<(), MealMaxError> {
        for roster in self.all_rosters()? {
            roster.lock().await.clear();
        }
        Ok(())
    }

    fn all_rosters(&self) -> Result<Vec<SharedRoster>, MealMaxError> {
        let mut rosters = vec![self.legacy.clone()];
        rosters.extend(self.lock_sessions()?.values().cloned());
        Ok(rosters)
    }

    fn lock_sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, SharedRoster>>, MealMaxError> {
        self.sessions
            .lock()
            .map_err(|_| MealMaxError::Internal("battle session registry lock poisoned".into()))
    }
}

impl Default for RosterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn session_not_found(id: Uuid) -> MealMaxError {
    MealMaxError::NotFound(format!("Battle session {id} not found"))
}
