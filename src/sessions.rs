// src/sessions.rs
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::WorkoutSession;
use crate::store::{load_collection, save_collection, KeyValueStore, SESSIONS_KEY};

/// CRUD over the stored session collection (`workout-sessions`).
pub struct SessionRepository<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> SessionRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn load(&self) -> Result<Vec<WorkoutSession>> {
        Ok(load_collection(self.store, SESSIONS_KEY)?)
    }

    fn save(&self, sessions: &[WorkoutSession]) -> Result<()> {
        Ok(save_collection(self.store, SESSIONS_KEY, sessions)?)
    }

    pub fn create(&self, session: WorkoutSession) -> Result<WorkoutSession> {
        let mut sessions = self.load()?;
        sessions.push(session.clone());
        self.save(&sessions)?;
        info!(session_id = %session.id, plan_id = %session.workout_plan_id, "created workout session");
        Ok(session)
    }

    pub fn list(&self) -> Result<Vec<WorkoutSession>> {
        self.load()
    }

    pub fn get(&self, id: &str) -> Result<Option<WorkoutSession>> {
        let session = self.load()?.into_iter().find(|s| s.id == id);
        debug!(session_id = id, found = session.is_some(), "session lookup");
        Ok(session)
    }

    /// Overwrites the stored session with the same id. Unknown ids are ignored.
    pub fn update(&self, session: &WorkoutSession) -> Result<()> {
        let mut sessions = self.load()?;
        let Some(slot) = sessions.iter_mut().find(|s| s.id == session.id) else {
            debug!(session_id = %session.id, "update ignored, session not found");
            return Ok(());
        };
        *slot = session.clone();
        self.save(&sessions)
    }

    /// Removes the session with this id. Unknown ids are ignored.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut sessions = self.load()?;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() != before {
            self.save(&sessions)?;
            info!(session_id = id, "deleted workout session");
        }
        Ok(())
    }

    /// The most recently started session that is still in progress or paused.
    pub fn active(&self) -> Result<Option<WorkoutSession>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|s| !s.status.is_terminal())
            .max_by_key(|s| s.start_time))
    }

    /// Applies `edit` to one stored session and writes the collection back.
    /// Nothing is written if `edit` fails.
    pub(crate) fn mutate<F>(&self, id: &str, edit: F) -> Result<WorkoutSession>
    where
        F: FnOnce(&mut WorkoutSession) -> Result<()>,
    {
        let mut sessions = self.load()?;
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        edit(session)?;
        let updated = session.clone();
        self.save(&sessions)?;
        Ok(updated)
    }
}
