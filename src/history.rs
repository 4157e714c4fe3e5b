// src/history.rs
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::{HistoryRecord, SessionStatus, WorkoutSession};
use crate::store::{load_collection, save_collection, KeyValueStore, HISTORY_KEY};

/// Totals across the whole history list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HistorySummary {
    pub workouts: usize,
    pub total_minutes: u64,
    pub total_calories: f64,
    pub total_exercises: usize,
}

/// Append-only list of completed-session summaries (`workout-history`).
pub struct HistoryRecorder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> HistoryRecorder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Appends the summary of `session` and returns it.
    pub fn record(&self, session: &WorkoutSession) -> Result<HistoryRecord> {
        let entry = HistoryRecord {
            id: session.id.clone(),
            name: session.workout_plan.name.clone(),
            date: session.start_time,
            duration: session.total_duration.unwrap_or(0),
            calories_burned: session.total_calories.unwrap_or(0.0),
            exercises_completed: session.completed_exercises.len(),
            completed: session.status == SessionStatus::Completed,
        };

        let mut history: Vec<HistoryRecord> = load_collection(self.store, HISTORY_KEY)?;
        history.push(entry.clone());
        save_collection(self.store, HISTORY_KEY, &history)?;
        info!(session_id = %entry.id, duration = entry.duration, "recorded workout history");
        Ok(entry)
    }

    /// Drops the record for `session_id`, if any.
    pub(crate) fn remove(&self, session_id: &str) -> Result<()> {
        let mut history: Vec<HistoryRecord> = load_collection(self.store, HISTORY_KEY)?;
        let before = history.len();
        history.retain(|h| h.id != session_id);
        if history.len() != before {
            save_collection(self.store, HISTORY_KEY, &history)?;
            info!(session_id, "removed workout history record");
        }
        Ok(())
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> Result<Vec<HistoryRecord>> {
        Ok(load_collection(self.store, HISTORY_KEY)?)
    }

    /// Entries sorted newest first by session date.
    pub fn list(&self) -> Result<Vec<HistoryRecord>> {
        let mut history = self.entries()?;
        history.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(history)
    }

    pub fn summary(&self) -> Result<HistorySummary> {
        let summary = self
            .entries()?
            .iter()
            .filter(|h| h.completed)
            .fold(HistorySummary::default(), |mut acc, h| {
                acc.workouts += 1;
                acc.total_minutes += u64::from(h.duration);
                acc.total_calories += h.calories_burned;
                acc.total_exercises += h.exercises_completed;
                acc
            });
        Ok(summary)
    }
}
