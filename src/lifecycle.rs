// src/lifecycle.rs
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::ExerciseCatalog;
use crate::error::{Error, Result};
use crate::history::HistoryRecorder;
use crate::models::{CompletedExercise, SessionStatus, WorkoutPlan, WorkoutSession};
use crate::plans::PlanRepository;
use crate::sessions::SessionRepository;
use crate::store::KeyValueStore;

pub const TEMPLATE_TAG: &str = "template";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Pause,
    Resume,
    Complete,
    Cancel,
    LogExercise,
}

impl SessionAction {
    const fn verb(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::LogExercise => "log an exercise in",
        }
    }
}

/// Status a session moves to when `action` is applied in `from`, or `None`
/// if the state machine doesn't allow it. Terminal states allow nothing.
#[must_use]
pub const fn next_status(from: SessionStatus, action: SessionAction) -> Option<SessionStatus> {
    use SessionAction as A;
    use SessionStatus as S;
    match (from, action) {
        (S::InProgress, A::Pause) => Some(S::Paused),
        (S::Paused, A::Resume) => Some(S::InProgress),
        (S::InProgress | S::Paused, A::Complete) => Some(S::Completed),
        (S::InProgress | S::Paused, A::Cancel) => Some(S::Cancelled),
        (S::InProgress | S::Paused, A::LogExercise) => Some(from),
        _ => None,
    }
}

fn transition(session: &mut WorkoutSession, action: SessionAction) -> Result<()> {
    match next_status(session.status, action) {
        Some(next) => {
            session.status = next;
            Ok(())
        }
        None => {
            warn!(session_id = %session.id, status = %session.status, action = action.verb(), "rejected session transition");
            Err(Error::InvalidTransition {
                session_id: session.id.clone(),
                from: session.status,
                action: action.verb(),
            })
        }
    }
}

/// Drives sessions through in-progress → paused → completed/cancelled and
/// records history when a session completes.
pub struct SessionLifecycle<'a, S: ?Sized, C: ?Sized> {
    plans: PlanRepository<'a, S, C>,
    sessions: SessionRepository<'a, S>,
    history: HistoryRecorder<'a, S>,
}

impl<'a, S, C> SessionLifecycle<'a, S, C>
where
    S: KeyValueStore + ?Sized,
    C: ExerciseCatalog + ?Sized,
{
    pub fn new(store: &'a S, catalog: &'a C) -> Self {
        Self {
            plans: PlanRepository::new(store, catalog),
            sessions: SessionRepository::new(store),
            history: HistoryRecorder::new(store),
        }
    }

    /// Starts a session on a snapshot of the plan as it is right now.
    /// # Errors
    /// `Error::PlanNotFound` if the plan doesn't exist; no session is created.
    pub fn start(&self, plan_id: &str) -> Result<WorkoutSession> {
        let plan = self
            .plans
            .get(plan_id)?
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;

        let session = WorkoutSession {
            id: Uuid::new_v4().to_string(),
            workout_plan_id: plan.id.clone(),
            workout_plan: plan,
            start_time: Utc::now(),
            end_time: None,
            completed_exercises: Vec::new(),
            total_calories: None,
            total_duration: None,
            status: SessionStatus::InProgress,
        };
        self.sessions.create(session)
    }

    pub fn pause(&self, session_id: &str) -> Result<WorkoutSession> {
        let session = self
            .sessions
            .mutate(session_id, |s| transition(s, SessionAction::Pause))?;
        info!(session_id, "paused session");
        Ok(session)
    }

    pub fn resume(&self, session_id: &str) -> Result<WorkoutSession> {
        let session = self
            .sessions
            .mutate(session_id, |s| transition(s, SessionAction::Resume))?;
        info!(session_id, "resumed session");
        Ok(session)
    }

    /// Ends the session, fills in its totals and appends a history record.
    /// # Errors
    /// - `Error::SessionNotFound` for an unknown id.
    /// - `Error::InvalidTransition` if the session already ended.
    /// - `Error::InvalidInput` for negative calories.
    /// - `Error::Store` if either write fails; the session then stays as it was
    ///   and no history record is left behind.
    pub fn complete(&self, session_id: &str, total_calories: Option<f64>) -> Result<WorkoutSession> {
        if let Some(c) = total_calories {
            if !c.is_finite() || c < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "Calories must be a non-negative number, got {c}."
                )));
            }
        }

        let mut session = self
            .sessions
            .get(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        transition(&mut session, SessionAction::Complete)?;
        session.end_time = Some(Utc::now());
        session.total_calories = total_calories;
        session.total_duration = session.elapsed_minutes();

        // History goes first; the session only turns terminal once its record exists.
        self.history.record(&session)?;
        if let Err(err) = self.sessions.update(&session) {
            if let Err(undo) = self.history.remove(&session.id) {
                warn!(session_id, error = %undo, "failed to roll back history record");
            }
            return Err(err);
        }
        info!(session_id, minutes = ?session.total_duration, "completed session");
        Ok(session)
    }

    pub fn cancel(&self, session_id: &str) -> Result<WorkoutSession> {
        let session = self.sessions.mutate(session_id, |s| {
            transition(s, SessionAction::Cancel)?;
            s.end_time = Some(Utc::now());
            Ok(())
        })?;
        info!(session_id, "cancelled session");
        Ok(session)
    }

    /// Appends what was performed for one exercise of the session's plan.
    pub fn record_exercise(&self, session_id: &str, completed: CompletedExercise) -> Result<WorkoutSession> {
        let session = self.sessions.mutate(session_id, |s| {
            transition(s, SessionAction::LogExercise)?;
            if !s.workout_plan.contains_exercise(&completed.exercise_id) {
                return Err(Error::ExerciseNotInPlan {
                    plan_id: s.workout_plan_id.clone(),
                    exercise_id: completed.exercise_id.clone(),
                });
            }
            s.completed_exercises.push(completed);
            Ok(())
        })?;
        info!(session_id, logged = session.completed_exercises.len(), "logged exercise");
        Ok(session)
    }

    /// Copies the session's plan snapshot into a new plan tagged as a template.
    /// # Errors
    /// `Error::SessionNotFound` for an unknown id, `Error::InvalidInput` for a blank name.
    pub fn save_as_template(&self, session_id: &str, template_name: &str) -> Result<WorkoutPlan> {
        let name = template_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Template name cannot be empty.".to_string()));
        }
        let session = self
            .sessions
            .get(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let now = Utc::now();
        let mut template = session.workout_plan;
        template.id = Uuid::new_v4().to_string();
        template.name = name.to_string();
        template.is_custom = true;
        template.created_at = now;
        template.updated_at = now;
        template.tags.insert(TEMPLATE_TAG.to_string());

        self.plans.insert(template)
    }
}
