// src/error.rs
use thiserror::Error;

use crate::models::SessionStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Workout plan not found: {0}")]
    PlanNotFound(String),
    #[error("Workout session not found: {0}")]
    SessionNotFound(String),
    #[error("Exercise '{exercise_id}' is not part of plan {plan_id}")]
    ExerciseNotInPlan {
        plan_id: String,
        exercise_id: String,
    },
    #[error("Exercise '{0}' does not exist in the catalog")]
    InvalidReference(String),
    #[error("Cannot {action} session {session_id}: session is {from}")]
    InvalidTransition {
        session_id: String,
        from: SessionStatus,
        action: &'static str,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Plan, session, or exercise-in-plan lookups that came up empty.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PlanNotFound(_) | Self::SessionNotFound(_) | Self::ExerciseNotInPlan { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
