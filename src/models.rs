// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::{ExerciseDefinition, ExerciseType};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Sets prescribed per exercise by the quick-workout generator.
    #[must_use]
    pub const fn default_sets(self) -> u32 {
        match self {
            Self::Easy => 2,
            Self::Medium => 3,
            Self::Hard => 4,
        }
    }

    #[must_use]
    pub const fn reps_multiplier(self) -> f64 {
        match self {
            Self::Easy => 0.8,
            Self::Medium => 1.0,
            Self::Hard => 1.3,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "Easy"),
            Self::Medium => write!(f, "Medium"),
            Self::Hard => write!(f, "Hard"),
        }
    }
}

impl TryFrom<&str> for Difficulty {
    type Error = crate::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(crate::Error::InvalidInput(format!(
                "Unknown difficulty '{value}' (expected Easy, Medium or Hard)"
            ))),
        }
    }
}

/// Copy of the catalog definition taken when the exercise joined a plan.
/// Catalog edits made later never reach existing plans or sessions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSnapshot {
    pub id: String,
    pub name: String,
    pub muscle_groups: Vec<String>,
    #[serde(rename = "type")]
    pub type_: ExerciseType,
}

impl From<&ExerciseDefinition> for ExerciseSnapshot {
    fn from(def: &ExerciseDefinition) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            muscle_groups: def.muscle_groups.clone(),
            type_: def.type_,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub exercise_id: String,
    pub exercise: ExerciseSnapshot,
    pub sets: u32,
    pub reps: u32,
    pub weight: Option<f64>,   // kg
    pub duration: Option<f64>, // seconds per set
    pub rest_time: Option<f64>, // seconds between sets
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub estimated_duration: u32, // minutes, derived
    pub target_muscle_groups: BTreeSet<String>, // derived
    pub exercises: Vec<WorkoutExercise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_custom: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl WorkoutPlan {
    pub fn contains_exercise(&self, exercise_id: &str) -> bool {
        self.exercises.iter().any(|e| e.exercise_id == exercise_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in-progress"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What was actually performed for one exercise during a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletedExercise {
    pub exercise_id: String,
    pub sets_completed: u32,
    #[serde(default)]
    pub reps: Vec<u32>,
    #[serde(default)]
    pub weights: Vec<f64>,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    pub workout_plan_id: String,
    pub workout_plan: WorkoutPlan, // frozen at start
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_exercises: Vec<CompletedExercise>,
    pub total_calories: Option<f64>,
    pub total_duration: Option<u32>, // minutes
    pub status: SessionStatus,
}

impl WorkoutSession {
    /// Whole minutes between start and end, rounded to nearest.
    pub fn elapsed_minutes(&self) -> Option<u32> {
        let end = self.end_time?;
        let millis = (end - self.start_time).num_milliseconds().max(0);
        Some((millis as f64 / 60_000.0).round() as u32)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String, // session id
    pub name: String,
    pub date: DateTime<Utc>,
    pub duration: u32,
    pub calories_burned: f64,
    pub exercises_completed: usize,
    pub completed: bool,
}
