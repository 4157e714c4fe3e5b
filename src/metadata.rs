// src/metadata.rs
use std::collections::BTreeSet;

use crate::models::{WorkoutExercise, WorkoutPlan};

pub const DEFAULT_SET_DURATION_SECS: f64 = 30.0;
pub const DEFAULT_REST_SECS: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanMetadata {
    pub estimated_duration: u32, // minutes
    pub target_muscle_groups: BTreeSet<String>,
}

fn exercise_seconds(exercise: &WorkoutExercise) -> f64 {
    let sets = f64::from(exercise.sets);
    let work = exercise.duration.unwrap_or(DEFAULT_SET_DURATION_SECS);
    let rest = exercise.rest_time.unwrap_or(DEFAULT_REST_SECS);
    sets * work + (sets - 1.0).max(0.0) * rest
}

/// Computes the derived fields of a plan from its exercise list.
pub fn derive(exercises: &[WorkoutExercise]) -> PlanMetadata {
    let total_seconds: f64 = exercises.iter().map(exercise_seconds).sum();
    let target_muscle_groups = exercises
        .iter()
        .flat_map(|e| e.exercise.muscle_groups.iter().cloned())
        .collect();

    PlanMetadata {
        // `as` saturates, so a huge total clamps to u32::MAX.
        estimated_duration: (total_seconds / 60.0).ceil() as u32,
        target_muscle_groups,
    }
}

/// Recomputes and stores the derived fields on `plan`.
pub fn apply(plan: &mut WorkoutPlan) {
    let meta = derive(&plan.exercises);
    plan.estimated_duration = meta.estimated_duration;
    plan.target_muscle_groups = meta.target_muscle_groups;
}
