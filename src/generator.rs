// src/generator.rs
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::{ExerciseCatalog, ExerciseDefinition, ExerciseType};
use crate::error::{Error, Result};
use crate::models::{Difficulty, WorkoutPlan};
use crate::metadata;
use crate::plans::{self, PlanRepository};
use crate::store::KeyValueStore;

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
/// Below this many difficulty matches the difficulty filter is dropped.
pub const MIN_CANDIDATES: usize = 3;
pub const MAX_EXERCISES: usize = 6;

/// Reps for a generated exercise: type baseline scaled by difficulty, rounded.
#[must_use]
pub fn reps_for(type_: ExerciseType, difficulty: Difficulty) -> u32 {
    let scaled = f64::from(type_.base_reps()) * difficulty.reps_multiplier();
    (scaled.round() as u32).max(1)
}

/// Catalog entries hitting any target muscle group, filtered by difficulty
/// unless that leaves fewer than `MIN_CANDIDATES`.
pub fn candidates<'c>(
    catalog: &'c [ExerciseDefinition],
    targets: &[String],
    difficulty: Difficulty,
) -> Vec<&'c ExerciseDefinition> {
    let by_muscle: Vec<&ExerciseDefinition> =
        catalog.iter().filter(|def| def.targets_any(targets)).collect();
    let by_difficulty: Vec<&ExerciseDefinition> = by_muscle
        .iter()
        .copied()
        .filter(|def| def.difficulty == difficulty)
        .collect();

    if by_difficulty.len() < MIN_CANDIDATES {
        debug!(
            strict = by_difficulty.len(),
            relaxed = by_muscle.len(),
            "too few exercises at requested difficulty, ignoring difficulty"
        );
        by_muscle
    } else {
        by_difficulty
    }
}

/// Builds ad-hoc plans from the catalog.
pub struct QuickWorkoutGenerator<'a, S: ?Sized, C: ?Sized> {
    catalog: &'a C,
    plans: PlanRepository<'a, S, C>,
}

impl<'a, S, C> QuickWorkoutGenerator<'a, S, C>
where
    S: KeyValueStore + ?Sized,
    C: ExerciseCatalog + ?Sized,
{
    pub fn new(store: &'a S, catalog: &'a C) -> Self {
        Self {
            catalog,
            plans: PlanRepository::new(store, catalog),
        }
    }

    pub fn generate(&self, targets: &[String], duration: u32, difficulty: Difficulty) -> Result<WorkoutPlan> {
        self.generate_with_rng(targets, duration, difficulty, &mut rand::thread_rng())
    }

    /// Same as [`generate`](Self::generate) with a caller-supplied random source.
    /// # Errors
    /// - `Error::InvalidInput` if no target muscle group is given.
    /// - `Error::Store` if the plan cannot be saved; nothing is persisted then.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        targets: &[String],
        duration: u32,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Result<WorkoutPlan> {
        let targets: Vec<String> = targets
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if targets.is_empty() {
            return Err(Error::InvalidInput(
                "At least one target muscle group is required.".to_string(),
            ));
        }

        let mut picked = candidates(self.catalog.all(), &targets, difficulty);
        picked.shuffle(rng);
        picked.truncate(MAX_EXERCISES);

        let mut plan = plans::new_plan(
            &format!("Quick Workout {duration}min"),
            &format!("Generated for {}", targets.join(", ")),
            difficulty,
        )?;
        let sets = difficulty.default_sets();
        plan.exercises = picked
            .iter()
            .map(|def| plans::catalog_entry(def, sets, reps_for(def.type_, difficulty)))
            .collect();
        metadata::apply(&mut plan);

        // One write, so a failure never leaves a half-filled plan behind.
        let plan = self.plans.insert(plan)?;
        info!(plan_id = %plan.id, exercises = plan.exercises.len(), "generated quick workout");
        Ok(plan)
    }
}
