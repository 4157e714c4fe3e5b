// src/plans.rs
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{ExerciseCatalog, ExerciseDefinition};
use crate::error::{Error, Result};
use crate::metadata::{self, DEFAULT_REST_SECS};
use crate::models::{Difficulty, ExerciseSnapshot, WorkoutExercise, WorkoutPlan};
use crate::store::{load_collection, save_collection, KeyValueStore, PLANS_KEY};

pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_REPS: u32 = 10;

/// Fields to change on an exercise inside a plan. `None` leaves the field as is.
#[derive(Default, Debug, Clone)]
pub struct ExerciseUpdate {
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration: Option<f64>,
    pub rest_time: Option<f64>,
    pub notes: Option<String>,
}

fn validate_counts(sets: u32, reps: u32) -> Result<()> {
    if sets == 0 {
        return Err(Error::InvalidInput("Sets must be a positive number.".to_string()));
    }
    if reps == 0 {
        return Err(Error::InvalidInput("Reps must be a positive number.".to_string()));
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::InvalidInput(format!(
            "{field} must be a non-negative number, got {v}."
        ))),
        _ => Ok(()),
    }
}

/// An empty custom plan, not yet stored.
pub(crate) fn new_plan(name: &str, description: &str, difficulty: Difficulty) -> Result<WorkoutPlan> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Plan name cannot be empty.".to_string()));
    }
    let now = Utc::now();
    Ok(WorkoutPlan {
        id: Uuid::new_v4().to_string(),
        name: trimmed.to_string(),
        description: description.trim().to_string(),
        difficulty,
        estimated_duration: 0,
        target_muscle_groups: BTreeSet::new(),
        exercises: Vec::new(),
        created_at: now,
        updated_at: now,
        is_custom: true,
        tags: BTreeSet::new(),
    })
}

/// Plan entry for a catalog exercise with the default rest time.
pub(crate) fn catalog_entry(def: &ExerciseDefinition, sets: u32, reps: u32) -> WorkoutExercise {
    WorkoutExercise {
        exercise_id: def.id.clone(),
        exercise: ExerciseSnapshot::from(def),
        sets,
        reps,
        weight: None,
        duration: None,
        rest_time: Some(DEFAULT_REST_SECS),
        notes: None,
    }
}

/// CRUD over the stored plan collection, plus exercise edits within a plan.
///
/// Every call reads the whole `workout-plans` collection, changes it in memory
/// and writes it back, so callers must not run two mutations at once.
pub struct PlanRepository<'a, S: ?Sized, C: ?Sized> {
    store: &'a S,
    catalog: &'a C,
}

impl<'a, S, C> PlanRepository<'a, S, C>
where
    S: KeyValueStore + ?Sized,
    C: ExerciseCatalog + ?Sized,
{
    pub fn new(store: &'a S, catalog: &'a C) -> Self {
        Self { store, catalog }
    }

    fn load(&self) -> Result<Vec<WorkoutPlan>> {
        Ok(load_collection(self.store, PLANS_KEY)?)
    }

    fn save(&self, plans: &[WorkoutPlan]) -> Result<()> {
        Ok(save_collection(self.store, PLANS_KEY, plans)?)
    }

    /// Creates an empty custom plan and persists it.
    /// # Errors
    /// - `Error::InvalidInput` if the name is blank.
    /// - `Error::Store` if persistence fails.
    pub fn create(&self, name: &str, description: &str, difficulty: Difficulty) -> Result<WorkoutPlan> {
        self.insert(new_plan(name, description, difficulty)?)
    }

    /// Persists a fully built plan under its own id.
    pub(crate) fn insert(&self, plan: WorkoutPlan) -> Result<WorkoutPlan> {
        let mut plans = self.load()?;
        plans.push(plan.clone());
        self.save(&plans)?;
        info!(plan_id = %plan.id, name = %plan.name, "created workout plan");
        Ok(plan)
    }

    pub fn list(&self) -> Result<Vec<WorkoutPlan>> {
        self.load()
    }

    pub fn get(&self, id: &str) -> Result<Option<WorkoutPlan>> {
        let plan = self.load()?.into_iter().find(|p| p.id == id);
        debug!(plan_id = id, found = plan.is_some(), "plan lookup");
        Ok(plan)
    }

    /// Overwrites the stored plan with the same id and stamps `updated_at`.
    /// Does nothing if no plan has that id.
    pub fn update(&self, plan: &WorkoutPlan) -> Result<()> {
        let mut plans = self.load()?;
        let Some(slot) = plans.iter_mut().find(|p| p.id == plan.id) else {
            debug!(plan_id = %plan.id, "update ignored, plan not found");
            return Ok(());
        };
        *slot = plan.clone();
        slot.updated_at = Utc::now();
        self.save(&plans)
    }

    /// Removes the plan with this id. Unknown ids are ignored.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut plans = self.load()?;
        let before = plans.len();
        plans.retain(|p| p.id != id);
        if plans.len() == before {
            debug!(plan_id = id, "delete ignored, plan not found");
            return Ok(());
        }
        self.save(&plans)?;
        info!(plan_id = id, "deleted workout plan");
        Ok(())
    }

    /// Loads all plans, applies `edit` to the one with `plan_id`, re-derives
    /// metadata and writes everything back. Nothing is written if `edit` fails.
    fn mutate<F>(&self, plan_id: &str, edit: F) -> Result<WorkoutPlan>
    where
        F: FnOnce(&mut WorkoutPlan) -> Result<()>,
    {
        let mut plans = self.load()?;
        let plan = plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;

        edit(plan)?;
        metadata::apply(plan);
        plan.updated_at = Utc::now();
        let updated = plan.clone();

        self.save(&plans)?;
        Ok(updated)
    }

    /// Appends a catalog exercise to a plan.
    /// # Errors
    /// - `Error::PlanNotFound` if the plan doesn't exist.
    /// - `Error::InvalidReference` if the catalog has no such exercise.
    /// - `Error::InvalidInput` if sets or reps is zero.
    pub fn add_exercise(&self, plan_id: &str, exercise_id: &str, sets: u32, reps: u32) -> Result<WorkoutPlan> {
        validate_counts(sets, reps)?;
        // Runs after the plan lookup, so a missing plan wins over a bad exercise id.
        let plan = self.mutate(plan_id, |plan| {
            let def = self
                .catalog
                .get(exercise_id)
                .ok_or_else(|| Error::InvalidReference(exercise_id.to_string()))?;
            plan.exercises.push(catalog_entry(def, sets, reps));
            Ok(())
        })?;
        info!(plan_id, exercise_id, sets, reps, "added exercise to plan");
        Ok(plan)
    }

    /// Removes every entry for `exercise_id` from the plan.
    pub fn remove_exercise(&self, plan_id: &str, exercise_id: &str) -> Result<WorkoutPlan> {
        let plan = self.mutate(plan_id, |plan| {
            plan.exercises.retain(|e| e.exercise_id != exercise_id);
            Ok(())
        })?;
        info!(plan_id, exercise_id, "removed exercise from plan");
        Ok(plan)
    }

    /// Merges `changes` into the plan's entry for `exercise_id`.
    /// # Errors
    /// - `Error::PlanNotFound` / `Error::ExerciseNotInPlan` for missing targets.
    /// - `Error::InvalidInput` if the merged values are out of range.
    pub fn update_exercise(&self, plan_id: &str, exercise_id: &str, changes: ExerciseUpdate) -> Result<WorkoutPlan> {
        let plan = self.mutate(plan_id, |plan| {
            let entry = plan
                .exercises
                .iter_mut()
                .find(|e| e.exercise_id == exercise_id)
                .ok_or_else(|| Error::ExerciseNotInPlan {
                    plan_id: plan_id.to_string(),
                    exercise_id: exercise_id.to_string(),
                })?;

            let sets = changes.sets.unwrap_or(entry.sets);
            let reps = changes.reps.unwrap_or(entry.reps);
            validate_counts(sets, reps)?;
            validate_non_negative("Weight", changes.weight)?;
            validate_non_negative("Duration", changes.duration)?;
            validate_non_negative("Rest time", changes.rest_time)?;

            entry.sets = sets;
            entry.reps = reps;
            if changes.weight.is_some() {
                entry.weight = changes.weight;
            }
            if changes.duration.is_some() {
                entry.duration = changes.duration;
            }
            if changes.rest_time.is_some() {
                entry.rest_time = changes.rest_time;
            }
            if changes.notes.is_some() {
                entry.notes = changes.notes;
            }
            Ok(())
        })?;
        info!(plan_id, exercise_id, "updated exercise in plan");
        Ok(plan)
    }

    /// Moves the exercise at index `from` to index `to`, shifting the rest.
    pub fn move_exercise(&self, plan_id: &str, from: usize, to: usize) -> Result<WorkoutPlan> {
        self.mutate(plan_id, |plan| {
            let len = plan.exercises.len();
            if from >= len || to >= len {
                return Err(Error::InvalidInput(format!(
                    "Exercise position out of range (plan has {len} exercises)."
                )));
            }
            let entry = plan.exercises.remove(from);
            plan.exercises.insert(to, entry);
            Ok(())
        })
    }
}
