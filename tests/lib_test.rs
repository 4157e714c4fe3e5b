use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use workout_planner::store::{HISTORY_KEY, PLANS_KEY, SESSIONS_KEY};
use workout_planner::{
    metadata, CompletedExercise, Difficulty, Error, ExerciseDefinition, ExerciseType,
    ExerciseUpdate, HistoryRecorder, KeyValueStore, MemoryStore, PlanRepository,
    QuickWorkoutGenerator, SessionLifecycle, SessionRepository, SessionStatus, SqliteStore,
    StaticCatalog, StoreError, WorkoutPlan,
};

fn def(id: &str, muscles: &[&str], difficulty: Difficulty, type_: ExerciseType) -> ExerciseDefinition {
    ExerciseDefinition {
        id: id.to_string(),
        name: id.replace('-', " "),
        muscle_groups: muscles.iter().map(|m| (*m).to_string()).collect(),
        difficulty,
        type_,
        description: None,
    }
}

// Two Hard leg exercises, so a Hard leg request has to fall back.
fn test_catalog() -> Result<StaticCatalog> {
    use Difficulty::*;
    use ExerciseType::*;
    Ok(StaticCatalog::new(vec![
        def("squat", &["legs", "glutes"], Medium, Strength),
        def("lunge", &["legs"], Easy, Strength),
        def("pistol-squat", &["legs"], Hard, Strength),
        def("box-jump", &["legs"], Hard, Cardio),
        def("calf-raise", &["legs"], Easy, Endurance),
        def("wall-sit", &["legs"], Medium, Endurance),
        def("leg-swing", &["legs", "hips"], Easy, Flexibility),
        def("step-up", &["legs", "glutes"], Medium, Strength),
        def("push-up", &["chest", "arms"], Medium, Strength),
        def("bench-press", &["chest"], Medium, Strength),
        def("dips", &["chest", "arms"], Medium, Strength),
        def("plank", &["core"], Easy, Endurance),
    ])?)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Store whose writes always fail.
struct ReadOnlyStore(MemoryStore);

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.0.get(key)
    }

    fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("read-only".to_string()))
    }
}

/// Store whose writes to one key fail until `fail_on` is cleared.
/// Keys of successful writes are logged in order.
struct FlakyStore {
    inner: MemoryStore,
    fail_on: Cell<Option<&'static str>>,
    writes: RefCell<Vec<String>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_on: Cell::new(None),
            writes: RefCell::new(Vec::new()),
        }
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_on.get().is_some_and(|k| k == key) {
            return Err(StoreError::Unavailable("down".to_string()));
        }
        self.writes.borrow_mut().push(key.to_string());
        self.inner.set(key, value)
    }
}

/// Rewrites both timestamps of a stored plan, bypassing the repository.
fn backdate_plan(store: &MemoryStore, plan_id: &str, at: DateTime<Utc>) -> Result<()> {
    let mut raw: Vec<WorkoutPlan> = serde_json::from_value(store.get(PLANS_KEY)?.unwrap())?;
    for plan in raw.iter_mut().filter(|p| p.id == plan_id) {
        plan.created_at = at;
        plan.updated_at = at;
    }
    store.set(PLANS_KEY, serde_json::to_value(raw)?)?;
    Ok(())
}

#[test]
fn test_create_plan_defaults() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);

    let plan = plans.create("  Leg Day ", "Lower body", Difficulty::Medium)?;
    assert_eq!(plan.name, "Leg Day");
    assert!(plan.is_custom);
    assert!(plan.exercises.is_empty());
    assert_eq!(plan.estimated_duration, 0);
    assert!(plan.target_muscle_groups.is_empty());
    assert_eq!(plan.created_at, plan.updated_at);

    let other = plans.create("Push", "", Difficulty::Hard)?;
    assert_ne!(plan.id, other.id);
    assert_eq!(plans.list()?.len(), 2);
    assert_eq!(plans.get(&plan.id)?.unwrap(), plan);

    let result = plans.create("   ", "", Difficulty::Easy);
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    Ok(())
}

#[test]
fn test_update_and_delete_plan() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let mut plan = plans.create("Full Body", "", Difficulty::Easy)?;

    plan.description = "Monday".to_string();
    plans.update(&plan)?;
    let stored = plans.get(&plan.id)?.unwrap();
    assert_eq!(stored.description, "Monday");
    assert!(stored.updated_at >= plan.updated_at);

    // Update never creates.
    let mut ghost = plan.clone();
    ghost.id = "does-not-exist".to_string();
    plans.update(&ghost)?;
    assert!(plans.get("does-not-exist")?.is_none());
    assert_eq!(plans.list()?.len(), 1);

    plans.delete("does-not-exist")?;
    assert_eq!(plans.list()?.len(), 1);
    plans.delete(&plan.id)?;
    assert!(plans.list()?.is_empty());
    Ok(())
}

#[test]
fn test_leg_day_estimated_duration() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Leg Day", "", Difficulty::Medium)?;

    plans.add_exercise(&plan.id, "squat", 4, 10)?;
    plans.add_exercise(&plan.id, "lunge", 3, 10)?;
    plans.update_exercise(
        &plan.id,
        "squat",
        ExerciseUpdate {
            duration: Some(40.0),
            rest_time: Some(90.0),
            ..Default::default()
        },
    )?;
    let plan = plans.update_exercise(
        &plan.id,
        "lunge",
        ExerciseUpdate {
            duration: Some(30.0),
            rest_time: Some(60.0),
            ..Default::default()
        },
    )?;

    assert_eq!(plan.estimated_duration, 11);
    let expected: BTreeSet<String> = strings(&["glutes", "legs"]).into_iter().collect();
    assert_eq!(plan.target_muscle_groups, expected);

    // The stored copy carries the same derived values.
    let stored = plans.get(&plan.id)?.unwrap();
    assert_eq!(stored.estimated_duration, 11);
    let meta = metadata::derive(&stored.exercises);
    assert_eq!(meta.estimated_duration, stored.estimated_duration);
    assert_eq!(meta.target_muscle_groups, stored.target_muscle_groups);
    Ok(())
}

#[test]
fn test_add_exercise_snapshot_and_defaults() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Chest", "", Difficulty::Medium)?;

    let plan = plans.add_exercise(&plan.id, "push-up", 3, 10)?;
    let entry = &plan.exercises[0];
    assert_eq!(entry.exercise_id, "push-up");
    assert_eq!(entry.exercise.id, entry.exercise_id);
    assert_eq!(entry.exercise.muscle_groups, strings(&["chest", "arms"]));
    assert_eq!(entry.rest_time, Some(60.0));
    assert_eq!(entry.duration, None);
    // 3 * 30 + 2 * 60 = 210s
    assert_eq!(plan.estimated_duration, 4);
    Ok(())
}

#[test]
fn test_add_exercise_failures_leave_plan_untouched() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Chest", "", Difficulty::Medium)?;
    plans.add_exercise(&plan.id, "push-up", 3, 10)?;
    let before = plans.get(&plan.id)?.unwrap();

    let result = plans.add_exercise(&plan.id, "not-in-catalog", 3, 10);
    assert!(matches!(result, Err(Error::InvalidReference(ref id)) if id == "not-in-catalog"));

    let result = plans.add_exercise("missing-plan", "push-up", 3, 10);
    let err = result.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Workout plan not found"));

    // A missing plan is reported even when the exercise id is unknown too.
    let result = plans.add_exercise("missing-plan", "not-in-catalog", 3, 10);
    assert!(matches!(result, Err(Error::PlanNotFound(ref id)) if id == "missing-plan"));

    let result = plans.add_exercise(&plan.id, "dips", 0, 10);
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    assert_eq!(plans.get(&plan.id)?.unwrap(), before);
    Ok(())
}

#[test]
fn test_remove_exercise_removes_all_matches() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Arms", "", Difficulty::Medium)?;
    plans.add_exercise(&plan.id, "dips", 3, 10)?;
    plans.add_exercise(&plan.id, "push-up", 3, 10)?;
    plans.add_exercise(&plan.id, "dips", 2, 8)?;

    let plan = plans.remove_exercise(&plan.id, "dips")?;
    assert_eq!(plan.exercises.len(), 1);
    assert_eq!(plan.exercises[0].exercise_id, "push-up");
    assert_eq!(plan.estimated_duration, metadata::derive(&plan.exercises).estimated_duration);

    // Removing something absent is fine; a missing plan is not.
    plans.remove_exercise(&plan.id, "plank")?;
    assert!(plans.remove_exercise("missing", "dips").unwrap_err().is_not_found());

    let plan = plans.remove_exercise(&plan.id, "push-up")?;
    assert_eq!(plan.estimated_duration, 0);
    assert!(plan.target_muscle_groups.is_empty());
    Ok(())
}

#[test]
fn test_update_exercise_merges_fields() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Legs", "", Difficulty::Medium)?;
    plans.add_exercise(&plan.id, "squat", 3, 10)?;

    let plan = plans.update_exercise(
        &plan.id,
        "squat",
        ExerciseUpdate {
            sets: Some(5),
            weight: Some(100.0),
            notes: Some("belt".to_string()),
            ..Default::default()
        },
    )?;
    let squat = &plan.exercises[0];
    assert_eq!(squat.sets, 5);
    assert_eq!(squat.reps, 10);
    assert_eq!(squat.weight, Some(100.0));
    assert_eq!(squat.rest_time, Some(60.0));
    assert_eq!(squat.notes.as_deref(), Some("belt"));
    // 5 * 30 + 4 * 60 = 390s
    assert_eq!(plan.estimated_duration, 7);

    let result = plans.update_exercise(&plan.id, "lunge", ExerciseUpdate::default());
    assert!(matches!(result, Err(Error::ExerciseNotInPlan { .. })));
    let result = plans.update_exercise("nope", "squat", ExerciseUpdate::default());
    assert!(matches!(result, Err(Error::PlanNotFound(_))));
    let result = plans.update_exercise(
        &plan.id,
        "squat",
        ExerciseUpdate {
            reps: Some(0),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(plans.get(&plan.id)?.unwrap().exercises[0].reps, 10);
    Ok(())
}

#[test]
fn test_move_exercise_reorders() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Mixed", "", Difficulty::Medium)?;
    for id in ["squat", "push-up", "plank"] {
        plans.add_exercise(&plan.id, id, 3, 10)?;
    }

    let plan = plans.move_exercise(&plan.id, 2, 0)?;
    let order: Vec<&str> = plan.exercises.iter().map(|e| e.exercise_id.as_str()).collect();
    assert_eq!(order, vec!["plank", "squat", "push-up"]);

    assert!(matches!(plans.move_exercise(&plan.id, 0, 3), Err(Error::InvalidInput(_))));
    Ok(())
}

#[test]
fn test_start_session_snapshots_plan() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let sessions = SessionRepository::new(&store);

    let plan = plans.create("Leg Day", "", Difficulty::Medium)?;
    plans.add_exercise(&plan.id, "squat", 3, 10)?;

    let session = lifecycle.start(&plan.id)?;
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_eq!(session.workout_plan_id, plan.id);
    assert!(session.end_time.is_none());
    assert_eq!(session.workout_plan.exercises.len(), 1);

    // Later plan edits and deletion don't reach the session.
    plans.add_exercise(&plan.id, "lunge", 3, 10)?;
    plans.delete(&plan.id)?;
    let stored = sessions.get(&session.id)?.unwrap();
    assert_eq!(stored.workout_plan.exercises.len(), 1);
    assert_eq!(sessions.active()?.map(|s| s.id), Some(session.id));
    Ok(())
}

#[test]
fn test_start_missing_plan_creates_nothing() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let sessions = SessionRepository::new(&store);

    let err = lifecycle.start("no-such-plan").unwrap_err();
    assert!(matches!(err, Error::PlanNotFound(_)));
    assert!(sessions.list()?.is_empty());
    Ok(())
}

#[test]
fn test_pause_resume_complete_flow() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let sessions = SessionRepository::new(&store);
    let history = HistoryRecorder::new(&store);

    let plan = plans.create("Leg Day", "", Difficulty::Medium)?;
    plans.add_exercise(&plan.id, "squat", 3, 10)?;
    let session = lifecycle.start(&plan.id)?;

    assert_eq!(lifecycle.pause(&session.id)?.status, SessionStatus::Paused);
    assert!(matches!(lifecycle.pause(&session.id), Err(Error::InvalidTransition { .. })));
    assert_eq!(lifecycle.resume(&session.id)?.status, SessionStatus::InProgress);
    assert!(matches!(lifecycle.resume(&session.id), Err(Error::InvalidTransition { .. })));

    lifecycle.record_exercise(
        &session.id,
        CompletedExercise {
            exercise_id: "squat".to_string(),
            sets_completed: 3,
            reps: vec![10, 10, 8],
            weights: vec![80.0, 80.0, 85.0],
            notes: None,
        },
    )?;
    let result = lifecycle.record_exercise(
        &session.id,
        CompletedExercise {
            exercise_id: "bench-press".to_string(),
            sets_completed: 1,
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(Error::ExerciseNotInPlan { .. })));

    // Backdate the start so the duration is measurable.
    let mut stored = sessions.get(&session.id)?.unwrap();
    stored.start_time = Utc::now() - Duration::seconds(45 * 60 + 10);
    sessions.update(&stored)?;

    let done = lifecycle.complete(&session.id, Some(320.0))?;
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.total_duration, Some(45));
    assert_eq!(done.total_calories, Some(320.0));
    let end = done.end_time.unwrap();
    let expected = ((end - done.start_time).num_milliseconds() as f64 / 60_000.0).round() as u32;
    assert_eq!(done.total_duration, Some(expected));

    let entries = history.entries()?;
    assert_eq!(entries.len(), 1);
    let record = &entries[0];
    assert_eq!(record.id, session.id);
    assert_eq!(record.name, "Leg Day");
    assert_eq!(record.date, done.start_time);
    assert_eq!(record.duration, 45);
    assert_eq!(record.calories_burned, 320.0);
    assert_eq!(record.exercises_completed, 1);
    assert!(record.completed);
    assert!(sessions.active()?.is_none());
    Ok(())
}

#[test]
fn test_terminal_sessions_reject_transitions() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let history = HistoryRecorder::new(&store);
    let plan = plans.create("Quick", "", Difficulty::Easy)?;

    let completed = lifecycle.start(&plan.id)?;
    lifecycle.complete(&completed.id, None)?;
    let err = lifecycle.complete(&completed.id, None).unwrap_err();
    assert!(err.to_string().contains("session is completed"));
    assert!(matches!(lifecycle.cancel(&completed.id), Err(Error::InvalidTransition { .. })));
    assert!(matches!(lifecycle.resume(&completed.id), Err(Error::InvalidTransition { .. })));
    assert_eq!(history.entries()?.len(), 1);

    let cancelled = lifecycle.start(&plan.id)?;
    let c = lifecycle.cancel(&cancelled.id)?;
    assert_eq!(c.status, SessionStatus::Cancelled);
    assert!(c.end_time.is_some());
    assert!(c.total_duration.is_none());
    assert!(matches!(lifecycle.complete(&cancelled.id, None), Err(Error::InvalidTransition { .. })));

    assert!(matches!(lifecycle.pause("ghost"), Err(Error::SessionNotFound(_))));
    Ok(())
}

#[test]
fn test_history_counts_completions_only() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let history = HistoryRecorder::new(&store);
    let plan = plans.create("Core", "", Difficulty::Easy)?;

    for _ in 0..3 {
        let s = lifecycle.start(&plan.id)?;
        lifecycle.complete(&s.id, Some(100.0))?;
    }
    for _ in 0..2 {
        let s = lifecycle.start(&plan.id)?;
        lifecycle.pause(&s.id)?;
        lifecycle.cancel(&s.id)?;
    }

    assert_eq!(history.entries()?.len(), 3);
    let summary = history.summary()?;
    assert_eq!(summary.workouts, 3);
    assert_eq!(summary.total_calories, 300.0);
    Ok(())
}

#[test]
fn test_complete_without_calories_records_zero() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let history = HistoryRecorder::new(&store);
    let plan = plans.create("Core", "", Difficulty::Easy)?;

    let s = lifecycle.start(&plan.id)?;
    assert!(matches!(lifecycle.complete(&s.id, Some(-5.0)), Err(Error::InvalidInput(_))));
    lifecycle.complete(&s.id, None)?;
    let record = &history.entries()?[0];
    assert_eq!(record.calories_burned, 0.0);
    assert_eq!(record.exercises_completed, 0);
    Ok(())
}

#[test]
fn test_save_as_template() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let plan = plans.create("Leg Day", "Heavy", Difficulty::Hard)?;
    plans.add_exercise(&plan.id, "squat", 5, 5)?;
    let session = lifecycle.start(&plan.id)?;

    let template = lifecycle.save_as_template(&session.id, "Leg Template")?;
    assert_ne!(template.id, plan.id);
    assert_eq!(template.name, "Leg Template");
    assert!(template.is_custom);
    assert!(template.tags.contains("template"));
    assert_eq!(template.exercises, session.workout_plan.exercises);
    assert_eq!(template.estimated_duration, session.workout_plan.estimated_duration);

    let original = plans.get(&plan.id)?.unwrap();
    assert!(original.tags.is_empty());
    assert_eq!(original.name, "Leg Day");
    assert_eq!(plans.list()?.len(), 2);

    assert!(matches!(
        lifecycle.save_as_template("ghost", "X"),
        Err(Error::SessionNotFound(_))
    ));
    Ok(())
}

#[test]
fn test_generate_hard_legs_falls_back() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let generator = QuickWorkoutGenerator::new(&store, &catalog);
    let mut rng = StdRng::seed_from_u64(7);

    let plan = generator.generate_with_rng(&strings(&["legs"]), 30, Difficulty::Hard, &mut rng)?;
    assert_eq!(plan.name, "Quick Workout 30min");
    assert_eq!(plan.difficulty, Difficulty::Hard);
    // 8 leg exercises in the catalog, only 2 of them Hard.
    assert_eq!(plan.exercises.len(), 6);
    assert!(plan.exercises.iter().all(|e| e.exercise.muscle_groups.contains(&"legs".to_string())));
    assert!(plan
        .exercises
        .iter()
        .any(|e| catalog_difficulty(&catalog, &e.exercise_id) != Difficulty::Hard));

    for e in &plan.exercises {
        assert_eq!(e.sets, 4);
        let expected = match e.exercise.type_ {
            ExerciseType::Strength => 10,
            ExerciseType::Cardio => 39,
            ExerciseType::Flexibility => 13,
            ExerciseType::Endurance => 20,
        };
        assert_eq!(e.reps, expected, "{}", e.exercise_id);
    }
    assert_eq!(plan.estimated_duration, metadata::derive(&plan.exercises).estimated_duration);
    Ok(())
}

fn catalog_difficulty(catalog: &StaticCatalog, id: &str) -> Difficulty {
    use workout_planner::ExerciseCatalog;
    catalog.get(id).map(|d| d.difficulty).unwrap_or_default()
}

#[test]
fn test_generate_keeps_difficulty_filter_when_enough_match() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let generator = QuickWorkoutGenerator::new(&store, &catalog);
    let mut rng = StdRng::seed_from_u64(1);

    let plan = generator.generate_with_rng(&strings(&["Chest"]), 20, Difficulty::Medium, &mut rng)?;
    assert_eq!(plan.exercises.len(), 3);
    assert!(plan
        .exercises
        .iter()
        .all(|e| catalog_difficulty(&catalog, &e.exercise_id) == Difficulty::Medium));
    let ids: BTreeSet<&str> = plan.exercises.iter().map(|e| e.exercise_id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    Ok(())
}

#[test]
fn test_generate_small_and_empty_matches() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let generator = QuickWorkoutGenerator::new(&store, &catalog);
    let plans = PlanRepository::new(&store, &catalog);
    let mut rng = StdRng::seed_from_u64(3);

    let plan = generator.generate_with_rng(&strings(&["core"]), 10, Difficulty::Hard, &mut rng)?;
    assert_eq!(plan.exercises.len(), 1);
    assert_eq!(plan.exercises[0].exercise_id, "plank");

    let plan = generator.generate_with_rng(&strings(&["neck"]), 10, Difficulty::Easy, &mut rng)?;
    assert!(plan.exercises.is_empty());
    assert_eq!(plans.list()?.len(), 2);

    let result = generator.generate_with_rng(&strings(&[" "]), 10, Difficulty::Easy, &mut rng);
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(plans.list()?.len(), 2);
    Ok(())
}

#[test]
fn test_store_failure_propagates() -> Result<()> {
    let store = ReadOnlyStore(MemoryStore::new());
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);

    let err = plans.create("Leg Day", "", Difficulty::Medium).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    assert!(plans.list()?.is_empty());
    assert!(lifecycle.start("anything").unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_plans_persist_in_sqlite_store() -> Result<()> {
    let store = SqliteStore::open_in_memory()?;
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let history = HistoryRecorder::new(&store);

    let plan = plans.create("Leg Day", "", Difficulty::Medium)?;
    plans.add_exercise(&plan.id, "squat", 4, 8)?;
    let session = lifecycle.start(&plan.id)?;
    lifecycle.complete(&session.id, Some(250.0))?;

    let raw = store.get("workout-plans")?.unwrap();
    assert_eq!(raw[0]["isCustom"], Value::Bool(true));
    assert_eq!(raw[0]["exercises"][0]["exerciseId"], "squat");
    let raw_sessions = store.get("workout-sessions")?.unwrap();
    assert_eq!(raw_sessions[0]["status"], "completed");

    assert_eq!(plans.get(&plan.id)?.unwrap().exercises.len(), 1);
    assert_eq!(history.list()?.len(), 1);
    assert_eq!(
        store.keys()?,
        strings(&["workout-history", "workout-plans", "workout-sessions"])
    );
    Ok(())
}

#[test]
fn test_session_repository_crud() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let sessions = SessionRepository::new(&store);
    let plan = plans.create("Core", "", Difficulty::Easy)?;

    let first = lifecycle.start(&plan.id)?;
    let mut second = lifecycle.start(&plan.id)?;
    second.start_time = first.start_time + Duration::minutes(5);
    sessions.update(&second)?;
    assert_eq!(sessions.list()?.len(), 2);
    assert_eq!(sessions.active()?.map(|s| s.id), Some(second.id.clone()));

    sessions.delete(&second.id)?;
    sessions.delete("ghost")?;
    let remaining = sessions.list()?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, first.id);
    assert!(sessions.get(&second.id)?.is_none());
    Ok(())
}

#[test]
fn test_every_plan_mutation_refreshes_updated_at() -> Result<()> {
    let store = MemoryStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let plan = plans.create("Legs", "", Difficulty::Medium)?;
    let old = Utc::now() - Duration::days(30);

    let check = |label: &str| -> Result<()> {
        let stored = plans.get(&plan.id)?.unwrap();
        assert!(stored.updated_at > old, "{label} did not stamp updated_at");
        assert_eq!(stored.created_at, old, "{label} changed created_at");
        Ok(())
    };

    backdate_plan(&store, &plan.id, old)?;
    let mut edited = plans.get(&plan.id)?.unwrap();
    edited.description = "Heavy".to_string();
    plans.update(&edited)?;
    check("update")?;

    backdate_plan(&store, &plan.id, old)?;
    plans.add_exercise(&plan.id, "squat", 3, 10)?;
    check("add_exercise")?;

    backdate_plan(&store, &plan.id, old)?;
    plans.add_exercise(&plan.id, "lunge", 3, 10)?;
    backdate_plan(&store, &plan.id, old)?;
    plans.update_exercise(
        &plan.id,
        "squat",
        ExerciseUpdate {
            reps: Some(5),
            ..Default::default()
        },
    )?;
    check("update_exercise")?;

    backdate_plan(&store, &plan.id, old)?;
    plans.move_exercise(&plan.id, 1, 0)?;
    check("move_exercise")?;

    backdate_plan(&store, &plan.id, old)?;
    plans.remove_exercise(&plan.id, "squat")?;
    check("remove_exercise")?;

    // Failed mutations leave the stamp alone.
    backdate_plan(&store, &plan.id, old)?;
    assert!(plans.add_exercise(&plan.id, "not-in-catalog", 3, 10).is_err());
    assert_eq!(plans.get(&plan.id)?.unwrap().updated_at, old);
    Ok(())
}

#[test]
fn test_complete_keeps_session_open_when_history_write_fails() -> Result<()> {
    let store = FlakyStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let sessions = SessionRepository::new(&store);
    let history = HistoryRecorder::new(&store);
    let plan = plans.create("Legs", "", Difficulty::Medium)?;
    let session = lifecycle.start(&plan.id)?;

    store.fail_on.set(Some(HISTORY_KEY));
    let err = lifecycle.complete(&session.id, Some(10.0)).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    let stored = sessions.get(&session.id)?.unwrap();
    assert_eq!(stored.status, SessionStatus::InProgress);
    assert!(stored.end_time.is_none());
    assert!(history.entries()?.is_empty());

    // The same call succeeds once the store recovers.
    store.fail_on.set(None);
    let done = lifecycle.complete(&session.id, Some(10.0))?;
    assert_eq!(done.status, SessionStatus::Completed);
    let entries = history.entries()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, session.id);
    Ok(())
}

#[test]
fn test_complete_rolls_back_history_when_session_write_fails() -> Result<()> {
    let store = FlakyStore::new();
    let catalog = test_catalog()?;
    let plans = PlanRepository::new(&store, &catalog);
    let lifecycle = SessionLifecycle::new(&store, &catalog);
    let sessions = SessionRepository::new(&store);
    let history = HistoryRecorder::new(&store);
    let plan = plans.create("Legs", "", Difficulty::Medium)?;
    let session = lifecycle.start(&plan.id)?;

    store.fail_on.set(Some(SESSIONS_KEY));
    assert!(lifecycle.complete(&session.id, None).is_err());
    assert_eq!(sessions.get(&session.id)?.unwrap().status, SessionStatus::InProgress);
    assert!(history.entries()?.is_empty());
    Ok(())
}

#[test]
fn test_generate_saves_plan_in_one_write() -> Result<()> {
    let store = FlakyStore::new();
    let catalog = test_catalog()?;
    let generator = QuickWorkoutGenerator::new(&store, &catalog);
    let plans = PlanRepository::new(&store, &catalog);
    let mut rng = StdRng::seed_from_u64(11);

    let plan = generator.generate_with_rng(&strings(&["legs"]), 30, Difficulty::Medium, &mut rng)?;
    assert!(!plan.exercises.is_empty());
    assert_eq!(plan.estimated_duration, metadata::derive(&plan.exercises).estimated_duration);
    assert_eq!(*store.writes.borrow(), strings(&[PLANS_KEY]));
    assert_eq!(plans.get(&plan.id)?.unwrap(), plan);

    store.fail_on.set(Some(PLANS_KEY));
    let result = generator.generate_with_rng(&strings(&["chest"]), 20, Difficulty::Medium, &mut rng);
    assert!(matches!(result, Err(Error::Store(_))));
    store.fail_on.set(None);
    assert_eq!(plans.list()?.len(), 1);
    Ok(())
}
