// src/catalog.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::models::Difficulty;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error reading catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Duplicate exercise id in catalog: {0}")]
    DuplicateId(String),
    #[error("Catalog entry '{0}' has no muscle groups")]
    MissingMuscleGroups(String),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Strength,
    Cardio,
    Flexibility,
    Endurance,
}

impl ExerciseType {
    /// Baseline reps before the difficulty multiplier is applied.
    #[must_use]
    pub const fn base_reps(self) -> u32 {
        match self {
            Self::Strength => 8,
            Self::Cardio => 30,
            Self::Flexibility => 10,
            Self::Endurance => 15,
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strength => write!(f, "strength"),
            Self::Cardio => write!(f, "cardio"),
            Self::Flexibility => write!(f, "flexibility"),
            Self::Endurance => write!(f, "endurance"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    #[serde(alias = "muscle_groups")]
    pub muscle_groups: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub type_: ExerciseType,
    pub description: Option<String>,
}

impl ExerciseDefinition {
    /// True if any of this exercise's muscle groups is in `targets` (case-insensitive).
    pub fn targets_any(&self, targets: &[String]) -> bool {
        self.muscle_groups
            .iter()
            .any(|m| targets.iter().any(|t| t.eq_ignore_ascii_case(m)))
    }
}

/// Read-only source of exercise definitions.
pub trait ExerciseCatalog {
    fn all(&self) -> &[ExerciseDefinition];

    fn get(&self, id: &str) -> Option<&ExerciseDefinition> {
        self.all().iter().find(|def| def.id == id)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    exercise: Vec<ExerciseDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    exercises: Vec<ExerciseDefinition>,
}

impl StaticCatalog {
    /// Builds a catalog, rejecting duplicate ids and entries without muscle groups.
    pub fn new(exercises: Vec<ExerciseDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for def in &exercises {
            if !seen.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateId(def.id.clone()));
            }
            if def.muscle_groups.is_empty() {
                return Err(CatalogError::MissingMuscleGroups(def.id.clone()));
            }
        }
        Ok(Self { exercises })
    }

    /// Parses `[[exercise]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.exercise)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), count = catalog.exercises.len(), "loaded exercise catalog");
        Ok(catalog)
    }

    /// The catalog shipped with the application.
    pub fn builtin() -> Self {
        Self {
            exercises: builtin_exercises(),
        }
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

impl ExerciseCatalog for StaticCatalog {
    fn all(&self) -> &[ExerciseDefinition] {
        &self.exercises
    }
}

fn def(
    id: &str,
    name: &str,
    muscles: &[&str],
    difficulty: Difficulty,
    type_: ExerciseType,
) -> ExerciseDefinition {
    ExerciseDefinition {
        id: id.to_string(),
        name: name.to_string(),
        muscle_groups: muscles.iter().map(|m| (*m).to_string()).collect(),
        difficulty,
        type_,
        description: None,
    }
}

fn builtin_exercises() -> Vec<ExerciseDefinition> {
    use Difficulty::{Easy, Hard, Medium};
    use ExerciseType::{Cardio, Endurance, Flexibility, Strength};

    vec![
        def("squat", "Squat", &["legs", "glutes"], Medium, Strength),
        def("lunge", "Lunge", &["legs", "glutes"], Easy, Strength),
        def("deadlift", "Deadlift", &["back", "legs", "glutes"], Hard, Strength),
        def("pistol-squat", "Pistol Squat", &["legs"], Hard, Strength),
        def("calf-raise", "Calf Raise", &["legs"], Easy, Endurance),
        def("wall-sit", "Wall Sit", &["legs"], Medium, Endurance),
        def("push-up", "Push-up", &["chest", "arms", "shoulders"], Easy, Strength),
        def("bench-press", "Bench Press", &["chest", "arms"], Medium, Strength),
        def("dips", "Dips", &["chest", "arms"], Hard, Strength),
        def("pull-up", "Pull-up", &["back", "arms"], Hard, Strength),
        def("bent-over-row", "Bent-over Row", &["back", "arms"], Medium, Strength),
        def("superman", "Superman", &["back", "core"], Easy, Endurance),
        def("overhead-press", "Overhead Press", &["shoulders", "arms"], Medium, Strength),
        def("plank", "Plank", &["core"], Easy, Endurance),
        def("mountain-climber", "Mountain Climber", &["core", "full body"], Medium, Cardio),
        def("burpee", "Burpee", &["full body"], Hard, Cardio),
        def("jumping-jack", "Jumping Jack", &["full body"], Easy, Cardio),
        def("high-knees", "High Knees", &["legs", "core"], Medium, Cardio),
        def("hamstring-stretch", "Hamstring Stretch", &["legs"], Easy, Flexibility),
        def("cobra-stretch", "Cobra Stretch", &["back", "core"], Easy, Flexibility),
    ]
}
