// src/lib.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

// --- Declare modules ---
pub mod catalog;
mod config;
pub mod db;
mod error;
pub mod generator;
pub mod history;
pub mod lifecycle;
pub mod metadata;
pub mod models;
pub mod plans;
pub mod sessions;
pub mod store;

// --- Expose public types ---
pub use catalog::{CatalogError, ExerciseCatalog, ExerciseDefinition, ExerciseType, StaticCatalog};
pub use config::{
    get_config_path as get_config_path_util, load_config as load_config_util, parse_color,
    save_config as save_config_util, Config, ConfigError, QuickWorkoutConfig, StandardColor,
    ThemeConfig,
};
pub use db::{get_db_path as get_db_path_util, SqliteStore};
pub use error::Error;
pub use generator::QuickWorkoutGenerator;
pub use history::{HistoryRecorder, HistorySummary};
pub use lifecycle::{SessionAction, SessionLifecycle};
pub use metadata::PlanMetadata;
pub use models::{
    CompletedExercise, Difficulty, ExerciseSnapshot, HistoryRecord, SessionStatus, WorkoutExercise,
    WorkoutPlan, WorkoutSession,
};
pub use plans::{ExerciseUpdate, PlanRepository};
pub use sessions::SessionRepository;
pub use store::{KeyValueStore, MemoryStore, StoreError};

/// Owns the store, catalog and configuration for one process and hands out
/// repositories that borrow them.
pub struct Planner {
    pub config: Config,
    pub store: SqliteStore,
    pub catalog: StaticCatalog,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl Planner {
    /// Loads config, opens the database and loads the exercise catalog.
    /// # Errors
    /// Returns `anyhow::Error` if any of the paths cannot be determined or read.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = match &config.db_path {
            Some(path) => path.clone(),
            None => db::get_db_path().context("Failed to determine database path")?,
        };
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        let catalog = match &config.catalog_path {
            Some(path) => StaticCatalog::load(path)
                .with_context(|| format!("Failed to load exercise catalog from {path:?}"))?,
            None => StaticCatalog::builtin(),
        };
        info!(db = %db_path.display(), exercises = catalog.len(), "planner initialized");

        Ok(Self {
            config,
            store,
            catalog,
            db_path,
            config_path,
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save_config(&self.config_path, &self.config)
    }

    pub fn plans(&self) -> PlanRepository<'_, SqliteStore, StaticCatalog> {
        PlanRepository::new(&self.store, &self.catalog)
    }

    pub fn sessions(&self) -> SessionRepository<'_, SqliteStore> {
        SessionRepository::new(&self.store)
    }

    pub fn lifecycle(&self) -> SessionLifecycle<'_, SqliteStore, StaticCatalog> {
        SessionLifecycle::new(&self.store, &self.catalog)
    }

    pub fn generator(&self) -> QuickWorkoutGenerator<'_, SqliteStore, StaticCatalog> {
        QuickWorkoutGenerator::new(&self.store, &self.catalog)
    }

    pub fn history(&self) -> HistoryRecorder<'_, SqliteStore> {
        HistoryRecorder::new(&self.store)
    }
}
