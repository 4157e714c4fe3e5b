// src/cli.rs
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use workout_planner::plans::{DEFAULT_REPS, DEFAULT_SETS};
use workout_planner::Difficulty;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan workouts, run sessions and keep a history", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log at debug level regardless of config/RUST_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DifficultyCli {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyCli> for Difficulty {
    fn from(value: DifficultyCli) -> Self {
        match value {
            DifficultyCli::Easy => Difficulty::Easy,
            DifficultyCli::Medium => Difficulty::Medium,
            DifficultyCli::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, inspect and edit workout plans
    #[command(subcommand)]
    Plan(PlanCommand),
    /// Run workout sessions
    #[command(subcommand)]
    Session(SessionCommand),
    /// Generate a plan from target muscle groups
    Quick {
        /// Comma-separated muscle groups (e.g., "legs,core")
        #[arg(short, long, value_delimiter = ',', required = true)]
        muscles: Vec<String>,
        /// Desired duration in minutes [default: from config]
        #[arg(short, long)]
        duration: Option<u32>,
        /// [default: from config]
        #[arg(long, value_enum)]
        difficulty: Option<DifficultyCli>,
    },
    /// Show completed workouts
    History {
        /// Show only the last N entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Write the full history as CSV to this file
        #[arg(long, value_name = "FILE")]
        export_csv: Option<PathBuf>,
    },
    /// List the exercise catalog
    Catalog {
        /// Filter by muscle group
        #[arg(long)]
        muscle: Option<String>,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    /// Set the default quick-workout duration in minutes
    SetQuickDuration {
        minutes: u32,
    },
    /// Generate shell completion script
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value_t = DifficultyCli::Medium)]
        difficulty: DifficultyCli,
    },
    List,
    Show {
        plan_id: String,
    },
    Delete {
        plan_id: String,
    },
    AddExercise {
        plan_id: String,
        exercise_id: String,
        #[arg(short, long, default_value_t = DEFAULT_SETS)]
        sets: u32,
        #[arg(short, long, default_value_t = DEFAULT_REPS)]
        reps: u32,
    },
    RemoveExercise {
        plan_id: String,
        exercise_id: String,
    },
    UpdateExercise(UpdateExerciseArgs),
    /// Move an exercise to a new position (1-based)
    MoveExercise {
        plan_id: String,
        from: usize,
        to: usize,
    },
}

#[derive(Args, Debug)]
pub struct UpdateExerciseArgs {
    pub plan_id: String,
    pub exercise_id: String,
    #[arg(short, long)]
    pub sets: Option<u32>,
    #[arg(short, long)]
    pub reps: Option<u32>,
    /// Weight in kg
    #[arg(short, long)]
    pub weight: Option<f64>,
    /// Seconds per set
    #[arg(short, long)]
    pub duration: Option<f64>,
    /// Rest between sets in seconds
    #[arg(long)]
    pub rest: Option<f64>,
    #[arg(short, long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    Start {
        plan_id: String,
    },
    Pause {
        session_id: String,
    },
    Resume {
        session_id: String,
    },
    Complete {
        session_id: String,
        #[arg(short, long)]
        calories: Option<f64>,
    },
    Cancel {
        session_id: String,
    },
    /// Record what was done for one exercise
    Log {
        session_id: String,
        exercise_id: String,
        /// Comma-separated reps per set (e.g., "10,8,8")
        #[arg(short, long, value_delimiter = ',', required = true)]
        reps: Vec<u32>,
        /// Comma-separated weights per set in kg
        #[arg(short, long, value_delimiter = ',')]
        weights: Vec<f64>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    List,
    Delete {
        session_id: String,
    },
    /// Show the session that is in progress or paused
    Current,
    /// Copy the session's plan into a new template plan
    SaveTemplate {
        session_id: String,
        name: String,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
