//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::stdout;
use std::path::Path;

use workout_planner::{
    CompletedExercise, ExerciseCatalog, ExerciseDefinition, ExerciseUpdate, HistoryRecord,
    Planner, WorkoutPlan, WorkoutSession,
};

type FilterHandle = tracing_subscriber::reload::Handle<
    tracing_subscriber::EnvFilter,
    tracing_subscriber::Registry,
>;

const VERBOSE_FILTER: &str = "workout_planner=debug,info";
const BOOT_FILTER: &str = "info";

/// Installs the subscriber before config is read. The returned handle swaps in
/// the configured level once it is known.
fn init_logging(verbose: bool) -> FilterHandle {
    use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOT_FILTER))
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
    handle
}

/// RUST_LOG and --verbose win over the config file's level.
fn apply_config_level(handle: &FilterHandle, verbose: bool, level: &str) -> Result<()> {
    if verbose || std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .with_context(|| format!("Invalid log_level in config: {level:?}"))?;
    handle.reload(filter).context("Failed to apply configured log level")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = cli::parse_args();

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let log_handle = init_logging(cli_args.verbose);
    let mut planner = Planner::initialize().context("Failed to initialize workout planner")?;
    apply_config_level(&log_handle, cli_args.verbose, &planner.config.log_level)?;
    let header_color: Color = planner.config.header_color().into();

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Plan(cmd) => handle_plan(&planner, cmd, header_color)?,
        cli::Commands::Session(cmd) => handle_session(&planner, cmd, header_color)?,
        cli::Commands::Quick { muscles, duration, difficulty } => {
            let duration = duration.unwrap_or(planner.config.quick_workout.default_duration);
            let difficulty = difficulty
                .map(Into::into)
                .unwrap_or(planner.config.quick_workout.default_difficulty);
            let plan = planner
                .generator()
                .generate(&muscles, duration, difficulty)
                .context("Error generating quick workout")?;
            println!("Generated plan '{}' ID: {}", plan.name, plan.id);
            print_plan_detail(&plan, header_color);
        }
        cli::Commands::History { limit, export_csv } => {
            let history = planner.history();
            if let Some(path) = export_csv {
                let entries = history.list()?;
                export_history_csv(&entries, &path)?;
                println!("Exported {} history entries to {}", entries.len(), path.display());
                return Ok(());
            }
            let entries: Vec<HistoryRecord> = history.list()?.into_iter().take(limit).collect();
            if entries.is_empty() {
                println!("No completed workouts yet.");
            } else {
                print_history_table(&entries, header_color);
                let summary = history.summary()?;
                println!(
                    "Total: {} workouts, {} min, {:.0} kcal, {} exercises",
                    summary.workouts, summary.total_minutes, summary.total_calories, summary.total_exercises
                );
            }
        }
        cli::Commands::Catalog { muscle } => {
            let defs: Vec<&ExerciseDefinition> = planner
                .catalog
                .all()
                .iter()
                .filter(|d| muscle.as_ref().map_or(true, |m| d.targets_any(std::slice::from_ref(m))))
                .collect();
            print_catalog_table(&defs, header_color);
        }
        cli::Commands::DbPath => println!("Database file is located at: {:?}", planner.get_db_path()),
        cli::Commands::ConfigPath => println!("Config file is located at: {:?}", planner.get_config_path()),
        cli::Commands::SetQuickDuration { minutes } => {
            planner.config.set_quick_workout_duration(minutes)?;
            planner.save_config().context("Failed to save config")?;
            println!("Quick workouts now default to {minutes} minutes.");
        }
    }

    Ok(())
}

fn handle_plan(planner: &Planner, cmd: cli::PlanCommand, header_color: Color) -> Result<()> {
    let plans = planner.plans();
    match cmd {
        cli::PlanCommand::Create { name, description, difficulty } => {
            let plan = plans.create(&name, &description, difficulty.into())?;
            println!("Successfully created plan '{}' ID: {}", plan.name, plan.id);
        }
        cli::PlanCommand::List => {
            let all = plans.list()?;
            if all.is_empty() {
                println!("No workout plans found.");
            } else {
                print_plan_table(&all, header_color);
            }
        }
        cli::PlanCommand::Show { plan_id } => match plans.get(&plan_id)? {
            Some(plan) => print_plan_detail(&plan, header_color),
            None => bail!("Workout plan not found: {plan_id}"),
        },
        cli::PlanCommand::Delete { plan_id } => {
            plans.delete(&plan_id)?;
            println!("Deleted plan {plan_id} (if it existed).");
        }
        cli::PlanCommand::AddExercise { plan_id, exercise_id, sets, reps } => {
            let plan = plans
                .add_exercise(&plan_id, &exercise_id, sets, reps)
                .with_context(|| format!("Error adding '{exercise_id}' to plan {plan_id}"))?;
            println!("Added '{}'. Estimated duration is now {} min.", exercise_id, plan.estimated_duration);
        }
        cli::PlanCommand::RemoveExercise { plan_id, exercise_id } => {
            let plan = plans.remove_exercise(&plan_id, &exercise_id)?;
            println!("Removed '{}'. Estimated duration is now {} min.", exercise_id, plan.estimated_duration);
        }
        cli::PlanCommand::UpdateExercise(args) => {
            let changes = ExerciseUpdate {
                sets: args.sets,
                reps: args.reps,
                weight: args.weight,
                duration: args.duration,
                rest_time: args.rest,
                notes: args.notes,
            };
            let plan = plans
                .update_exercise(&args.plan_id, &args.exercise_id, changes)
                .with_context(|| format!("Error updating '{}' in plan {}", args.exercise_id, args.plan_id))?;
            print_plan_detail(&plan, header_color);
        }
        cli::PlanCommand::MoveExercise { plan_id, from, to } => {
            if from == 0 || to == 0 {
                bail!("Positions start at 1.");
            }
            let plan = plans.move_exercise(&plan_id, from - 1, to - 1)?;
            print_plan_detail(&plan, header_color);
        }
    }
    Ok(())
}

fn handle_session(planner: &Planner, cmd: cli::SessionCommand, header_color: Color) -> Result<()> {
    let lifecycle = planner.lifecycle();
    match cmd {
        cli::SessionCommand::Start { plan_id } => {
            let session = lifecycle.start(&plan_id).context("Error starting session")?;
            println!("Started session {} ({})", session.id, session.workout_plan.name);
        }
        cli::SessionCommand::Pause { session_id } => {
            lifecycle.pause(&session_id)?;
            println!("Paused session {session_id}");
        }
        cli::SessionCommand::Resume { session_id } => {
            lifecycle.resume(&session_id)?;
            println!("Resumed session {session_id}");
        }
        cli::SessionCommand::Complete { session_id, calories } => {
            let session = lifecycle.complete(&session_id, calories)?;
            println!(
                "Finished session in {} minutes ({} exercises logged)",
                session.total_duration.unwrap_or(0),
                session.completed_exercises.len()
            );
        }
        cli::SessionCommand::Cancel { session_id } => {
            lifecycle.cancel(&session_id)?;
            println!("Cancelled session {session_id}");
        }
        cli::SessionCommand::Log { session_id, exercise_id, reps, weights, notes } => {
            let completed = CompletedExercise {
                exercise_id,
                sets_completed: u32::try_from(reps.len()).context("Too many sets")?,
                reps,
                weights,
                notes,
            };
            let session = lifecycle.record_exercise(&session_id, completed)?;
            println!("Logged exercise ({} so far)", session.completed_exercises.len());
        }
        cli::SessionCommand::List => {
            let sessions = planner.sessions().list()?;
            if sessions.is_empty() {
                println!("No sessions found.");
            } else {
                print_session_table(&sessions, header_color);
            }
        }
        cli::SessionCommand::Delete { session_id } => {
            planner.sessions().delete(&session_id)?;
            println!("Deleted session {session_id} (if it existed).");
        }
        cli::SessionCommand::Current => match planner.sessions().active()? {
            Some(session) => {
                print_session_table(std::slice::from_ref(&session), header_color);
                print_plan_detail(&session.workout_plan, header_color);
            }
            None => println!("No active session."),
        },
        cli::SessionCommand::SaveTemplate { session_id, name } => {
            let plan = lifecycle.save_as_template(&session_id, &name)?;
            println!("Saved template '{}' ID: {}", plan.name, plan.id);
        }
    }
    Ok(())
}

fn header(labels: &[&str], color: Color) -> Vec<Cell> {
    labels.iter().map(|l| Cell::new(*l).fg(color)).collect()
}

fn print_plan_table(plans: &[WorkoutPlan], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(
            &["ID", "Name", "Difficulty", "Exercises", "Est. (min)", "Muscles", "Tags"],
            header_color,
        ));
    for plan in plans {
        table.add_row(vec![
            Cell::new(&plan.id),
            Cell::new(&plan.name),
            Cell::new(plan.difficulty.to_string()),
            Cell::new(plan.exercises.len().to_string()),
            Cell::new(plan.estimated_duration.to_string()),
            Cell::new(join(&plan.target_muscle_groups)),
            Cell::new(join(&plan.tags)),
        ]);
    }
    println!("{table}");
}

fn print_plan_detail(plan: &WorkoutPlan, header_color: Color) {
    println!(
        "{} [{}] ~{} min | {}",
        plan.name,
        plan.difficulty,
        plan.estimated_duration,
        join(&plan.target_muscle_groups)
    );
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(
            &["#", "Exercise", "Sets", "Reps", "Weight (kg)", "Duration (s)", "Rest (s)", "Notes"],
            header_color,
        ));
    for (idx, ex) in plan.exercises.iter().enumerate() {
        table.add_row(vec![
            Cell::new((idx + 1).to_string()),
            Cell::new(format!("{} ({})", ex.exercise.name, ex.exercise_id)),
            Cell::new(ex.sets.to_string()),
            Cell::new(ex.reps.to_string()),
            Cell::new(ex.weight.map_or("-".to_string(), |v| format!("{v:.2}"))),
            Cell::new(ex.duration.map_or("-".to_string(), |v| v.to_string())),
            Cell::new(ex.rest_time.map_or("-".to_string(), |v| v.to_string())),
            Cell::new(ex.notes.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_session_table(sessions: &[WorkoutSession], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Plan", "Started (UTC)", "Status", "Logged", "Minutes"], header_color));
    for s in sessions {
        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(&s.workout_plan.name),
            Cell::new(s.start_time.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(s.status.to_string()),
            Cell::new(s.completed_exercises.len().to_string()),
            Cell::new(s.total_duration.map_or("-".to_string(), |v| v.to_string())),
        ]);
    }
    println!("{table}");
}

fn print_history_table(entries: &[HistoryRecord], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Date (UTC)", "Workout", "Minutes", "kcal", "Exercises"], header_color));
    for h in entries {
        table.add_row(vec![
            Cell::new(h.date.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(&h.name),
            Cell::new(h.duration.to_string()),
            Cell::new(format!("{:.0}", h.calories_burned)),
            Cell::new(h.exercises_completed.to_string()),
        ]);
    }
    println!("{table}");
}

fn print_catalog_table(defs: &[&ExerciseDefinition], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Name", "Type", "Difficulty", "Muscles"], header_color));
    for d in defs {
        table.add_row(vec![
            Cell::new(&d.id),
            Cell::new(&d.name),
            Cell::new(d.type_.to_string()),
            Cell::new(d.difficulty.to_string()),
            Cell::new(d.muscle_groups.join(", ")),
        ]);
    }
    println!("{table}");
}

fn export_history_csv(entries: &[HistoryRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

fn join<'a, I: IntoIterator<Item = &'a String>>(items: I) -> String {
    let joined = items.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{reload, EnvFilter, Registry};

    #[test]
    fn config_level_replaces_boot_filter() {
        let (_layer, handle) = reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new(BOOT_FILTER));

        apply_config_level(&handle, true, "warn").unwrap();
        assert_eq!(handle.with_current(|f| f.to_string()).unwrap(), BOOT_FILTER);

        apply_config_level(&handle, false, "warn").unwrap();
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(handle.with_current(|f| f.to_string()).unwrap(), "warn");
        }
    }
}
