//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::Local;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};
use tracing_subscriber::EnvFilter;

use gymtrack_lib::{
    ActiveWorkout, AppService, Exercise, ExerciseProgress, PlannedExercise, SetChange, SetKey,
    SyncState, ThemeMode, Workout, WorkoutDetail, WorkoutError, WorkoutPlan, WorkoutSection,
};

const LOG_ENV_VAR: &str = "GYMTRACK_LOG";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color = header_color(service.theme.mode());
    let today = Local::now().date_naive();

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }

        // --- Session & preferences ---
        cli::Commands::SignIn { user_id, email } => {
            service.sign_in(&user_id, &email)?;
            println!("Signed in as {}.", email.trim());
        }
        cli::Commands::SignOut => {
            service.sign_out()?;
            println!("Signed out.");
        }
        cli::Commands::Whoami => match service.auth.session() {
            Some(session) => println!("{} ({})", session.email, session.user_id),
            None => println!("Not signed in."),
        },
        cli::Commands::ToggleTheme => {
            let mode = service.toggle_theme()?;
            println!("Theme set to {mode}.");
        }
        cli::Commands::SetHistoryLimit { limit } => {
            service.set_history_limit(limit)?;
            println!("Showing the last {limit} session(s) per exercise.");
        }

        // --- Exercise catalogue ---
        cli::Commands::CreateExercise {
            name,
            muscle_group,
            equipment,
        } => {
            let exercise = service.create_exercise(
                &name,
                muscle_group.as_deref(),
                equipment.as_deref(),
            )?;
            println!("Created exercise '{}' (ID: {}).", exercise.name, exercise.id);
        }
        cli::Commands::EditExercise {
            id,
            name,
            muscle_group,
            equipment,
        } => {
            service.update_exercise(id, &name, muscle_group.as_deref(), equipment.as_deref())?;
            println!("Updated exercise {id}.");
        }
        cli::Commands::DeleteExercise { id } => {
            service.delete_exercise(id)?;
            println!("Deleted exercise {id} and its logged sessions.");
        }
        cli::Commands::ListExercises { search } => {
            let exercises = match search {
                Some(query) => service.search_exercises(&query)?,
                None => service.list_exercises()?,
            };
            if exercises.is_empty() {
                println!("No exercises found.");
            } else if export_csv {
                print_exercises_csv(&exercises)?;
            } else {
                print_exercise_table(&exercises, header_color);
            }
        }
        cli::Commands::Progress {
            exercise_id,
            ascending,
        } => {
            let exercise = service.get_exercise(exercise_id)?;
            let progress = service.exercise_progress(exercise_id)?;
            if export_csv {
                print_progress_csv(&progress, ascending)?;
            } else {
                print_progress(&exercise, &progress, ascending, header_color);
            }
        }

        // --- Workouts ---
        cli::Commands::Home { today: override_day } => {
            let day = override_day.unwrap_or(today);
            let sections = service.home_sections(day)?;
            if sections.is_empty() {
                println!("Nothing scheduled.");
            }
            for section in &sections {
                print_section(section, header_color);
            }
        }
        cli::Commands::History => {
            let workouts = service.completed_workouts()?;
            if workouts.is_empty() {
                println!("No completed workouts yet.");
            } else if export_csv {
                print_workouts_csv(&workouts)?;
            } else {
                print_workout_table(&workouts, header_color);
            }
        }
        cli::Commands::Show { workout_id } => {
            let active = service.open_workout(workout_id, false)?;
            print_active_workout(&active, header_color);
        }
        cli::Commands::Plan {
            name,
            date,
            exercises,
            workout,
        } => {
            let mut plan = WorkoutPlan::new(date.unwrap_or(today));
            plan.name = name;
            for entry in &exercises {
                let (exercise_id, sets) = cli::parse_planned_exercise(entry)?;
                let exercise = service.get_exercise(exercise_id)?;
                plan.exercises.push(PlannedExercise {
                    exercise_id,
                    name: exercise.name,
                    sets,
                });
            }
            let id = service.save_plan(&plan, workout)?;
            println!("Saved '{}' for {} (ID: {id}).", plan.display_name(), plan.date);
        }
        cli::Commands::LogSet {
            workout_id,
            set_id,
            weight,
            reps,
            rpe,
            done,
            edit,
        } => {
            let mut active = open_for_change(&service, workout_id, edit)?;
            let key = SetKey::Stored(set_id);
            let changes = [
                weight.map(|w| SetChange::Weight(Some(w))),
                reps.map(|r| SetChange::Reps(Some(r))),
                rpe.map(|r| SetChange::Rpe(Some(r))),
                done.then_some(SetChange::Completed(true)),
            ];
            if changes.iter().all(Option::is_none) {
                bail!("Nothing to log: pass --weight, --reps, --rpe or --done.");
            }
            for change in changes.into_iter().flatten() {
                let state = active.update_set(service.store(), key, change)?;
                report_sync(key, &state);
            }
        }
        cli::Commands::AddSet {
            workout_id,
            workout_exercise_id,
            edit,
        } => {
            let mut active = open_for_change(&service, workout_id, edit)?;
            let key = active.add_set(service.store(), workout_exercise_id)?;
            if let Some(set) = active.find_set(key) {
                report_sync(key, &set.sync);
            }
        }
        cli::Commands::RemoveSet {
            workout_id,
            workout_exercise_id,
            set_id,
            edit,
        } => {
            let mut active = open_for_change(&service, workout_id, edit)?;
            active.remove_set(service.store(), workout_exercise_id, SetKey::Stored(set_id))?;
            println!("Removed set {set_id}.");
        }
        cli::Commands::AddExercise {
            workout_id,
            exercise_id,
            edit,
        } => {
            let exercise = service.get_exercise(exercise_id)?;
            let mut active = open_for_change(&service, workout_id, edit)?;
            let id = active.add_exercise(service.store(), &exercise)?;
            println!("Added '{}' to workout {workout_id} (workout exercise {id}).", exercise.name);
        }
        cli::Commands::RemoveExercise {
            workout_id,
            workout_exercise_id,
            edit,
        } => {
            let mut active = open_for_change(&service, workout_id, edit)?;
            active.remove_exercise(service.store(), workout_exercise_id)?;
            println!("Removed workout exercise {workout_exercise_id}.");
        }
        cli::Commands::Complete { workout_id, edit } => {
            let mut active = service.open_workout(workout_id, edit)?;
            match active.complete(service.store()) {
                Ok(()) => println!("Workout {workout_id} completed."),
                Err(WorkoutError::IncompleteSets { remaining }) => {
                    bail!("{} ({remaining} set(s) left)", WorkoutError::IncompleteSets { remaining });
                }
                Err(e) => return Err(e.into()),
            }
        }
        cli::Commands::DeleteWorkout { id } => {
            service.delete_workout(id)?;
            println!("Deleted workout {id}.");
        }

        cli::Commands::DbPath => match service.get_db_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No database file in use."),
        },
        cli::Commands::ConfigPath => match service.get_config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No config file in use."),
        },
    }

    Ok(())
}

const fn header_color(mode: ThemeMode) -> Color {
    match mode {
        ThemeMode::Dark => Color::Cyan,
        ThemeMode::Light => Color::DarkBlue,
    }
}

/// Opens a workout for changes, refusing completed ones.
fn open_for_change(service: &AppService, workout_id: i64, edit: bool) -> Result<ActiveWorkout> {
    let active = service.open_workout(workout_id, edit)?;
    if active.is_read_only() {
        bail!("Workout {workout_id} is completed; pass --edit to change it.");
    }
    Ok(active)
}

fn report_sync(key: SetKey, state: &SyncState) {
    match state {
        SyncState::Confirmed => println!("Set {key} saved."),
        SyncState::Pending => println!("Set {key} changed locally."),
        SyncState::Failed { reason } => eprintln!("Set {key} not saved: {reason}"),
    }
}

fn opt_or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_exercise_table(exercises: &[Exercise], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Muscle Group").fg(header_color),
            Cell::new("Equipment").fg(header_color),
        ]);
    for exercise in exercises {
        table.add_row(vec![
            Cell::new(exercise.id),
            Cell::new(&exercise.name),
            Cell::new(exercise.muscle_group.as_deref().unwrap_or("-")),
            Cell::new(exercise.equipment.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_workout_table(workouts: &[Workout], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Date").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Status").fg(header_color),
            Cell::new("Notes").fg(header_color),
        ]);
    for workout in workouts {
        table.add_row(vec![
            Cell::new(workout.id),
            Cell::new(workout.date.format("%Y-%m-%d")),
            Cell::new(workout.name.as_deref().unwrap_or("-")),
            Cell::new(workout.status),
            Cell::new(workout.notes.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_section(section: &WorkoutSection<WorkoutDetail>, header_color: Color) {
    println!("{}", section.bucket);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Date").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);
    for detail in &section.workouts {
        let exercises: Vec<String> = detail
            .exercises
            .iter()
            .map(|we| format!("{} ({} sets)", we.exercise.name, we.sets.len()))
            .collect();
        table.add_row(vec![
            Cell::new(detail.workout.id),
            Cell::new(detail.workout.date.format("%a %b %-d")),
            Cell::new(detail.workout.name.as_deref().unwrap_or("-")),
            Cell::new(exercises.join("\n")),
        ]);
    }
    println!("{table}");
}

fn print_active_workout(active: &ActiveWorkout, header_color: Color) {
    let workout = &active.workout;
    println!(
        "{} - {} [{}]",
        workout.name.as_deref().unwrap_or("Workout"),
        workout.date.format("%Y-%m-%d"),
        workout.status
    );
    for exercise in &active.exercises {
        println!();
        println!(
            "{} (workout exercise {})",
            exercise.exercise.name, exercise.id
        );
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Set").fg(header_color),
                Cell::new("ID").fg(header_color),
                Cell::new("Weight").fg(header_color),
                Cell::new("Reps").fg(header_color),
                Cell::new("RPE").fg(header_color),
                Cell::new("Target").fg(header_color),
                Cell::new("Done").fg(header_color),
            ]);
        for (index, set) in exercise.sets.iter().enumerate() {
            let target = match (set.target_weight, set.target_reps) {
                (None, None) => "-".to_string(),
                (w, r) => format!("{} x {}", opt_or_dash(w), opt_or_dash(r)),
            };
            let done = if set.completed {
                Cell::new("yes").add_attribute(Attribute::Bold)
            } else {
                Cell::new("no")
            };
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(set.key),
                Cell::new(opt_or_dash(set.weight.map(|w| format!("{w:.1}")))),
                Cell::new(opt_or_dash(set.reps)),
                Cell::new(opt_or_dash(set.rpe)),
                Cell::new(target),
                done,
            ]);
        }
        println!("{table}");
        if !exercise.history.is_empty() {
            let recent: Vec<String> = exercise
                .history
                .iter()
                .map(|session| {
                    let sets: Vec<String> = session
                        .sets
                        .iter()
                        .map(|s| format!("{}x{}", opt_or_dash(s.weight), opt_or_dash(s.reps)))
                        .collect();
                    format!("{}: {}", session.date.format("%m/%d"), sets.join(" "))
                })
                .collect();
            println!("Previous: {}", recent.join(" | "));
        }
    }
}

fn print_progress(
    exercise: &Exercise,
    progress: &ExerciseProgress,
    ascending: bool,
    header_color: Color,
) {
    println!("{}", exercise.name);
    println!(
        "Personal record: {:.1}  Sessions: {}",
        progress.personal_record, progress.total_sessions
    );
    if progress.has_chart() {
        let trend: Vec<String> = progress
            .points
            .iter()
            .map(|p| format!("{} {:.1}", p.chart_label(), p.max_weight))
            .collect();
        println!("Trend: {}", trend.join(" -> "));
    } else {
        println!("Log at least two sessions with weight to see progress.");
    }
    if progress.points.is_empty() {
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(header_color),
            Cell::new("Max Weight").fg(header_color),
        ]);
    for point in progress.list_view(ascending) {
        let weight = Cell::new(format!("{:.1}", point.max_weight));
        let weight = if (point.max_weight - progress.personal_record).abs() < f64::EPSILON {
            weight.add_attribute(Attribute::Bold)
        } else {
            weight
        };
        table.add_row(vec![Cell::new(point.list_label()), weight]);
    }
    println!("{table}");
}

fn print_exercises_csv(exercises: &[Exercise]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Name", "Muscle_Group", "Equipment"])?;
    for exercise in exercises {
        writer.write_record([
            exercise.id.to_string(),
            exercise.name.clone(),
            exercise.muscle_group.clone().unwrap_or_default(),
            exercise.equipment.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_workouts_csv(workouts: &[Workout]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Date", "Name", "Status", "Notes"])?;
    for workout in workouts {
        writer.write_record([
            workout.id.to_string(),
            workout.date.format("%Y-%m-%d").to_string(),
            workout.name.clone().unwrap_or_default(),
            workout.status.to_string(),
            workout.notes.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_progress_csv(progress: &ExerciseProgress, ascending: bool) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Date", "Max_Weight"])?;
    for point in progress.list_view(ascending) {
        writer.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", point.max_weight),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
