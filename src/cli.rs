// src/cli.rs
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use gymtrack_lib::PlannedSet;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan, perform and review strength workouts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print list output as CSV instead of a table
    #[arg(long, global = true)]
    pub export_csv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session; new exercises and workouts are owned by this user
    SignIn {
        user_id: String,
        email: String,
    },
    SignOut,
    /// Show who is signed in
    Whoami,
    /// Switch between dark and light output
    ToggleTheme,
    /// How many earlier sessions to show per exercise while working out
    SetHistoryLimit { limit: u32 },

    // --- Exercise catalogue ---
    /// Define a new exercise
    CreateExercise {
        /// Name of the exercise (e.g., "Bench Press")
        name: String,
        #[arg(short, long)]
        muscle_group: Option<String>,
        #[arg(short, long)]
        equipment: Option<String>,
    },
    EditExercise {
        id: i64,
        name: String,
        #[arg(short, long)]
        muscle_group: Option<String>,
        #[arg(short, long)]
        equipment: Option<String>,
    },
    /// Delete an exercise together with every logged session of it
    DeleteExercise { id: i64 },
    ListExercises {
        /// Only names containing this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Best weight per session and personal record for an exercise
    Progress {
        exercise_id: i64,
        /// Oldest session first
        #[arg(long)]
        ascending: bool,
    },

    // --- Workouts ---
    /// Scheduled workouts grouped into today, tomorrow and upcoming
    Home {
        /// Pretend today is this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },
    /// Completed workouts, newest first
    History,
    /// Show a workout with its exercises and sets
    Show { workout_id: i64 },
    /// Create a scheduled workout, or replace the plan of an existing one
    Plan {
        #[arg(short, long, default_value = "")]
        name: String,
        /// Date of the workout (YYYY-MM-DD), defaults to today
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Exercise with planned sets, e.g. `3:80x5,80x5,85x3` or just `3`
        #[arg(short = 'x', long = "exercise", value_name = "ID[:WxR,...]", required = true)]
        exercises: Vec<String>,
        /// Overwrite this workout instead of creating one
        #[arg(long)]
        workout: Option<i64>,
    },
    /// Log values for a set of a workout
    LogSet {
        workout_id: i64,
        set_id: i64,
        #[arg(short, long)]
        weight: Option<f64>,
        #[arg(short, long)]
        reps: Option<i64>,
        #[arg(long)]
        rpe: Option<f64>,
        /// Mark the set as done
        #[arg(long)]
        done: bool,
        /// Change a completed workout (re-save it with `complete --edit`)
        #[arg(long)]
        edit: bool,
    },
    /// Append a set to an exercise of a workout, copying the previous set
    AddSet {
        workout_id: i64,
        workout_exercise_id: i64,
        /// Change a completed workout (re-save it with `complete --edit`)
        #[arg(long)]
        edit: bool,
    },
    RemoveSet {
        workout_id: i64,
        workout_exercise_id: i64,
        set_id: i64,
        /// Change a completed workout (re-save it with `complete --edit`)
        #[arg(long)]
        edit: bool,
    },
    /// Add an exercise to a workout, seeded from its last session
    AddExercise {
        workout_id: i64,
        exercise_id: i64,
        /// Change a completed workout (re-save it with `complete --edit`)
        #[arg(long)]
        edit: bool,
    },
    RemoveExercise {
        workout_id: i64,
        workout_exercise_id: i64,
        /// Change a completed workout (re-save it with `complete --edit`)
        #[arg(long)]
        edit: bool,
    },
    /// Finish a workout
    Complete {
        workout_id: i64,
        /// Re-save an already completed workout
        #[arg(long)]
        edit: bool,
    },
    /// Delete a workout with all of its exercises and sets
    DeleteWorkout { id: i64 },

    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    /// Generate shell completion script
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

/// Parses `ID` or `ID:WxR,WxR,...` into an exercise id and its planned sets.
/// A bare id plans one empty set.
pub fn parse_planned_exercise(value: &str) -> Result<(i64, Vec<PlannedSet>)> {
    let (id_part, sets_part) = match value.split_once(':') {
        Some((id, sets)) => (id, Some(sets)),
        None => (value, None),
    };
    let id: i64 = id_part
        .trim()
        .parse()
        .with_context(|| format!("Invalid exercise id in '{value}'"))?;

    let Some(sets_part) = sets_part else {
        return Ok((id, vec![PlannedSet::default()]));
    };
    let sets = sets_part
        .split(',')
        .map(|set| -> Result<PlannedSet> {
            let Some((weight, reps)) = set.trim().split_once(['x', 'X']) else {
                bail!("Invalid set '{set}', expected WEIGHTxREPS");
            };
            Ok(PlannedSet {
                weight: Some(weight.trim().parse().with_context(|| format!("Invalid weight in '{set}'"))?),
                reps: Some(reps.trim().parse().with_context(|| format!("Invalid reps in '{set}'"))?),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((id, sets))
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn planned_exercise_forms() {
        let (id, sets) = parse_planned_exercise("3").unwrap();
        assert_eq!(id, 3);
        assert_eq!(sets, vec![PlannedSet::default()]);

        let (id, sets) = parse_planned_exercise("7:80x5, 82.5X3").unwrap();
        assert_eq!(id, 7);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].weight, Some(82.5));
        assert_eq!(sets[1].reps, Some(3));

        assert!(parse_planned_exercise("x:80x5").is_err());
        assert!(parse_planned_exercise("1:80").is_err());
    }

    #[test]
    fn set_commands_take_edit_flag() {
        let cli = Cli::try_parse_from(["gymtrack", "log-set", "5", "12", "--weight", "100", "--edit"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::LogSet { workout_id: 5, set_id: 12, edit: true, .. }
        ));

        let cli = Cli::try_parse_from(["gymtrack", "remove-exercise", "5", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::RemoveExercise { edit: false, .. }));
    }
}
