//src/store.rs
//! The record store contract the client core talks to.
//!
//! Every screen-level operation goes through [`RecordStore`]; the crate ships
//! a SQLite implementation in [`crate::db`], and tests wrap it to inject
//! failures.
use chrono::NaiveDate;
use thiserror::Error;

use crate::db::DbError;
use crate::model::{
    Exercise, ExerciseSession, Set, Workout, WorkoutExercise, WorkoutExerciseDetail,
    WorkoutStatus,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{collection} record not found: ID {id}")]
    NotFound { collection: &'static str, id: i64 },
    #[error("Store rejected the request: {0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] DbError),
}

/// Collections exposed by the store, used for error reporting and logging.
pub mod collections {
    pub const EXERCISES: &str = "exercises";
    pub const WORKOUTS: &str = "workouts";
    pub const WORKOUT_EXERCISES: &str = "workout_exercises";
    pub const SETS: &str = "sets";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewExercise {
    pub name: String,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub owner: String,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub status: WorkoutStatus,
}

/// Partial update for a workout; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutChanges {
    pub name: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
    pub status: Option<WorkoutStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewWorkoutExercise {
    pub workout_id: i64,
    pub exercise_id: i64,
    pub order: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSet {
    pub workout_exercise_id: i64,
    pub position: i64,
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
    pub target_weight: Option<f64>,
    pub target_reps: Option<i64>,
    pub target_rpe: Option<f64>,
    pub completed: bool,
}

/// A single-field write against a set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetChange {
    Weight(Option<f64>),
    Reps(Option<i64>),
    Rpe(Option<f64>),
    Completed(bool),
}

impl SetChange {
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Weight(_) => "weight",
            Self::Reps(_) => "reps",
            Self::Rpe(_) => "rpe",
            Self::Completed(_) => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkoutQuery {
    pub status: Option<WorkoutStatus>,
    /// Sort by date ascending when true, descending otherwise.
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionQuery {
    /// Only sessions whose workout is dated strictly before this day.
    pub before: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub newest_first: bool,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record CRUD over the four collections plus the nested reads the screens
/// need. Inserts return the created record as the store sees it.
pub trait RecordStore {
    fn list_exercises(&self) -> StoreResult<Vec<Exercise>>;
    fn get_exercise(&self, id: i64) -> StoreResult<Exercise>;
    fn insert_exercise(&self, new: &NewExercise) -> StoreResult<Exercise>;
    fn update_exercise(&self, id: i64, changes: &NewExercise) -> StoreResult<()>;
    /// Removes the exercise together with every workout exercise and set that
    /// references it.
    fn delete_exercise(&self, id: i64) -> StoreResult<()>;

    fn list_workouts(&self, query: &WorkoutQuery) -> StoreResult<Vec<Workout>>;
    fn get_workout(&self, id: i64) -> StoreResult<Workout>;
    fn insert_workout(&self, new: &NewWorkout) -> StoreResult<Workout>;
    fn update_workout(&self, id: i64, changes: &WorkoutChanges) -> StoreResult<()>;
    fn delete_workout(&self, id: i64) -> StoreResult<()>;

    fn workout_exercise_ids(&self, workout_id: i64) -> StoreResult<Vec<i64>>;
    fn insert_workout_exercise(&self, new: &NewWorkoutExercise) -> StoreResult<WorkoutExercise>;
    fn delete_workout_exercise(&self, id: i64) -> StoreResult<()>;
    fn delete_workout_exercises_for_workout(&self, workout_id: i64) -> StoreResult<u64>;
    /// The workout's exercises ordered by `order`, each with its exercise and
    /// its sets (by position) embedded.
    fn workout_exercise_details(&self, workout_id: i64)
        -> StoreResult<Vec<WorkoutExerciseDetail>>;

    fn insert_set(&self, new: &NewSet) -> StoreResult<Set>;
    fn update_set(&self, id: i64, changes: &[SetChange]) -> StoreResult<()>;
    fn delete_set(&self, id: i64) -> StoreResult<()>;
    fn delete_sets_for(&self, workout_exercise_ids: &[i64]) -> StoreResult<u64>;

    /// Past sessions of one exercise, ascending by workout date unless
    /// `newest_first` is set.
    fn exercise_sessions(
        &self,
        exercise_id: i64,
        query: &SessionQuery,
    ) -> StoreResult<Vec<ExerciseSession>>;
}
