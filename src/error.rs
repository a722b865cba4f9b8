//src/error.rs
use thiserror::Error;

use crate::active::SetKey;
use crate::cascade::CascadeError;
use crate::model::WorkoutStatus;
use crate::store::StoreError;

/// Failures of user-facing workout and exercise actions. The `Display` text is
/// what the user gets to see; the store error, if any, sits in `source()`.
#[derive(Error, Debug)]
pub enum WorkoutError {
    // Validation: nothing was sent to the store.
    #[error("Name is required")]
    NameRequired,
    #[error("You must be logged in")]
    NotLoggedIn,
    #[error("Add at least one exercise")]
    EmptyPlan,
    #[error("Please complete all sets before finishing the workout.")]
    IncompleteSets { remaining: usize },
    #[error("Cannot mark a {from} workout as {to}")]
    InvalidTransition {
        from: WorkoutStatus,
        to: WorkoutStatus,
    },
    #[error("Workout exercise not found: ID {0}")]
    UnknownWorkoutExercise(i64),
    #[error("Set not found: {0}")]
    UnknownSet(SetKey),
    #[error("Completed workouts can only be changed in edit mode")]
    ReadOnly,

    // Fetch failures.
    #[error("Could not load workout")]
    LoadFailed(#[source] StoreError),
    #[error("Failed to fetch workout details for deletion")]
    DeleteLookupFailed(#[source] StoreError),

    // Mutation failures.
    #[error("Failed to add exercise")]
    AddExerciseFailed(#[source] StoreError),
    #[error("Failed to remove exercise")]
    RemoveExerciseFailed(#[source] StoreError),
    #[error("Failed to delete set")]
    RemoveSetFailed(#[source] StoreError),
    #[error("Failed to save workout")]
    SaveFailed(#[source] StoreError),
    #[error(transparent)]
    Delete(#[from] CascadeError),
}
