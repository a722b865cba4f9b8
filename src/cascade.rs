//src/cascade.rs
//! Ordered removal of a workout and everything beneath it.
//!
//! The store does not cascade workout deletes, so the children go first:
//! sets, then workout exercises, then the workout row. A step only runs once
//! every earlier step has succeeded, and a stopped saga resumes at the step
//! that failed.
use std::fmt;
use tracing::{debug, error, info};

use crate::error::WorkoutError;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStep {
    Sets { workout_exercise_ids: Vec<i64> },
    WorkoutExercises { workout_id: i64 },
    Workout { workout_id: i64 },
}

impl DeleteStep {
    fn run<S: RecordStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        match self {
            Self::Sets {
                workout_exercise_ids,
            } => store.delete_sets_for(workout_exercise_ids).map(|n| {
                debug!(deleted = n, "deleted sets");
            }),
            Self::WorkoutExercises { workout_id } => store
                .delete_workout_exercises_for_workout(*workout_id)
                .map(|n| {
                    debug!(deleted = n, workout_id, "deleted workout exercises");
                }),
            Self::Workout { workout_id } => store.delete_workout(*workout_id),
        }
    }
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sets { .. } => write!(f, "delete associated sets"),
            Self::WorkoutExercises { .. } => write!(f, "delete workout exercises"),
            Self::Workout { .. } => write!(f, "delete workout"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to {step}")]
pub struct CascadeError {
    pub step: DeleteStep,
    /// Steps that had already succeeded when this one failed.
    pub completed: usize,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteWorkoutSaga {
    workout_id: i64,
    steps: Vec<DeleteStep>,
    completed: usize,
}

impl DeleteWorkoutSaga {
    /// Looks up the workout's children and lays out the steps. Nothing is
    /// deleted if the lookup fails.
    pub fn plan<S: RecordStore + ?Sized>(store: &S, workout_id: i64) -> Result<Self, StoreError> {
        let workout_exercise_ids = store.workout_exercise_ids(workout_id)?;
        let mut steps = Vec::with_capacity(3);
        if !workout_exercise_ids.is_empty() {
            steps.push(DeleteStep::Sets {
                workout_exercise_ids,
            });
            steps.push(DeleteStep::WorkoutExercises { workout_id });
        }
        steps.push(DeleteStep::Workout { workout_id });
        Ok(Self {
            workout_id,
            steps,
            completed: 0,
        })
    }

    pub fn steps(&self) -> &[DeleteStep] {
        &self.steps
    }

    pub const fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.steps.len()
    }

    /// Runs the remaining steps in order, stopping at the first failure.
    pub fn run<S: RecordStore + ?Sized>(&mut self, store: &S) -> Result<(), CascadeError> {
        while let Some(step) = self.steps.get(self.completed) {
            if let Err(source) = step.run(store) {
                error!(workout_id = self.workout_id, %step, error = %source, "workout delete stopped");
                return Err(CascadeError {
                    step: step.clone(),
                    completed: self.completed,
                    source,
                });
            }
            self.completed += 1;
        }
        info!(workout_id = self.workout_id, "workout deleted");
        Ok(())
    }
}

/// Deletes a workout with all of its workout exercises and sets.
/// # Errors
/// `WorkoutError::DeleteLookupFailed` if the children cannot be listed (nothing
/// is deleted), `WorkoutError::Delete` naming the step that failed otherwise.
pub fn delete_workout<S: RecordStore + ?Sized>(store: &S, workout_id: i64) -> Result<(), WorkoutError> {
    let mut saga =
        DeleteWorkoutSaga::plan(store, workout_id).map_err(WorkoutError::DeleteLookupFailed)?;
    saga.run(store)?;
    Ok(())
}
