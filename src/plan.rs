//src/plan.rs
//! Building and saving a workout plan before it is performed.
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::WorkoutError;
use crate::model::{Exercise, WorkoutDetail, WorkoutStatus};
use crate::store::{NewSet, NewWorkout, NewWorkoutExercise, RecordStore, WorkoutChanges};

pub const UNTITLED_WORKOUT: &str = "Untitled Workout";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlannedSet {
    pub weight: Option<f64>,
    pub reps: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedExercise {
    pub exercise_id: i64,
    pub name: String,
    pub sets: Vec<PlannedSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutPlan {
    pub name: String,
    pub date: NaiveDate,
    pub exercises: Vec<PlannedExercise>,
}

impl WorkoutPlan {
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            name: String::new(),
            date,
            exercises: Vec::new(),
        }
    }

    /// Rebuilds the editable plan of a stored workout, exercises by order.
    #[must_use]
    pub fn from_detail(detail: &WorkoutDetail) -> Self {
        let mut exercises = detail.exercises.clone();
        exercises.sort_by_key(|we| we.order);
        Self {
            name: detail.workout.name.clone().unwrap_or_default(),
            date: detail.workout.date,
            exercises: exercises
                .into_iter()
                .map(|we| {
                    let mut sets = we.sets;
                    sets.sort_by_key(|s| s.position);
                    PlannedExercise {
                        exercise_id: we.exercise.id,
                        name: we.exercise.name,
                        sets: sets
                            .iter()
                            .map(|s| PlannedSet {
                                weight: s.effective_weight(),
                                reps: s.effective_reps(),
                            })
                            .collect(),
                    }
                })
                .collect(),
        }
    }

    /// The name to store: trimmed, or the placeholder when blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            UNTITLED_WORKOUT
        } else {
            name
        }
    }

    /// Appends an exercise with one empty set.
    pub fn add_exercise(&mut self, exercise: &Exercise) {
        self.exercises.push(PlannedExercise {
            exercise_id: exercise.id,
            name: exercise.name.clone(),
            sets: vec![PlannedSet::default()],
        });
    }

    pub fn remove_exercise(&mut self, index: usize) -> Option<PlannedExercise> {
        (index < self.exercises.len()).then(|| self.exercises.remove(index))
    }

    /// Swaps an exercise with its neighbour. Moving past either end is a no-op.
    pub fn move_exercise(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1),
        };
        match target {
            Some(target) if index < self.exercises.len() && target < self.exercises.len() => {
                self.exercises.swap(index, target);
                true
            }
            _ => false,
        }
    }

    /// Adds a set copying the previous one, or an empty set.
    pub fn add_set(&mut self, exercise_index: usize) -> bool {
        let Some(exercise) = self.exercises.get_mut(exercise_index) else {
            return false;
        };
        let next = exercise.sets.last().copied().unwrap_or_default();
        exercise.sets.push(next);
        true
    }

    pub fn remove_set(&mut self, exercise_index: usize, set_index: usize) -> Option<PlannedSet> {
        let sets = &mut self.exercises.get_mut(exercise_index)?.sets;
        (set_index < sets.len()).then(|| sets.remove(set_index))
    }
}

/// Stores a plan as a scheduled workout and returns its id.
///
/// With `existing` the workout is renamed and its exercises are replaced;
/// otherwise a new workout owned by `owner` is created. An exercise whose
/// workout exercise row cannot be created is skipped, as is a set that fails.
/// # Errors
/// `EmptyPlan` and `NotLoggedIn` before anything is written; `SaveFailed` if
/// the workout itself cannot be created or cleared.
pub fn save_plan<S: RecordStore + ?Sized>(
    store: &S,
    plan: &WorkoutPlan,
    existing: Option<i64>,
    owner: Option<&str>,
) -> Result<i64, WorkoutError> {
    if plan.exercises.is_empty() {
        return Err(WorkoutError::EmptyPlan);
    }
    let owner = owner.ok_or(WorkoutError::NotLoggedIn)?;
    let name = plan.display_name().to_string();

    let workout_id = match existing {
        Some(id) => {
            store
                .update_workout(
                    id,
                    &WorkoutChanges {
                        name: Some(Some(name)),
                        date: Some(plan.date),
                        ..WorkoutChanges::default()
                    },
                )
                .map_err(WorkoutError::SaveFailed)?;
            let old = store
                .workout_exercise_ids(id)
                .map_err(WorkoutError::SaveFailed)?;
            if !old.is_empty() {
                store
                    .delete_sets_for(&old)
                    .and_then(|_| store.delete_workout_exercises_for_workout(id))
                    .map_err(WorkoutError::SaveFailed)?;
            }
            id
        }
        None => {
            store
                .insert_workout(&NewWorkout {
                    owner: owner.to_string(),
                    name: Some(name),
                    date: plan.date,
                    notes: None,
                    status: WorkoutStatus::Scheduled,
                })
                .map_err(WorkoutError::SaveFailed)?
                .id
        }
    };

    for (order, planned) in (0_i64..).zip(&plan.exercises) {
        let workout_exercise = match store.insert_workout_exercise(&NewWorkoutExercise {
            workout_id,
            exercise_id: planned.exercise_id,
            order,
        }) {
            Ok(we) => we,
            Err(e) => {
                warn!(workout_id, exercise_id = planned.exercise_id, error = %e, "skipping exercise");
                continue;
            }
        };
        for (position, set) in (0_i64..).zip(&planned.sets) {
            let new_set = NewSet {
                workout_exercise_id: workout_exercise.id,
                position,
                target_weight: set.weight,
                target_reps: set.reps,
                ..NewSet::default()
            };
            if let Err(e) = store.insert_set(&new_set) {
                warn!(workout_exercise_id = workout_exercise.id, position, error = %e, "skipping set");
            }
        }
    }
    debug!(workout_id, exercises = plan.exercises.len(), "plan saved");
    Ok(workout_id)
}
