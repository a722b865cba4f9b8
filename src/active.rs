//src/active.rs
//! Local mirror of the workout being performed.
//!
//! Every edit lands in [`ActiveWorkout`] first and is written to the store
//! afterwards. Sets the store has not acknowledged yet carry a temporary key;
//! nothing is ever written against such a key.
use std::fmt;
use tracing::{debug, error, warn};

use crate::error::WorkoutError;
use crate::model::{Exercise, ExerciseSession, Set, Workout, WorkoutStatus};
use crate::store::{
    NewSet, NewWorkoutExercise, RecordStore, SessionQuery, SetChange, StoreError, WorkoutChanges,
};

/// Identity of a set in local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKey {
    /// Placeholder for a set the store has not created yet.
    Temp(u64),
    Stored(i64),
}

impl SetKey {
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::Temp(_))
    }

    #[must_use]
    pub const fn stored_id(self) -> Option<i64> {
        match self {
            Self::Stored(id) => Some(id),
            Self::Temp(_) => None,
        }
    }
}

impl fmt::Display for SetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temp(n) => write!(f, "temp-{n}"),
            Self::Stored(id) => write!(f, "{id}"),
        }
    }
}

/// Where a local set stands relative to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Pending,
    Confirmed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalSet {
    pub key: SetKey,
    pub workout_exercise_id: i64,
    pub position: i64,
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
    pub target_weight: Option<f64>,
    pub target_reps: Option<i64>,
    pub target_rpe: Option<f64>,
    pub completed: bool,
    pub sync: SyncState,
}

impl LocalSet {
    fn apply(&mut self, change: SetChange) {
        match change {
            SetChange::Weight(w) => self.weight = w,
            SetChange::Reps(r) => self.reps = r,
            SetChange::Rpe(r) => self.rpe = r,
            SetChange::Completed(c) => self.completed = c,
        }
    }

    /// Every logged field, for rewriting the whole row.
    fn all_changes(&self) -> [SetChange; 4] {
        [
            SetChange::Weight(self.weight),
            SetChange::Reps(self.reps),
            SetChange::Rpe(self.rpe),
            SetChange::Completed(self.completed),
        ]
    }

    fn to_new_set(&self) -> NewSet {
        NewSet {
            workout_exercise_id: self.workout_exercise_id,
            position: self.position,
            weight: self.weight,
            reps: self.reps,
            rpe: self.rpe,
            target_weight: self.target_weight,
            target_reps: self.target_reps,
            target_rpe: self.target_rpe,
            completed: self.completed,
        }
    }

    fn mark_failed(&mut self, err: &StoreError) {
        self.sync = SyncState::Failed {
            reason: err.to_string(),
        };
    }
}

// A logged zero counts as "not logged yet" when seeding the next set.
fn logged_or_target<T: Copy + Default + PartialEq>(logged: Option<T>, target: Option<T>) -> Option<T> {
    logged
        .filter(|v| *v != T::default())
        .or(target)
        .or(logged)
}

// Stored sets start out with their planned values filled in.
impl From<Set> for LocalSet {
    fn from(set: Set) -> Self {
        Self {
            key: SetKey::Stored(set.id),
            workout_exercise_id: set.workout_exercise_id,
            position: set.position,
            weight: set.weight.or(set.target_weight),
            reps: set.reps.or(set.target_reps),
            rpe: set.rpe,
            target_weight: set.target_weight,
            target_reps: set.target_reps,
            target_rpe: set.target_rpe,
            completed: set.completed,
            sync: SyncState::Confirmed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveExercise {
    /// The workout exercise (join row) id.
    pub id: i64,
    pub order: i64,
    pub exercise: Exercise,
    pub sets: Vec<LocalSet>,
    /// Recent prior sessions of this exercise, newest first.
    pub history: Vec<ExerciseSession>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveWorkout {
    pub workout: Workout,
    pub is_editing: bool,
    pub exercises: Vec<ActiveExercise>,
    history_limit: u32,
    next_temp: u64,
}

impl ActiveWorkout {
    /// Fetches a workout with its exercises, sets and recent history.
    /// # Errors
    /// `WorkoutError::LoadFailed` if the workout or its exercises cannot be read.
    pub fn load<S: RecordStore + ?Sized>(
        store: &S,
        workout_id: i64,
        is_editing: bool,
        history_limit: u32,
    ) -> Result<Self, WorkoutError> {
        let mut active = Self {
            workout: store
                .get_workout(workout_id)
                .map_err(WorkoutError::LoadFailed)?,
            is_editing,
            exercises: Vec::new(),
            history_limit,
            next_temp: 0,
        };
        active.exercises = active.fetch_exercises(store)?;
        Ok(active)
    }

    /// Throws local state away and reads everything again from the store.
    /// # Errors
    /// `WorkoutError::LoadFailed` if the store cannot be read.
    pub fn reload<S: RecordStore + ?Sized>(&mut self, store: &S) -> Result<(), WorkoutError> {
        debug!(workout_id = self.workout.id, "reloading active workout");
        self.workout = store
            .get_workout(self.workout.id)
            .map_err(WorkoutError::LoadFailed)?;
        self.exercises = self.fetch_exercises(store)?;
        Ok(())
    }

    fn fetch_exercises<S: RecordStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<ActiveExercise>, WorkoutError> {
        let mut details = store
            .workout_exercise_details(self.workout.id)
            .map_err(WorkoutError::LoadFailed)?;
        details.sort_by_key(|d| d.order);

        Ok(details
            .into_iter()
            .map(|detail| {
                let mut sets: Vec<LocalSet> = detail.sets.into_iter().map(LocalSet::from).collect();
                sets.sort_by_key(|s| s.position);
                ActiveExercise {
                    id: detail.id,
                    order: detail.order,
                    history: self.recent_history(store, detail.exercise.id),
                    exercise: detail.exercise,
                    sets,
                }
            })
            .collect())
    }

    // History is decoration: a failed read leaves it empty.
    fn recent_history<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        exercise_id: i64,
    ) -> Vec<ExerciseSession> {
        let query = SessionQuery {
            before: Some(self.workout.date),
            limit: Some(self.history_limit),
            newest_first: true,
        };
        store
            .exercise_sessions(exercise_id, &query)
            .unwrap_or_else(|e| {
                warn!(exercise_id, error = %e, "could not fetch exercise history");
                Vec::new()
            })
    }

    /// A completed workout opened outside edit mode is view-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.workout.status == WorkoutStatus::Completed && !self.is_editing
    }

    fn ensure_writable(&self) -> Result<(), WorkoutError> {
        if self.is_read_only() {
            return Err(WorkoutError::ReadOnly);
        }
        Ok(())
    }

    #[must_use]
    pub fn all_sets_completed(&self) -> bool {
        self.exercises
            .iter()
            .all(|ex| ex.sets.iter().all(|s| s.completed))
    }

    pub fn sets(&self) -> impl Iterator<Item = &LocalSet> {
        self.exercises.iter().flat_map(|ex| ex.sets.iter())
    }

    pub fn failed_sets(&self) -> impl Iterator<Item = &LocalSet> {
        self.sets()
            .filter(|s| matches!(s.sync, SyncState::Failed { .. }))
    }

    #[must_use]
    pub fn find_set(&self, key: SetKey) -> Option<&LocalSet> {
        self.sets().find(|s| s.key == key)
    }

    fn find_set_mut(&mut self, key: SetKey) -> Option<&mut LocalSet> {
        self.exercises
            .iter_mut()
            .flat_map(|ex| ex.sets.iter_mut())
            .find(|s| s.key == key)
    }

    fn exercise_mut(&mut self, workout_exercise_id: i64) -> Result<&mut ActiveExercise, WorkoutError> {
        self.exercises
            .iter_mut()
            .find(|ex| ex.id == workout_exercise_id)
            .ok_or(WorkoutError::UnknownWorkoutExercise(workout_exercise_id))
    }

    /// Changes one field of a set locally, then writes exactly that field.
    /// A set that failed to sync earlier gets its whole row rewritten instead.
    /// Temporary sets are only changed locally.
    ///
    /// Store failures do not error: the set is marked failed and the returned
    /// state says so.
    /// # Errors
    /// `WorkoutError::ReadOnly` outside edit mode on a completed workout,
    /// `WorkoutError::UnknownSet` if no set has `key`.
    pub fn update_set<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        key: SetKey,
        change: SetChange,
    ) -> Result<SyncState, WorkoutError> {
        self.ensure_writable()?;
        let set = self.find_set_mut(key).ok_or(WorkoutError::UnknownSet(key))?;
        set.apply(change);

        let Some(id) = key.stored_id() else {
            debug!(%key, field = change.column(), "local-only edit of unsaved set");
            return Ok(set.sync.clone());
        };

        let result = match set.sync {
            SyncState::Failed { .. } => store.update_set(id, &set.all_changes()),
            _ => store.update_set(id, &[change]),
        };
        match result {
            Ok(()) => set.sync = SyncState::Confirmed,
            Err(e) => {
                warn!(set_id = id, field = change.column(), error = %e, "set update failed");
                set.mark_failed(&e);
            }
        }
        Ok(set.sync.clone())
    }

    /// Appends a set seeded from the previous one and creates it in the store.
    /// On success the temporary set is replaced in place by the stored one;
    /// on failure it stays, marked failed, until [`Self::retry_failed`].
    /// # Errors
    /// `WorkoutError::ReadOnly` on a view-only workout,
    /// `WorkoutError::UnknownWorkoutExercise` if the exercise is not part of
    /// this workout.
    pub fn add_set<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        workout_exercise_id: i64,
    ) -> Result<SetKey, WorkoutError> {
        self.ensure_writable()?;
        let key = SetKey::Temp(self.next_temp);
        let exercise = self.exercise_mut(workout_exercise_id)?;

        let (weight, reps, position) = match exercise.sets.last() {
            Some(last) => (
                logged_or_target(last.weight, last.target_weight),
                logged_or_target(last.reps, last.target_reps),
                last.position + 1,
            ),
            None => (Some(0.0), Some(0), 0),
        };
        let local = LocalSet {
            key,
            workout_exercise_id,
            position,
            weight,
            reps,
            rpe: None,
            target_weight: None,
            target_reps: None,
            target_rpe: None,
            completed: false,
            sync: SyncState::Pending,
        };
        let new_set = local.to_new_set();
        exercise.sets.push(local);
        self.next_temp += 1;

        match store.insert_set(&new_set) {
            Ok(created) => {
                let stored = LocalSet::from(created);
                let stored_key = stored.key;
                if let Some(slot) = self.find_set_mut(key) {
                    *slot = stored;
                }
                debug!(%key, %stored_key, "set created");
                Ok(stored_key)
            }
            Err(e) => {
                warn!(%key, workout_exercise_id, error = %e, "set create failed");
                if let Some(slot) = self.find_set_mut(key) {
                    slot.mark_failed(&e);
                }
                Ok(key)
            }
        }
    }

    /// Drops a set locally, then deletes it in the store. The local removal
    /// stands even if the delete fails; reload to resynchronise.
    /// # Errors
    /// `ReadOnly` on a view-only workout, `UnknownWorkoutExercise`/`UnknownSet`
    /// for bad references, `RemoveSetFailed` if the store delete fails.
    pub fn remove_set<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        workout_exercise_id: i64,
        key: SetKey,
    ) -> Result<(), WorkoutError> {
        self.ensure_writable()?;
        let exercise = self.exercise_mut(workout_exercise_id)?;
        let index = exercise
            .sets
            .iter()
            .position(|s| s.key == key)
            .ok_or(WorkoutError::UnknownSet(key))?;
        exercise.sets.remove(index);

        if let Some(id) = key.stored_id() {
            store.delete_set(id).map_err(|e| {
                error!(set_id = id, error = %e, "set delete failed");
                WorkoutError::RemoveSetFailed(e)
            })?;
        }
        Ok(())
    }

    /// Adds an exercise to the workout with one set seeded from the last set
    /// of its most recent session before this workout, then fills in its history.
    /// # Errors
    /// `WorkoutError::ReadOnly` on a view-only workout,
    /// `WorkoutError::AddExerciseFailed` if the workout exercise cannot be
    /// created; local state is untouched in that case.
    pub fn add_exercise<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        exercise: &Exercise,
    ) -> Result<i64, WorkoutError> {
        self.ensure_writable()?;
        let latest = SessionQuery {
            before: Some(self.workout.date),
            limit: Some(1),
            newest_first: true,
        };
        let (weight, reps) = match store.exercise_sessions(exercise.id, &latest) {
            Ok(sessions) => sessions
                .first()
                .and_then(|s| s.sets.last())
                .map_or((0.0, 0), |s| (s.weight.unwrap_or(0.0), s.reps.unwrap_or(0))),
            Err(e) => {
                warn!(exercise_id = exercise.id, error = %e, "could not read last session");
                (0.0, 0)
            }
        };

        let order = self
            .exercises
            .iter()
            .map(|ex| ex.order + 1)
            .max()
            .unwrap_or(0);
        let workout_exercise = store
            .insert_workout_exercise(&NewWorkoutExercise {
                workout_id: self.workout.id,
                exercise_id: exercise.id,
                order,
            })
            .map_err(WorkoutError::AddExerciseFailed)?;

        let sets = match store.insert_set(&NewSet {
            workout_exercise_id: workout_exercise.id,
            position: 0,
            weight: Some(weight),
            reps: Some(reps),
            ..NewSet::default()
        }) {
            Ok(set) => vec![LocalSet::from(set)],
            Err(e) => {
                error!(workout_exercise_id = workout_exercise.id, error = %e, "initial set create failed");
                Vec::new()
            }
        };

        self.exercises.push(ActiveExercise {
            id: workout_exercise.id,
            order,
            exercise: exercise.clone(),
            sets,
            history: Vec::new(),
        });

        let history = self.recent_history(store, exercise.id);
        if let Ok(entry) = self.exercise_mut(workout_exercise.id) {
            entry.history = history;
        }
        Ok(workout_exercise.id)
    }

    /// Drops an exercise locally, then deletes its sets and its workout
    /// exercise row. Reload after a failure.
    /// # Errors
    /// `ReadOnly` on a view-only workout, `UnknownWorkoutExercise` for a bad
    /// id, `RemoveExerciseFailed` if either delete fails.
    pub fn remove_exercise<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        workout_exercise_id: i64,
    ) -> Result<(), WorkoutError> {
        self.ensure_writable()?;
        let before = self.exercises.len();
        self.exercises.retain(|ex| ex.id != workout_exercise_id);
        if self.exercises.len() == before {
            return Err(WorkoutError::UnknownWorkoutExercise(workout_exercise_id));
        }

        store
            .delete_sets_for(&[workout_exercise_id])
            .and_then(|_| store.delete_workout_exercise(workout_exercise_id))
            .map_err(|e| {
                error!(workout_exercise_id, error = %e, "exercise removal failed");
                WorkoutError::RemoveExerciseFailed(e)
            })
    }

    /// Marks the workout completed. Outside edit mode every set must be done.
    /// # Errors
    /// `IncompleteSets` or `InvalidTransition` before anything is written,
    /// `SaveFailed` if the store rejects the status change.
    pub fn complete<S: RecordStore + ?Sized>(&mut self, store: &S) -> Result<(), WorkoutError> {
        if !self.is_editing {
            let remaining = self.sets().filter(|s| !s.completed).count();
            if remaining > 0 {
                return Err(WorkoutError::IncompleteSets { remaining });
            }
        }
        let from = self.workout.status;
        let to = WorkoutStatus::Completed;
        if !from.can_transition_to(to, self.is_editing) {
            return Err(WorkoutError::InvalidTransition { from, to });
        }

        store
            .update_workout(
                self.workout.id,
                &WorkoutChanges {
                    status: Some(to),
                    ..WorkoutChanges::default()
                },
            )
            .map_err(WorkoutError::SaveFailed)?;
        self.workout.status = to;
        Ok(())
    }

    /// Re-sends every failed set: unsaved sets are created from their current
    /// local values, stored ones are rewritten in full.
    /// Returns how many sets are still failing.
    pub fn retry_failed<S: RecordStore + ?Sized>(&mut self, store: &S) -> usize {
        let mut still_failed = 0;
        for set in self.exercises.iter_mut().flat_map(|ex| ex.sets.iter_mut()) {
            if !matches!(set.sync, SyncState::Failed { .. }) {
                continue;
            }
            let result = match set.key {
                SetKey::Temp(_) => store.insert_set(&set.to_new_set()).map(|created| {
                    // Keep local edits made while unsaved.
                    let weight = set.weight;
                    let reps = set.reps;
                    *set = LocalSet::from(created);
                    set.weight = weight;
                    set.reps = reps;
                }),
                SetKey::Stored(id) => store
                    .update_set(id, &set.all_changes())
                    .map(|()| set.sync = SyncState::Confirmed),
            };
            if let Err(e) = result {
                warn!(key = %set.key, error = %e, "retry failed");
                set.mark_failed(&e);
                still_failed += 1;
            }
        }
        still_failed
    }
}
