//src/lib.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// --- Declare modules ---
pub mod active;
pub mod cascade;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod history;
pub mod model;
pub mod plan;
pub mod schedule;
pub mod store;

// --- Expose public types ---
pub use active::{ActiveExercise, ActiveWorkout, LocalSet, SetKey, SyncState};
pub use cascade::{CascadeError, DeleteStep, DeleteWorkoutSaga};
pub use config::{
    get_config_path as get_config_path_util, load_config as load_config_util, parse_theme,
    save_config as save_config_util, Config, ConfigError, ThemeMode,
};
pub use context::{Auth, Screen, Session, SessionEvent, ThemeContext};
pub use db::{get_db_path as get_db_path_util, DbError, SqliteStore};
pub use error::WorkoutError;
pub use history::{aggregate, ExerciseProgress, ProgressPoint, MIN_CHART_POINTS};
pub use model::{
    Exercise, ExerciseSession, HistorySet, Set, Workout, WorkoutDetail, WorkoutExercise,
    WorkoutExerciseDetail, WorkoutStatus,
};
pub use plan::{Direction, PlannedExercise, PlannedSet, WorkoutPlan, UNTITLED_WORKOUT};
pub use schedule::{bucket_for, group_workouts, history_workouts, Bucket, WorkoutSection};
pub use store::{
    NewExercise, NewSet, NewWorkout, NewWorkoutExercise, RecordStore, SessionQuery, SetChange,
    StoreError, WorkoutChanges, WorkoutQuery,
};

// Blank optional text fields are stored as absent.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Owns the store and the process-wide contexts; every screen-level action
/// goes through here.
pub struct AppService<S: RecordStore = SqliteStore> {
    pub config: Config,
    pub store: S,
    pub auth: Auth,
    pub theme: ThemeContext,
    pub db_path: Option<PathBuf>,
    /// `None` when the service runs without a config file (tests).
    pub config_path: Option<PathBuf>,
}

impl AppService<SqliteStore> {
    /// Initializes the application service from the config file and the
    /// on-disk database, restoring the last session.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        let mut service = Self::with_store(store, config);
        service.theme = ThemeContext::new(service.config.theme, Some(config_path.clone()));
        service.db_path = Some(db_path);
        service.config_path = Some(config_path);
        Ok(service)
    }
}

impl<S: RecordStore> AppService<S> {
    /// Builds a service over any store without touching the filesystem.
    pub fn with_store(store: S, config: Config) -> Self {
        let session = match (&config.user_id, &config.email) {
            (Some(user_id), Some(email)) => Some(Session {
                user_id: user_id.clone(),
                email: email.clone(),
            }),
            _ => None,
        };
        Self {
            theme: ThemeContext::new(config.theme, None),
            auth: Auth::new(session),
            config,
            store,
            db_path: None,
            config_path: None,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn get_config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn get_db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Saves the current configuration state. A no-op without a config file.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        match &self.config_path {
            Some(path) => config::save_config(path, &self.config),
            None => Ok(()),
        }
    }

    /// Sets how many prior sessions the active workout shows per exercise.
    /// # Errors
    /// `ConfigError::InvalidHistoryLimit` for 0, or a save failure.
    pub fn set_history_limit(&mut self, limit: u32) -> Result<(), ConfigError> {
        if limit == 0 {
            return Err(ConfigError::InvalidHistoryLimit);
        }
        self.config.history_limit = limit;
        self.save_config()
    }

    // --- Session ---

    /// Starts a session and remembers it for the next start.
    /// # Errors
    /// Fails if the user id or email is blank, or the config cannot be saved.
    pub fn sign_in(&mut self, user_id: &str, email: &str) -> Result<()> {
        let user_id = user_id.trim();
        let email = email.trim();
        if user_id.is_empty() || email.is_empty() {
            anyhow::bail!("User id and email are required to sign in.");
        }
        self.auth.sign_in(Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
        });
        self.config.user_id = Some(user_id.to_string());
        self.config.email = Some(email.to_string());
        self.save_config().context("Failed to remember session")
    }

    /// # Errors
    /// Fails if the config cannot be saved.
    pub fn sign_out(&mut self) -> Result<()> {
        self.auth.sign_out();
        self.config.user_id = None;
        self.config.email = None;
        self.save_config().context("Failed to forget session")
    }

    fn require_owner(&self) -> Result<String, WorkoutError> {
        self.auth
            .owner()
            .map(ToString::to_string)
            .ok_or(WorkoutError::NotLoggedIn)
    }

    /// Flips between dark and light and persists the choice.
    /// # Errors
    /// Returns `ConfigError` if the flag cannot be written.
    pub fn toggle_theme(&mut self) -> Result<ThemeMode, ConfigError> {
        let mode = self.theme.toggle()?;
        self.config.theme = mode;
        Ok(mode)
    }

    // --- Exercises ---

    fn validated_exercise(
        &self,
        name: &str,
        muscle_group: Option<&str>,
        equipment: Option<&str>,
    ) -> Result<NewExercise, WorkoutError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkoutError::NameRequired);
        }
        Ok(NewExercise {
            name: name.to_string(),
            muscle_group: non_blank(muscle_group),
            equipment: non_blank(equipment),
            owner: Some(self.require_owner()?),
        })
    }

    /// Creates an exercise owned by the signed-in user.
    /// # Errors
    /// `WorkoutError::NameRequired`/`NotLoggedIn` on bad input, or a store failure.
    pub fn create_exercise(
        &self,
        name: &str,
        muscle_group: Option<&str>,
        equipment: Option<&str>,
    ) -> Result<Exercise> {
        let new = self.validated_exercise(name, muscle_group, equipment)?;
        let exercise = self
            .store
            .insert_exercise(&new)
            .with_context(|| format!("Failed to create exercise '{}'", new.name))?;
        info!(id = exercise.id, name = %exercise.name, "exercise created");
        Ok(exercise)
    }

    /// Replaces an exercise's name, muscle group and equipment.
    /// # Errors
    /// Same validation as [`Self::create_exercise`], or a store failure.
    pub fn update_exercise(
        &self,
        id: i64,
        name: &str,
        muscle_group: Option<&str>,
        equipment: Option<&str>,
    ) -> Result<()> {
        let changes = self.validated_exercise(name, muscle_group, equipment)?;
        self.store
            .update_exercise(id, &changes)
            .with_context(|| format!("Failed to update exercise {id}"))
    }

    /// Deletes an exercise; its workout exercises and sets go with it.
    /// # Errors
    /// Returns `anyhow::Error` wrapping the store failure.
    pub fn delete_exercise(&self, id: i64) -> Result<()> {
        self.store
            .delete_exercise(id)
            .with_context(|| format!("Failed to delete exercise {id}"))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping the store failure.
    pub fn get_exercise(&self, id: i64) -> Result<Exercise> {
        self.store
            .get_exercise(id)
            .with_context(|| format!("Failed to load exercise {id}"))
    }

    /// All exercises by name.
    /// # Errors
    /// Returns `anyhow::Error` wrapping the store failure.
    pub fn list_exercises(&self) -> Result<Vec<Exercise>> {
        self.store
            .list_exercises()
            .context("Failed to list exercises")
    }

    /// Exercises whose name contains `query`, ignoring case.
    /// # Errors
    /// Returns `anyhow::Error` wrapping the store failure.
    pub fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>> {
        let needle = query.trim().to_lowercase();
        let mut exercises = self.list_exercises()?;
        exercises.retain(|e| e.name.to_lowercase().contains(&needle));
        Ok(exercises)
    }

    /// Progress series and statistics for one exercise.
    /// # Errors
    /// Returns `anyhow::Error` wrapping the store failure.
    pub fn exercise_progress(&self, exercise_id: i64) -> Result<ExerciseProgress> {
        let sessions = self
            .store
            .exercise_sessions(exercise_id, &SessionQuery::default())
            .with_context(|| format!("Failed to load history for exercise {exercise_id}"))?;
        Ok(aggregate(&sessions))
    }

    // --- Workouts ---

    fn owned_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>> {
        let owner = self.require_owner()?;
        let mut workouts = self
            .store
            .list_workouts(query)
            .context("Failed to list workouts")?;
        workouts.retain(|w| w.owner == owner);
        Ok(workouts)
    }

    /// A workout with its exercises (by order) and their sets (by position).
    /// # Errors
    /// `WorkoutError::LoadFailed` if any part cannot be read.
    pub fn workout_detail(&self, workout_id: i64) -> Result<WorkoutDetail> {
        let workout = self
            .store
            .get_workout(workout_id)
            .map_err(WorkoutError::LoadFailed)?;
        let mut exercises = self
            .store
            .workout_exercise_details(workout_id)
            .map_err(WorkoutError::LoadFailed)?;
        exercises.sort_by_key(|we| we.order);
        for we in &mut exercises {
            we.sets.sort_by_key(|s| s.position);
        }
        Ok(WorkoutDetail { workout, exercises })
    }

    /// The signed-in user's upcoming workouts grouped into today, tomorrow and
    /// upcoming, with exercises embedded.
    /// # Errors
    /// `WorkoutError::NotLoggedIn`, or a store failure.
    pub fn home_sections(&self, today: NaiveDate) -> Result<Vec<WorkoutSection<WorkoutDetail>>> {
        let workouts = self.owned_workouts(&WorkoutQuery {
            status: None,
            ascending: true,
        })?;
        let details = workouts
            .into_iter()
            .filter(|w| w.status != WorkoutStatus::Completed)
            .map(|w| self.workout_detail(w.id))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = details.len(), %today, "grouping home workouts");
        Ok(group_workouts(details, today, |d| &d.workout))
    }

    /// Completed workouts, newest first.
    /// # Errors
    /// `WorkoutError::NotLoggedIn`, or a store failure.
    pub fn completed_workouts(&self) -> Result<Vec<Workout>> {
        let workouts = self.owned_workouts(&WorkoutQuery {
            status: Some(WorkoutStatus::Completed),
            ascending: false,
        })?;
        Ok(history_workouts(&workouts))
    }

    /// Loads a workout for performing (or, when completed, viewing/editing).
    /// # Errors
    /// `WorkoutError::LoadFailed` if the workout cannot be read.
    pub fn open_workout(&self, workout_id: i64, is_editing: bool) -> Result<ActiveWorkout> {
        Ok(ActiveWorkout::load(
            &self.store,
            workout_id,
            is_editing,
            self.config.history_limit,
        )?)
    }

    /// The editable plan of a stored workout.
    /// # Errors
    /// `WorkoutError::LoadFailed` if the workout cannot be read.
    pub fn load_plan(&self, workout_id: i64) -> Result<WorkoutPlan> {
        Ok(WorkoutPlan::from_detail(&self.workout_detail(workout_id)?))
    }

    /// Saves a plan as a new workout or over `existing`, returning its id.
    /// # Errors
    /// Validation or save failures as `WorkoutError`.
    pub fn save_plan(&self, plan: &WorkoutPlan, existing: Option<i64>) -> Result<i64> {
        let id = plan::save_plan(&self.store, plan, existing, self.auth.owner())?;
        info!(workout_id = id, "workout plan saved");
        Ok(id)
    }

    /// Deletes a workout with all of its exercises and sets.
    /// # Errors
    /// `WorkoutError::DeleteLookupFailed` or `WorkoutError::Delete`.
    pub fn delete_workout(&self, workout_id: i64) -> Result<()> {
        Ok(cascade::delete_workout(&self.store, workout_id)?)
    }
}
