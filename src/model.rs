//src/model.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a workout. `Skipped` is part of the stored data model but no
/// action in this crate moves a workout into it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutStatus {
    #[default]
    Scheduled,
    Completed,
    Skipped,
}

impl WorkoutStatus {
    /// Whether `self -> next` is a legal transition. Re-saving a completed
    /// workout is only legal while it is being edited.
    #[must_use]
    pub const fn can_transition_to(self, next: Self, is_editing: bool) -> bool {
        matches!(
            (self, next, is_editing),
            (Self::Scheduled, Self::Completed | Self::Skipped, _)
                | (Self::Completed, Self::Completed, true)
        )
    }
}

// Convert string from DB to WorkoutStatus
impl TryFrom<&str> for WorkoutStatus {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            _ => anyhow::bail!("Invalid workout status string from DB: {}", value),
        }
    }
}

impl fmt::Display for WorkoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub owner: String,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub status: WorkoutStatus,
    pub created_at: DateTime<Utc>,
}

/// Join row placing an exercise at `order` inside a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub id: i64,
    pub workout_exercise_id: i64,
    pub position: i64,
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
    pub target_weight: Option<f64>,
    pub target_reps: Option<i64>,
    pub target_rpe: Option<f64>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Set {
    /// Logged weight, falling back to the planned one.
    #[must_use]
    pub fn effective_weight(&self) -> Option<f64> {
        self.weight.or(self.target_weight)
    }

    #[must_use]
    pub fn effective_reps(&self) -> Option<i64> {
        self.reps.or(self.target_reps)
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rpe_str = self.rpe.map(|r| format!(" @{r:.1}")).unwrap_or_default();
        write!(
            f,
            "#{} {:.1} x {}{}",
            self.position + 1,
            self.effective_weight().unwrap_or(0.0),
            self.effective_reps().unwrap_or(0),
            rpe_str
        )
    }
}

/// A workout exercise with its exercise and sets embedded, as returned by the
/// nested fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutExerciseDetail {
    pub id: i64,
    pub order: i64,
    pub exercise: Exercise,
    pub sets: Vec<Set>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDetail {
    pub workout: Workout,
    pub exercises: Vec<WorkoutExerciseDetail>,
}

/// One set as seen from an exercise's history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistorySet {
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
}

/// One past occurrence of an exercise: the workout date and the sets logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSession {
    pub date: NaiveDate,
    pub sets: Vec<HistorySet>,
}
