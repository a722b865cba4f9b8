//src/schedule.rs
use chrono::{Duration, NaiveDate};
use std::fmt;

use crate::model::{Workout, WorkoutStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Today,
    Tomorrow,
    Upcoming,
    History,
}

impl Bucket {
    /// Forward-looking buckets, in display order.
    pub const SECTIONS: [Self; 3] = [Self::Today, Self::Tomorrow, Self::Upcoming];
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => write!(f, "Today"),
            Self::Tomorrow => write!(f, "Tomorrow"),
            Self::Upcoming => write!(f, "Upcoming"),
            Self::History => write!(f, "History"),
        }
    }
}

/// Places a workout relative to `today`. Scheduled workouts whose date has
/// passed land in `Today` so a missed session stays visible.
#[must_use]
pub fn bucket_for(workout: &Workout, today: NaiveDate) -> Bucket {
    if workout.status == WorkoutStatus::Completed {
        return Bucket::History;
    }
    let tomorrow = today + Duration::days(1);
    if workout.date == today {
        Bucket::Today
    } else if workout.date == tomorrow {
        Bucket::Tomorrow
    } else if workout.date > today {
        Bucket::Upcoming
    } else {
        Bucket::Today
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSection<T> {
    pub bucket: Bucket,
    pub workouts: Vec<T>,
}

/// Groups workouts into the today / tomorrow / upcoming sections. Completed
/// workouts are left out and empty sections are omitted. Input order is kept
/// inside each section.
pub fn group_workouts<T, F>(items: Vec<T>, today: NaiveDate, workout_of: F) -> Vec<WorkoutSection<T>>
where
    F: Fn(&T) -> &Workout,
{
    let mut sections: Vec<WorkoutSection<T>> = Bucket::SECTIONS
        .iter()
        .map(|&bucket| WorkoutSection {
            bucket,
            workouts: Vec::new(),
        })
        .collect();

    for item in items {
        let bucket = bucket_for(workout_of(&item), today);
        if let Some(section) = sections.iter_mut().find(|s| s.bucket == bucket) {
            section.workouts.push(item);
        }
    }

    sections.retain(|s| !s.workouts.is_empty());
    sections
}

/// Completed workouts, most recent first.
#[must_use]
pub fn history_workouts(workouts: &[Workout]) -> Vec<Workout> {
    let mut history: Vec<Workout> = workouts
        .iter()
        .filter(|w| w.status == WorkoutStatus::Completed)
        .cloned()
        .collect();
    history.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    history
}
