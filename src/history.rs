//src/history.rs
//! Progress series and statistics for one exercise.
use chrono::NaiveDate;

use crate::model::ExerciseSession;

/// Fewer retained sessions than this and there is nothing to chart.
pub const MIN_CHART_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub max_weight: f64,
}

impl ProgressPoint {
    /// Short axis label, e.g. `03/07`.
    #[must_use]
    pub fn chart_label(&self) -> String {
        self.date.format("%m/%d").to_string()
    }

    /// Label for the history list, e.g. `Mar 7, 2025`.
    #[must_use]
    pub fn list_label(&self) -> String {
        self.date.format("%b %-d, %Y").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExerciseProgress {
    /// Ascending by date. This order is canonical; use [`Self::list_view`]
    /// for a reversed presentation.
    pub points: Vec<ProgressPoint>,
    pub personal_record: f64,
    pub total_sessions: usize,
}

impl ExerciseProgress {
    #[must_use]
    pub fn has_chart(&self) -> bool {
        self.points.len() >= MIN_CHART_POINTS
    }

    /// The points in display order without touching the canonical series.
    pub fn list_view(&self, ascending: bool) -> Box<dyn Iterator<Item = &ProgressPoint> + '_> {
        if ascending {
            Box::new(self.points.iter())
        } else {
            Box::new(self.points.iter().rev())
        }
    }
}

/// Heaviest weight logged in a session; missing weights count as 0.
#[must_use]
pub fn session_max_weight(session: &ExerciseSession) -> f64 {
    session
        .sets
        .iter()
        .map(|s| s.weight.unwrap_or(0.0))
        .fold(0.0, f64::max)
}

/// Reduces raw sessions to a chartable series. Sessions without a positive
/// weight are not data points and are dropped.
#[must_use]
pub fn aggregate(sessions: &[ExerciseSession]) -> ExerciseProgress {
    let mut points: Vec<ProgressPoint> = sessions
        .iter()
        .map(|s| ProgressPoint {
            date: s.date,
            max_weight: session_max_weight(s),
        })
        .filter(|p| p.max_weight > 0.0)
        .collect();
    // Stable, so sessions on the same day keep their fetch order.
    points.sort_by_key(|p| p.date);

    let personal_record = points.iter().map(|p| p.max_weight).fold(0.0, f64::max);

    ExerciseProgress {
        total_sessions: points.len(),
        personal_record,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HistorySet;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn session(d: u32, weights: &[Option<f64>]) -> ExerciseSession {
        ExerciseSession {
            date: day(d),
            sets: weights
                .iter()
                .map(|&weight| HistorySet {
                    weight,
                    reps: Some(5),
                    rpe: None,
                })
                .collect(),
        }
    }

    #[test]
    fn drops_weightless_sessions_and_sorts_by_date() {
        let sessions = vec![
            session(9, &[Some(100.0), Some(105.0)]),
            session(2, &[None, Some(0.0)]),
            session(4, &[Some(95.0)]),
            session(6, &[]),
        ];
        let progress = aggregate(&sessions);
        let dates: Vec<_> = progress.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(4), day(9)]);
        assert_eq!(progress.points[1].max_weight, 105.0);
        assert_eq!(progress.total_sessions, 2);
        assert_eq!(progress.personal_record, 105.0);
        assert!(progress.has_chart());
    }

    #[test]
    fn empty_history_has_zero_record_and_no_chart() {
        let progress = aggregate(&[session(1, &[None])]);
        assert!(progress.points.is_empty());
        assert_eq!(progress.personal_record, 0.0);
        assert_eq!(progress.total_sessions, 0);
        assert!(!progress.has_chart());
    }

    #[test]
    fn single_session_is_not_enough_for_a_chart() {
        let progress = aggregate(&[session(1, &[Some(60.0)])]);
        assert_eq!(progress.personal_record, 60.0);
        assert!(!progress.has_chart());
    }

    #[test]
    fn list_view_reverses_without_mutating() {
        let progress = aggregate(&[
            session(1, &[Some(50.0)]),
            session(2, &[Some(55.0)]),
            session(3, &[Some(52.5)]),
        ]);
        let desc: Vec<_> = progress.list_view(false).map(|p| p.date).collect();
        assert_eq!(desc, vec![day(3), day(2), day(1)]);
        let asc: Vec<_> = progress.list_view(true).map(|p| p.date).collect();
        assert_eq!(asc, vec![day(1), day(2), day(3)]);
        assert_eq!(progress.points[0].date, day(1));
    }

    #[test]
    fn labels() {
        let point = ProgressPoint {
            date: day(7),
            max_weight: 1.0,
        };
        assert_eq!(point.chart_label(), "03/07");
        assert_eq!(point.list_label(), "Mar 7, 2025");
    }
}
