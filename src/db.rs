//src/db.rs
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{named_params, params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::model::{
    Exercise, ExerciseSession, HistorySet, Set, Workout, WorkoutExercise, WorkoutExerciseDetail,
    WorkoutStatus,
};
use crate::store::{
    collections, NewExercise, NewSet, NewWorkout, NewWorkoutExercise, RecordStore, SessionQuery,
    SetChange, StoreError, StoreResult, WorkoutChanges, WorkoutQuery,
};

// Custom Error type for DB operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

const DB_FILE_NAME: &str = "gymtrack.sqlite";
const APP_DATA_DIR: &str = "gymtrack";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Gets the path to the SQLite database file within the app's data directory.
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let data_dir = dirs::data_dir().ok_or(DbError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database with foreign keys enforced.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    let conn = Connection::open(path).map_err(DbError::Connection)?;
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    Ok(conn)
}

/// Initializes the database tables if they don't exist.
///
/// Deleting an exercise cascades to its workout exercises and their sets.
/// Workouts deliberately do not cascade: a workout with children can only be
/// removed after its sets and workout exercises are gone.
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            muscle_group TEXT,
            equipment TEXT,
            user_id TEXT,
            created_at TEXT NOT NULL -- RFC3339
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS workouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            name TEXT,
            date TEXT NOT NULL, -- YYYY-MM-DD
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'scheduled' CHECK(status IN ('scheduled', 'completed', 'skipped')),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS workout_exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL REFERENCES workouts(id),
            exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
            sort_order INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_exercise_id INTEGER NOT NULL REFERENCES workout_exercises(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            weight REAL,
            reps INTEGER,
            rpe REAL,
            target_weight REAL,
            target_reps INTEGER,
            target_rpe REAL,
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_workouts_date ON workouts(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_workout_exercises_workout ON workout_exercises(workout_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_workout_exercises_exercise ON workout_exercises(exercise_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sets_workout_exercise ON sets(workout_exercise_id)",
        [],
    )?;

    Ok(())
}

fn conversion_error(col: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_timestamp(col: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(col, e))
}

fn parse_date(col: usize, value: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| conversion_error(col, e))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// Column order: id, name, muscle_group, equipment, user_id, created_at
fn map_row_to_exercise(row: &Row) -> Result<Exercise, rusqlite::Error> {
    let created_at: String = row.get(5)?;
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        muscle_group: row.get(2)?,
        equipment: row.get(3)?,
        owner: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
    })
}

// Column order: id, user_id, name, date, notes, status, created_at
fn map_row_to_workout(row: &Row) -> Result<Workout, rusqlite::Error> {
    let date: String = row.get(3)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let status = WorkoutStatus::try_from(status.as_str()).map_err(|e| {
        conversion_error(5, std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    })?;
    Ok(Workout {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        date: parse_date(3, &date)?,
        notes: row.get(4)?,
        status,
        created_at: parse_timestamp(6, &created_at)?,
    })
}

// Column order: id, workout_exercise_id, position, weight, reps, rpe,
// target_weight, target_reps, target_rpe, completed, created_at
fn map_row_to_set(row: &Row) -> Result<Set, rusqlite::Error> {
    let created_at: String = row.get(10)?;
    Ok(Set {
        id: row.get(0)?,
        workout_exercise_id: row.get(1)?,
        position: row.get(2)?,
        weight: row.get(3)?,
        reps: row.get(4)?,
        rpe: row.get(5)?,
        target_weight: row.get(6)?,
        target_reps: row.get(7)?,
        target_rpe: row.get(8)?,
        completed: row.get(9)?,
        created_at: parse_timestamp(10, &created_at)?,
    })
}

const EXERCISE_COLUMNS: &str = "id, name, muscle_group, equipment, user_id, created_at";
const WORKOUT_COLUMNS: &str = "id, user_id, name, date, notes, status, created_at";
const SET_COLUMNS: &str = "id, workout_exercise_id, position, weight, reps, rpe, target_weight, target_reps, target_rpe, completed, created_at";

/// SQLite-backed [`RecordStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = open_db(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    fn sets_for_workout_exercise(&self, workout_exercise_id: i64) -> Result<Vec<Set>, DbError> {
        let sql = format!(
            "SELECT {SET_COLUMNS} FROM sets WHERE workout_exercise_id = ?1 ORDER BY position ASC, created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(DbError::QueryFailed)?;
        let sets = stmt
            .query_map(params![workout_exercise_id], map_row_to_set)
            .map_err(DbError::QueryFailed)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::QueryFailed)?;
        Ok(sets)
    }

    fn get_set(&self, id: i64) -> StoreResult<Set> {
        let sql = format!("SELECT {SET_COLUMNS} FROM sets WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], map_row_to_set)
            .optional()
            .map_err(DbError::QueryFailed)?
            .ok_or(StoreError::NotFound {
                collection: collections::SETS,
                id,
            })
    }

    fn get_workout_exercise(&self, id: i64) -> StoreResult<WorkoutExercise> {
        self.conn
            .query_row(
                "SELECT id, workout_id, exercise_id, sort_order, created_at FROM workout_exercises WHERE id = ?1",
                params![id],
                |row| {
                    let created_at: String = row.get(4)?;
                    Ok(WorkoutExercise {
                        id: row.get(0)?,
                        workout_id: row.get(1)?,
                        exercise_id: row.get(2)?,
                        order: row.get(3)?,
                        created_at: parse_timestamp(4, &created_at)?,
                    })
                },
            )
            .optional()
            .map_err(DbError::QueryFailed)?
            .ok_or(StoreError::NotFound {
                collection: collections::WORKOUT_EXERCISES,
                id,
            })
    }

    fn delete_by_id(&self, table: &'static str, id: i64) -> StoreResult<()> {
        let sql = format!("DELETE FROM {table} WHERE id = ?1");
        let rows_affected = self
            .conn
            .execute(&sql, params![id])
            .map_err(DbError::DeleteFailed)?;
        if rows_affected == 0 {
            Err(StoreError::NotFound {
                collection: table,
                id,
            })
        } else {
            debug!(table, id, "deleted record");
            Ok(())
        }
    }

    // Runs an `UPDATE table SET ... WHERE id = :id` built from `updates`.
    fn execute_update(
        &self,
        table: &'static str,
        id: i64,
        updates: &[&str],
        mut params_map: HashMap<String, Box<dyn ToSql>>,
    ) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let sql = format!("UPDATE {table} SET {} WHERE id = :id", updates.join(", "));
        params_map.insert(":id".into(), Box::new(id));

        let params_for_exec: Vec<(&str, &dyn ToSql)> = params_map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect();

        let rows_affected = self
            .conn
            .execute(&sql, params_for_exec.as_slice())
            .map_err(DbError::UpdateFailed)?;
        if rows_affected == 0 {
            Err(StoreError::NotFound {
                collection: table,
                id,
            })
        } else {
            Ok(())
        }
    }
}

impl RecordStore for SqliteStore {
    fn list_exercises(&self) -> StoreResult<Vec<Exercise>> {
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY name COLLATE NOCASE ASC");
        let mut stmt = self.conn.prepare(&sql).map_err(DbError::QueryFailed)?;
        let exercises = stmt
            .query_map([], map_row_to_exercise)
            .map_err(DbError::QueryFailed)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::QueryFailed)?;
        Ok(exercises)
    }

    fn get_exercise(&self, id: i64) -> StoreResult<Exercise> {
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], map_row_to_exercise)
            .optional()
            .map_err(DbError::QueryFailed)?
            .ok_or(StoreError::NotFound {
                collection: collections::EXERCISES,
                id,
            })
    }

    fn insert_exercise(&self, new: &NewExercise) -> StoreResult<Exercise> {
        self.conn
            .execute(
                "INSERT INTO exercises (name, muscle_group, equipment, user_id, created_at)
                 VALUES (:name, :muscle_group, :equipment, :user_id, :created_at)",
                named_params! {
                    ":name": new.name,
                    ":muscle_group": new.muscle_group,
                    ":equipment": new.equipment,
                    ":user_id": new.owner,
                    ":created_at": Utc::now().to_rfc3339(),
                },
            )
            .map_err(DbError::InsertFailed)?;
        self.get_exercise(self.conn.last_insert_rowid())
    }

    fn update_exercise(&self, id: i64, changes: &NewExercise) -> StoreResult<()> {
        let mut params_map: HashMap<String, Box<dyn ToSql>> = HashMap::new();
        params_map.insert(":name".into(), Box::new(changes.name.clone()));
        params_map.insert(":muscle_group".into(), Box::new(changes.muscle_group.clone()));
        params_map.insert(":equipment".into(), Box::new(changes.equipment.clone()));
        self.execute_update(
            collections::EXERCISES,
            id,
            &[
                "name = :name",
                "muscle_group = :muscle_group",
                "equipment = :equipment",
            ],
            params_map,
        )
    }

    fn delete_exercise(&self, id: i64) -> StoreResult<()> {
        self.delete_by_id(collections::EXERCISES, id)
    }

    fn list_workouts(&self, query: &WorkoutQuery) -> StoreResult<Vec<Workout>> {
        let mut sql = format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE 1=1");
        let mut params_map: HashMap<String, Box<dyn ToSql>> = HashMap::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = :status");
            params_map.insert(":status".into(), Box::new(status.to_string()));
        }
        if query.ascending {
            sql.push_str(" ORDER BY date ASC, created_at ASC");
        } else {
            sql.push_str(" ORDER BY date DESC, created_at DESC");
        }

        let params_for_query: Vec<(&str, &dyn ToSql)> = params_map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect();

        let mut stmt = self.conn.prepare(&sql).map_err(DbError::QueryFailed)?;
        let workouts = stmt
            .query_map(params_for_query.as_slice(), map_row_to_workout)
            .map_err(DbError::QueryFailed)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::QueryFailed)?;
        Ok(workouts)
    }

    fn get_workout(&self, id: i64) -> StoreResult<Workout> {
        let sql = format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], map_row_to_workout)
            .optional()
            .map_err(DbError::QueryFailed)?
            .ok_or(StoreError::NotFound {
                collection: collections::WORKOUTS,
                id,
            })
    }

    fn insert_workout(&self, new: &NewWorkout) -> StoreResult<Workout> {
        self.conn
            .execute(
                "INSERT INTO workouts (user_id, name, date, notes, status, created_at)
                 VALUES (:user_id, :name, :date, :notes, :status, :created_at)",
                named_params! {
                    ":user_id": new.owner,
                    ":name": new.name,
                    ":date": format_date(new.date),
                    ":notes": new.notes,
                    ":status": new.status.to_string(),
                    ":created_at": Utc::now().to_rfc3339(),
                },
            )
            .map_err(DbError::InsertFailed)?;
        self.get_workout(self.conn.last_insert_rowid())
    }

    fn update_workout(&self, id: i64, changes: &WorkoutChanges) -> StoreResult<()> {
        let mut params_map: HashMap<String, Box<dyn ToSql>> = HashMap::new();
        let mut updates = Vec::new();

        if let Some(name) = &changes.name {
            updates.push("name = :name");
            params_map.insert(":name".into(), Box::new(name.clone()));
        }
        if let Some(date) = changes.date {
            updates.push("date = :date");
            params_map.insert(":date".into(), Box::new(format_date(date)));
        }
        if let Some(notes) = &changes.notes {
            updates.push("notes = :notes");
            params_map.insert(":notes".into(), Box::new(notes.clone()));
        }
        if let Some(status) = changes.status {
            updates.push("status = :status");
            params_map.insert(":status".into(), Box::new(status.to_string()));
        }

        self.execute_update(collections::WORKOUTS, id, &updates, params_map)
    }

    fn delete_workout(&self, id: i64) -> StoreResult<()> {
        self.delete_by_id(collections::WORKOUTS, id)
    }

    fn workout_exercise_ids(&self, workout_id: i64) -> StoreResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM workout_exercises WHERE workout_id = ?1 ORDER BY sort_order ASC")
            .map_err(DbError::QueryFailed)?;
        let ids = stmt
            .query_map(params![workout_id], |row| row.get(0))
            .map_err(DbError::QueryFailed)?
            .collect::<Result<Vec<i64>, _>>()
            .map_err(DbError::QueryFailed)?;
        Ok(ids)
    }

    fn insert_workout_exercise(&self, new: &NewWorkoutExercise) -> StoreResult<WorkoutExercise> {
        self.conn
            .execute(
                "INSERT INTO workout_exercises (workout_id, exercise_id, sort_order, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    new.workout_id,
                    new.exercise_id,
                    new.order,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(DbError::InsertFailed)?;
        self.get_workout_exercise(self.conn.last_insert_rowid())
    }

    fn delete_workout_exercise(&self, id: i64) -> StoreResult<()> {
        self.delete_by_id(collections::WORKOUT_EXERCISES, id)
    }

    fn delete_workout_exercises_for_workout(&self, workout_id: i64) -> StoreResult<u64> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM workout_exercises WHERE workout_id = ?1",
                params![workout_id],
            )
            .map_err(DbError::DeleteFailed)?;
        Ok(rows as u64)
    }

    fn workout_exercise_details(
        &self,
        workout_id: i64,
    ) -> StoreResult<Vec<WorkoutExerciseDetail>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT we.id, we.sort_order, e.id, e.name, e.muscle_group, e.equipment, e.user_id, e.created_at
                 FROM workout_exercises we JOIN exercises e ON e.id = we.exercise_id
                 WHERE we.workout_id = ?1 ORDER BY we.sort_order ASC, we.id ASC",
            )
            .map_err(DbError::QueryFailed)?;
        let rows = stmt
            .query_map(params![workout_id], |row| {
                let created_at: String = row.get(7)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    Exercise {
                        id: row.get(2)?,
                        name: row.get(3)?,
                        muscle_group: row.get(4)?,
                        equipment: row.get(5)?,
                        owner: row.get(6)?,
                        created_at: parse_timestamp(7, &created_at)?,
                    },
                ))
            })
            .map_err(DbError::QueryFailed)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::QueryFailed)?;

        rows.into_iter()
            .map(|(id, order, exercise)| -> StoreResult<WorkoutExerciseDetail> {
                Ok(WorkoutExerciseDetail {
                    id,
                    order,
                    exercise,
                    sets: self.sets_for_workout_exercise(id)?,
                })
            })
            .collect()
    }

    fn insert_set(&self, new: &NewSet) -> StoreResult<Set> {
        self.conn
            .execute(
                "INSERT INTO sets (workout_exercise_id, position, weight, reps, rpe, target_weight, target_reps, target_rpe, completed, created_at)
                 VALUES (:we_id, :position, :weight, :reps, :rpe, :target_weight, :target_reps, :target_rpe, :completed, :created_at)",
                named_params! {
                    ":we_id": new.workout_exercise_id,
                    ":position": new.position,
                    ":weight": new.weight,
                    ":reps": new.reps,
                    ":rpe": new.rpe,
                    ":target_weight": new.target_weight,
                    ":target_reps": new.target_reps,
                    ":target_rpe": new.target_rpe,
                    ":completed": new.completed,
                    ":created_at": Utc::now().to_rfc3339(),
                },
            )
            .map_err(DbError::InsertFailed)?;
        self.get_set(self.conn.last_insert_rowid())
    }

    fn update_set(&self, id: i64, changes: &[SetChange]) -> StoreResult<()> {
        let mut params_map: HashMap<String, Box<dyn ToSql>> = HashMap::new();
        let mut updates = Vec::new();

        for change in changes {
            match *change {
                SetChange::Weight(w) => {
                    updates.push("weight = :weight");
                    params_map.insert(":weight".into(), Box::new(w));
                }
                SetChange::Reps(r) => {
                    updates.push("reps = :reps");
                    params_map.insert(":reps".into(), Box::new(r));
                }
                SetChange::Rpe(r) => {
                    updates.push("rpe = :rpe");
                    params_map.insert(":rpe".into(), Box::new(r));
                }
                SetChange::Completed(c) => {
                    updates.push("completed = :completed");
                    params_map.insert(":completed".into(), Box::new(c));
                }
            }
        }

        self.execute_update(collections::SETS, id, &updates, params_map)
    }

    fn delete_set(&self, id: i64) -> StoreResult<()> {
        self.delete_by_id(collections::SETS, id)
    }

    fn delete_sets_for(&self, workout_exercise_ids: &[i64]) -> StoreResult<u64> {
        if workout_exercise_ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; workout_exercise_ids.len()].join(", ");
        let sql = format!("DELETE FROM sets WHERE workout_exercise_id IN ({placeholders})");
        let rows = self
            .conn
            .execute(&sql, params_from_iter(workout_exercise_ids.iter()))
            .map_err(DbError::DeleteFailed)?;
        Ok(rows as u64)
    }

    fn exercise_sessions(
        &self,
        exercise_id: i64,
        query: &SessionQuery,
    ) -> StoreResult<Vec<ExerciseSession>> {
        let mut sql = "SELECT we.id, w.date FROM workout_exercises we
                       JOIN workouts w ON w.id = we.workout_id
                       WHERE we.exercise_id = :exercise_id"
            .to_string();
        let mut params_map: HashMap<String, Box<dyn ToSql>> = HashMap::new();
        params_map.insert(":exercise_id".into(), Box::new(exercise_id));

        if let Some(before) = query.before {
            sql.push_str(" AND w.date < :before");
            params_map.insert(":before".into(), Box::new(format_date(before)));
        }
        if query.newest_first {
            sql.push_str(" ORDER BY w.date DESC, we.created_at DESC, we.id DESC");
        } else {
            sql.push_str(" ORDER BY w.date ASC, we.created_at ASC, we.id ASC");
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT :limit");
            params_map.insert(":limit".into(), Box::new(limit));
        }

        let params_for_query: Vec<(&str, &dyn ToSql)> = params_map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect();

        let mut stmt = self.conn.prepare(&sql).map_err(DbError::QueryFailed)?;
        let rows = stmt
            .query_map(params_for_query.as_slice(), |row| {
                let date: String = row.get(1)?;
                Ok((row.get::<_, i64>(0)?, parse_date(1, &date)?))
            })
            .map_err(DbError::QueryFailed)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::QueryFailed)?;

        rows.into_iter()
            .map(|(we_id, date)| -> StoreResult<ExerciseSession> {
                let sets = self
                    .sets_for_workout_exercise(we_id)?
                    .into_iter()
                    .map(|s| HistorySet {
                        weight: s.weight,
                        reps: s.reps,
                        rpe: s.rpe,
                    })
                    .collect();
                Ok(ExerciseSession { date, sets })
            })
            .collect()
    }
}
