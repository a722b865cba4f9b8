use anyhow::Result;
use chrono::{Duration, NaiveDate};
use std::cell::RefCell;
use std::collections::HashSet;

use gymtrack_lib::{
    AppService, Bucket, Config, DeleteStep, DeleteWorkoutSaga, Exercise, ExerciseSession,
    NewExercise, NewSet, NewWorkout, NewWorkoutExercise, PlannedExercise, PlannedSet,
    RecordStore, Screen, SessionEvent, SessionQuery, Set, SetChange, SetKey, SqliteStore,
    StoreError, SyncState, ThemeMode, Workout, WorkoutChanges, WorkoutError, WorkoutExercise,
    WorkoutExerciseDetail, WorkoutPlan, WorkoutQuery, WorkoutStatus, UNTITLED_WORKOUT,
};
use gymtrack_lib::store::StoreResult;

/// In-memory SQLite store that records every call and fails the operations
/// it is told to.
struct FailingStore {
    inner: SqliteStore,
    failing: RefCell<HashSet<&'static str>>,
    calls: RefCell<Vec<String>>,
}

impl FailingStore {
    fn new() -> Result<Self> {
        Ok(Self {
            inner: SqliteStore::open_in_memory()?,
            failing: RefCell::new(HashSet::new()),
            calls: RefCell::new(Vec::new()),
        })
    }

    fn fail(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    fn heal(&self, op: &'static str) {
        self.failing.borrow_mut().remove(op);
    }

    fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    fn check(&self, op: &'static str, detail: String) -> StoreResult<()> {
        self.calls.borrow_mut().push(detail);
        if self.failing.borrow().contains(op) {
            Err(StoreError::Rejected(format!("{op} unavailable")))
        } else {
            Ok(())
        }
    }
}

impl RecordStore for FailingStore {
    fn list_exercises(&self) -> StoreResult<Vec<Exercise>> {
        self.check("list_exercises", "list_exercises".into())?;
        self.inner.list_exercises()
    }
    fn get_exercise(&self, id: i64) -> StoreResult<Exercise> {
        self.check("get_exercise", format!("get_exercise:{id}"))?;
        self.inner.get_exercise(id)
    }
    fn insert_exercise(&self, new: &NewExercise) -> StoreResult<Exercise> {
        self.check("insert_exercise", "insert_exercise".into())?;
        self.inner.insert_exercise(new)
    }
    fn update_exercise(&self, id: i64, changes: &NewExercise) -> StoreResult<()> {
        self.check("update_exercise", format!("update_exercise:{id}"))?;
        self.inner.update_exercise(id, changes)
    }
    fn delete_exercise(&self, id: i64) -> StoreResult<()> {
        self.check("delete_exercise", format!("delete_exercise:{id}"))?;
        self.inner.delete_exercise(id)
    }
    fn list_workouts(&self, query: &WorkoutQuery) -> StoreResult<Vec<Workout>> {
        self.check("list_workouts", "list_workouts".into())?;
        self.inner.list_workouts(query)
    }
    fn get_workout(&self, id: i64) -> StoreResult<Workout> {
        self.check("get_workout", format!("get_workout:{id}"))?;
        self.inner.get_workout(id)
    }
    fn insert_workout(&self, new: &NewWorkout) -> StoreResult<Workout> {
        self.check("insert_workout", "insert_workout".into())?;
        self.inner.insert_workout(new)
    }
    fn update_workout(&self, id: i64, changes: &WorkoutChanges) -> StoreResult<()> {
        self.check("update_workout", format!("update_workout:{id}"))?;
        self.inner.update_workout(id, changes)
    }
    fn delete_workout(&self, id: i64) -> StoreResult<()> {
        self.check("delete_workout", format!("delete_workout:{id}"))?;
        self.inner.delete_workout(id)
    }
    fn workout_exercise_ids(&self, workout_id: i64) -> StoreResult<Vec<i64>> {
        self.check("workout_exercise_ids", format!("workout_exercise_ids:{workout_id}"))?;
        self.inner.workout_exercise_ids(workout_id)
    }
    fn insert_workout_exercise(&self, new: &NewWorkoutExercise) -> StoreResult<WorkoutExercise> {
        self.check("insert_workout_exercise", "insert_workout_exercise".into())?;
        self.inner.insert_workout_exercise(new)
    }
    fn delete_workout_exercise(&self, id: i64) -> StoreResult<()> {
        self.check("delete_workout_exercise", format!("delete_workout_exercise:{id}"))?;
        self.inner.delete_workout_exercise(id)
    }
    fn delete_workout_exercises_for_workout(&self, workout_id: i64) -> StoreResult<u64> {
        self.check(
            "delete_workout_exercises_for_workout",
            format!("delete_workout_exercises_for_workout:{workout_id}"),
        )?;
        self.inner.delete_workout_exercises_for_workout(workout_id)
    }
    fn workout_exercise_details(&self, workout_id: i64) -> StoreResult<Vec<WorkoutExerciseDetail>> {
        self.check("workout_exercise_details", format!("workout_exercise_details:{workout_id}"))?;
        self.inner.workout_exercise_details(workout_id)
    }
    fn insert_set(&self, new: &NewSet) -> StoreResult<Set> {
        self.check("insert_set", "insert_set".into())?;
        self.inner.insert_set(new)
    }
    fn update_set(&self, id: i64, changes: &[SetChange]) -> StoreResult<()> {
        let columns: Vec<&str> = changes.iter().map(SetChange::column).collect();
        self.check("update_set", format!("update_set:{id}:{}", columns.join(",")))?;
        self.inner.update_set(id, changes)
    }
    fn delete_set(&self, id: i64) -> StoreResult<()> {
        self.check("delete_set", format!("delete_set:{id}"))?;
        self.inner.delete_set(id)
    }
    fn delete_sets_for(&self, workout_exercise_ids: &[i64]) -> StoreResult<u64> {
        self.check("delete_sets_for", format!("delete_sets_for:{workout_exercise_ids:?}"))?;
        self.inner.delete_sets_for(workout_exercise_ids)
    }
    fn exercise_sessions(&self, exercise_id: i64, query: &SessionQuery) -> StoreResult<Vec<ExerciseSession>> {
        self.check("exercise_sessions", format!("exercise_sessions:{exercise_id}"))?;
        self.inner.exercise_sessions(exercise_id, query)
    }
}

const USER: &str = "user-1";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn day(offset: i64) -> NaiveDate {
    today() + Duration::days(offset)
}

// Helper function to create a signed-in test service over an in-memory store
fn create_test_service() -> Result<AppService<FailingStore>> {
    let config = Config {
        user_id: Some(USER.into()),
        email: Some("lifter@example.com".into()),
        ..Config::default()
    };
    Ok(AppService::with_store(FailingStore::new()?, config))
}

fn workout_error(err: &anyhow::Error) -> &WorkoutError {
    err.downcast_ref::<WorkoutError>()
        .expect("expected a WorkoutError")
}

fn plan(name: &str, date: NaiveDate, exercises: &[(&Exercise, &[(f64, i64)])]) -> WorkoutPlan {
    let mut plan = WorkoutPlan::new(date);
    plan.name = name.into();
    for (exercise, sets) in exercises {
        plan.exercises.push(PlannedExercise {
            exercise_id: exercise.id,
            name: exercise.name.clone(),
            sets: sets
                .iter()
                .map(|&(w, r)| PlannedSet {
                    weight: Some(w),
                    reps: Some(r),
                })
                .collect(),
        });
    }
    plan
}

/// Stores a completed workout on `date` with logged (not planned) weights.
fn log_session(
    service: &AppService<FailingStore>,
    date: NaiveDate,
    exercise: &Exercise,
    weights: &[f64],
) -> Result<i64> {
    let store = service.store();
    let workout = store.insert_workout(&NewWorkout {
        owner: USER.into(),
        name: Some(format!("Session {date}")),
        date,
        notes: None,
        status: WorkoutStatus::Completed,
    })?;
    let we = store.insert_workout_exercise(&NewWorkoutExercise {
        workout_id: workout.id,
        exercise_id: exercise.id,
        order: 0,
    })?;
    for (position, &weight) in (0_i64..).zip(weights) {
        store.insert_set(&NewSet {
            workout_exercise_id: we.id,
            position,
            weight: Some(weight),
            reps: Some(5),
            completed: true,
            ..NewSet::default()
        })?;
    }
    Ok(workout.id)
}

fn temp_keys(active: &gymtrack_lib::ActiveWorkout) -> usize {
    active.sets().filter(|s| s.key.is_temporary()).count()
}

// --- Exercise catalogue ---

#[test]
fn test_create_and_search_exercises() -> Result<()> {
    let service = create_test_service()?;
    service.create_exercise("  squat ", Some("legs"), Some("  "))?;
    service.create_exercise("Bench Press", Some("chest"), Some("barbell"))?;
    service.create_exercise("Incline bench", None, None)?;

    let names: Vec<_> = service
        .list_exercises()?
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["Bench Press", "Incline bench", "squat"]);

    let squat = &service.search_exercises("SQU")?[0];
    assert_eq!(squat.owner.as_deref(), Some(USER));
    assert_eq!(squat.muscle_group.as_deref(), Some("legs"));
    assert!(squat.equipment.is_none());

    assert_eq!(service.search_exercises("bench")?.len(), 2);
    assert!(service.search_exercises("deadlift")?.is_empty());
    Ok(())
}

#[test]
fn test_exercise_validation() -> Result<()> {
    let mut service = create_test_service()?;

    let err = service.create_exercise("   ", None, None).unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::NameRequired));
    assert_eq!(err.to_string(), "Name is required");

    service.sign_out()?;
    let err = service.create_exercise("Row", None, None).unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::NotLoggedIn));
    assert_eq!(err.to_string(), "You must be logged in");

    assert!(service.store().take_calls().iter().all(|c| c != "insert_exercise"));
    Ok(())
}

#[test]
fn test_update_exercise() -> Result<()> {
    let service = create_test_service()?;
    let exercise = service.create_exercise("Row", None, None)?;
    service.update_exercise(exercise.id, "Barbell Row", Some("back"), None)?;

    let updated = service.get_exercise(exercise.id)?;
    assert_eq!(updated.name, "Barbell Row");
    assert_eq!(updated.muscle_group.as_deref(), Some("back"));

    let err = service
        .update_exercise(exercise.id, "", None, None)
        .unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::NameRequired));
    Ok(())
}

#[test]
fn test_delete_exercise_cascades_to_sessions() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let id = service.save_plan(
        &plan("Mixed", today(), &[(&squat, &[(100.0, 5)]), (&bench, &[(60.0, 8)])]),
        None,
    )?;

    service.delete_exercise(squat.id)?;

    let detail = service.workout_detail(id)?;
    assert_eq!(detail.exercises.len(), 1);
    assert_eq!(detail.exercises[0].exercise.id, bench.id);
    assert!(service.get_exercise(squat.id).is_err());
    Ok(())
}

// --- Planning ---

#[test]
fn test_save_plan_writes_targets_in_order() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;

    let id = service.save_plan(
        &plan(
            "  ",
            day(1),
            &[(&squat, &[(100.0, 5), (105.0, 3)]), (&bench, &[(60.0, 8)])],
        ),
        None,
    )?;

    let detail = service.workout_detail(id)?;
    assert_eq!(detail.workout.name.as_deref(), Some(UNTITLED_WORKOUT));
    assert_eq!(detail.workout.status, WorkoutStatus::Scheduled);
    assert_eq!(detail.workout.owner, USER);
    assert_eq!(detail.workout.date, day(1));

    let orders: Vec<_> = detail.exercises.iter().map(|we| we.order).collect();
    assert_eq!(orders, vec![0, 1]);
    let squat_sets = &detail.exercises[0].sets;
    assert_eq!(squat_sets.len(), 2);
    assert_eq!(squat_sets[1].position, 1);
    assert_eq!(squat_sets[1].target_weight, Some(105.0));
    assert_eq!(squat_sets[1].target_reps, Some(3));
    assert!(squat_sets[1].weight.is_none());
    assert!(!squat_sets[1].completed);
    Ok(())
}

#[test]
fn test_save_plan_rejects_empty_and_anonymous_plans() -> Result<()> {
    let mut service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;

    let err = service.save_plan(&WorkoutPlan::new(today()), None).unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::EmptyPlan));
    assert_eq!(err.to_string(), "Add at least one exercise");

    service.sign_out()?;
    let err = service
        .save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)
        .unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::NotLoggedIn));
    Ok(())
}

#[test]
fn test_save_plan_over_existing_replaces_exercises() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;

    let mut edited = service.load_plan(id)?;
    assert_eq!(edited.exercises.len(), 1);
    assert_eq!(edited.exercises[0].sets[0].weight, Some(100.0));
    edited.name = "Push".into();
    edited.exercises = plan("", today(), &[(&bench, &[(60.0, 8), (60.0, 8)])]).exercises;
    assert_eq!(service.save_plan(&edited, Some(id))?, id);

    let detail = service.workout_detail(id)?;
    assert_eq!(detail.workout.name.as_deref(), Some("Push"));
    assert_eq!(detail.exercises.len(), 1);
    assert_eq!(detail.exercises[0].exercise.id, bench.id);
    assert_eq!(detail.exercises[0].sets.len(), 2);
    Ok(())
}

#[test]
fn test_save_plan_skips_exercise_when_join_row_fails() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    service.store().fail("insert_workout_exercise");

    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;

    assert!(service.workout_detail(id)?.exercises.is_empty());
    Ok(())
}

// --- Home & history ---

#[test]
fn test_home_sections_bucket_by_date() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let sets: &[(f64, i64)] = &[(100.0, 5)];

    let missed = service.save_plan(&plan("Missed", day(-2), &[(&squat, sets)]), None)?;
    let now = service.save_plan(&plan("Now", today(), &[(&squat, sets), (&bench, sets)]), None)?;
    let next = service.save_plan(&plan("Next", day(1), &[(&squat, sets)]), None)?;
    let later = service.save_plan(&plan("Later", day(5), &[(&squat, sets)]), None)?;
    let done = service.save_plan(&plan("Done", day(-1), &[(&squat, sets)]), None)?;
    service.store().update_workout(
        done,
        &WorkoutChanges {
            status: Some(WorkoutStatus::Completed),
            ..WorkoutChanges::default()
        },
    )?;

    let sections = service.home_sections(today())?;
    let layout: Vec<(Bucket, Vec<i64>)> = sections
        .iter()
        .map(|s| (s.bucket, s.workouts.iter().map(|d| d.workout.id).collect()))
        .collect();
    assert_eq!(
        layout,
        vec![
            (Bucket::Today, vec![missed, now]),
            (Bucket::Tomorrow, vec![next]),
            (Bucket::Upcoming, vec![later]),
        ]
    );

    let now_detail = &sections[0].workouts[1];
    let names: Vec<_> = now_detail
        .exercises
        .iter()
        .map(|we| we.exercise.name.as_str())
        .collect();
    assert_eq!(names, vec!["Squat", "Bench"]);
    Ok(())
}

#[test]
fn test_home_sections_omit_empty_buckets_and_other_users() -> Result<()> {
    let mut service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    service.save_plan(&plan("Later", day(9), &[(&squat, &[(100.0, 5)])]), None)?;

    service.sign_in("user-2", "other@example.com")?;
    assert!(service.home_sections(today())?.is_empty());

    service.sign_in(USER, "lifter@example.com")?;
    let sections = service.home_sections(today())?;
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].bucket, Bucket::Upcoming);
    Ok(())
}

#[test]
fn test_completed_workouts_newest_first() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let old = log_session(&service, day(-9), &squat, &[80.0])?;
    let recent = log_session(&service, day(-2), &squat, &[85.0])?;
    service.save_plan(&plan("Upcoming", day(2), &[(&squat, &[(90.0, 5)])]), None)?;

    let ids: Vec<_> = service.completed_workouts()?.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![recent, old]);
    Ok(())
}

#[test]
fn test_exercise_progress() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    log_session(&service, day(-3), &squat, &[100.0, 110.0])?;
    log_session(&service, day(-9), &squat, &[90.0])?;
    log_session(&service, day(-5), &squat, &[0.0])?;
    // Planned only: no logged weight, not a data point.
    service.save_plan(&plan("Next", day(1), &[(&squat, &[(120.0, 5)])]), None)?;

    let progress = service.exercise_progress(squat.id)?;
    let series: Vec<_> = progress
        .points
        .iter()
        .map(|p| (p.date, p.max_weight))
        .collect();
    assert_eq!(series, vec![(day(-9), 90.0), (day(-3), 110.0)]);
    assert_eq!(progress.personal_record, 110.0);
    assert_eq!(progress.total_sessions, 2);
    assert!(progress.has_chart());
    Ok(())
}

// --- Active workout ---

#[test]
fn test_open_workout_populates_from_targets() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(
        &plan("Legs", today(), &[(&squat, &[(100.0, 5), (110.0, 3)])]),
        None,
    )?;

    let active = service.open_workout(id, false)?;
    assert!(!active.is_read_only());
    let sets = &active.exercises[0].sets;
    assert_eq!(sets.len(), 2);
    assert_eq!((sets[0].weight, sets[0].reps), (Some(100.0), Some(5)));
    assert_eq!((sets[1].weight, sets[1].reps), (Some(110.0), Some(3)));
    assert!(sets.iter().all(|s| s.sync == SyncState::Confirmed));
    Ok(())
}

#[test]
fn test_open_workout_fails_for_missing_workout() -> Result<()> {
    let service = create_test_service()?;
    let err = service.open_workout(404, false).unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::LoadFailed(_)));
    Ok(())
}

#[test]
fn test_recent_history_is_limited_and_newest_first() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    for offset in [-10, -8, -6, -4, -2, -1] {
        log_session(&service, day(offset), &squat, &[100.0])?;
    }
    log_session(&service, day(3), &squat, &[120.0])?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;

    let active = service.open_workout(id, false)?;
    let dates: Vec<_> = active.exercises[0].history.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![day(-1), day(-2), day(-4), day(-6), day(-8)]);
    Ok(())
}

#[test]
fn test_history_failure_does_not_block_loading() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    service.store().fail("exercise_sessions");

    let active = service.open_workout(id, false)?;
    assert_eq!(active.exercises.len(), 1);
    assert!(active.exercises[0].history.is_empty());
    Ok(())
}

#[test]
fn test_update_set_writes_only_the_changed_field() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;
    let key = active.exercises[0].sets[0].key;
    let set_id = key.stored_id().unwrap();
    service.store().take_calls();

    let state = active.update_set(service.store(), key, SetChange::Weight(Some(102.5)))?;
    assert_eq!(state, SyncState::Confirmed);
    assert_eq!(
        service.store().take_calls(),
        vec![format!("update_set:{set_id}:weight")]
    );

    active.reload(service.store())?;
    assert_eq!(active.exercises[0].sets[0].weight, Some(102.5));
    Ok(())
}

#[test]
fn test_update_set_failure_marks_set_and_retry_rewrites_row() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;
    let key = active.exercises[0].sets[0].key;

    service.store().fail("update_set");
    let state = active.update_set(service.store(), key, SetChange::Reps(Some(6)))?;
    assert!(matches!(state, SyncState::Failed { .. }));
    // Local value stands.
    assert_eq!(active.find_set(key).unwrap().reps, Some(6));
    assert_eq!(active.failed_sets().count(), 1);
    assert_eq!(active.retry_failed(service.store()), 1);

    service.store().heal("update_set");
    service.store().take_calls();
    assert_eq!(active.retry_failed(service.store()), 0);
    assert_eq!(
        service.store().take_calls(),
        vec![format!(
            "update_set:{}:weight,reps,rpe,completed",
            key.stored_id().unwrap()
        )]
    );
    assert_eq!(active.failed_sets().count(), 0);

    active.reload(service.store())?;
    assert_eq!(active.exercises[0].sets[0].reps, Some(6));
    Ok(())
}

#[test]
fn test_add_set_seeds_from_previous_and_replaces_temp_key_once() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(
        &plan("Legs", today(), &[(&squat, &[(100.0, 5), (105.0, 4)])]),
        None,
    )?;
    let mut active = service.open_workout(id, false)?;
    let we_id = active.exercises[0].id;

    let key = active.add_set(service.store(), we_id)?;
    assert!(!key.is_temporary());
    assert_eq!(temp_keys(&active), 0);

    let sets = &active.exercises[0].sets;
    assert_eq!(sets.len(), 3);
    let added = &sets[2];
    assert_eq!(added.key, key);
    assert_eq!((added.weight, added.reps), (Some(105.0), Some(4)));
    assert_eq!(added.position, sets[1].position + 1);
    assert_eq!(added.sync, SyncState::Confirmed);
    assert_eq!(
        active.sets().filter(|s| s.key == key).count(),
        1,
        "stored key appears exactly once"
    );
    Ok(())
}

#[test]
fn test_add_set_treats_logged_zero_as_unlogged() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(80.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;
    let we_id = active.exercises[0].id;
    let first = active.exercises[0].sets[0].key;
    active.update_set(service.store(), first, SetChange::Weight(Some(0.0)))?;

    active.add_set(service.store(), we_id)?;
    let added = &active.exercises[0].sets[1];
    assert_eq!((added.weight, added.reps), (Some(80.0), Some(5)));
    Ok(())
}

#[test]
fn test_first_set_of_an_exercise_starts_at_zero() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;
    let we_id = active.exercises[0].id;
    let only = active.exercises[0].sets[0].key;
    active.remove_set(service.store(), we_id, only)?;

    active.add_set(service.store(), we_id)?;
    let set = &active.exercises[0].sets[0];
    assert_eq!((set.weight, set.reps, set.position), (Some(0.0), Some(0), 0));
    Ok(())
}

#[test]
fn test_failed_add_set_stays_local_until_retried() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;
    let we_id = active.exercises[0].id;

    service.store().fail("insert_set");
    let key = active.add_set(service.store(), we_id)?;
    assert_eq!(key, SetKey::Temp(0));
    assert_eq!(key.to_string(), "temp-0");
    assert!(matches!(
        active.find_set(key).unwrap().sync,
        SyncState::Failed { .. }
    ));

    // Edits to an unsaved set never reach the store.
    service.store().take_calls();
    active.update_set(service.store(), key, SetChange::Weight(Some(95.0)))?;
    assert!(service.store().take_calls().is_empty());

    service.store().heal("insert_set");
    assert_eq!(active.retry_failed(service.store()), 0);
    assert_eq!(temp_keys(&active), 0);
    let created = &active.exercises[0].sets[1];
    assert_eq!(created.weight, Some(95.0));
    assert_eq!(created.sync, SyncState::Confirmed);

    active.reload(service.store())?;
    assert_eq!(active.exercises[0].sets[1].weight, Some(95.0));
    Ok(())
}

#[test]
fn test_remove_set_and_exercise() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let id = service.save_plan(
        &plan(
            "Full",
            today(),
            &[(&squat, &[(100.0, 5), (100.0, 5)]), (&bench, &[(60.0, 8)])],
        ),
        None,
    )?;
    let mut active = service.open_workout(id, false)?;
    let squat_we = active.exercises[0].id;
    let bench_we = active.exercises[1].id;
    let first = active.exercises[0].sets[0].key;

    active.remove_set(service.store(), squat_we, first)?;
    assert_eq!(active.exercises[0].sets.len(), 1);

    service.store().take_calls();
    active.remove_exercise(service.store(), bench_we)?;
    assert_eq!(
        service.store().take_calls(),
        vec![
            format!("delete_sets_for:{:?}", [bench_we]),
            format!("delete_workout_exercise:{bench_we}"),
        ]
    );

    active.reload(service.store())?;
    assert_eq!(active.exercises.len(), 1);
    assert_eq!(active.exercises[0].sets.len(), 1);

    let err = active
        .remove_exercise(service.store(), bench_we)
        .unwrap_err();
    assert!(matches!(err, WorkoutError::UnknownWorkoutExercise(_)));
    Ok(())
}

#[test]
fn test_failed_remove_set_reports_for_refetch() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;
    let we_id = active.exercises[0].id;
    let key = active.exercises[0].sets[0].key;

    service.store().fail("delete_set");
    let err = active.remove_set(service.store(), we_id, key).unwrap_err();
    assert_eq!(err.to_string(), "Failed to delete set");
    assert!(active.exercises[0].sets.is_empty());

    active.reload(service.store())?;
    assert_eq!(active.exercises[0].sets.len(), 1);
    Ok(())
}

#[test]
fn test_add_exercise_seeds_from_last_session() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    log_session(&service, day(-7), &bench, &[50.0])?;
    log_session(&service, day(-2), &bench, &[60.0, 65.0])?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;

    let we_id = active.add_exercise(service.store(), &bench)?;

    let added = active.exercises.last().unwrap();
    assert_eq!(added.id, we_id);
    assert_eq!(added.order, 1);
    assert_eq!(added.sets.len(), 1);
    assert_eq!((added.sets[0].weight, added.sets[0].reps), (Some(65.0), Some(5)));
    let dates: Vec<_> = added.history.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![day(-2), day(-7)]);
    Ok(())
}

#[test]
fn test_add_exercise_ignores_later_planned_sessions() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    log_session(&service, day(-7), &squat, &[100.0])?;
    // Planned next week: targets only, nothing logged yet.
    service.save_plan(&plan("Next legs", day(7), &[(&squat, &[(110.0, 3)])]), None)?;
    let id = service.save_plan(&plan("Push", today(), &[(&bench, &[(60.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;

    active.add_exercise(service.store(), &squat)?;

    let added = active.exercises.last().unwrap();
    assert_eq!((added.sets[0].weight, added.sets[0].reps), (Some(100.0), Some(5)));
    let dates: Vec<_> = added.history.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![day(-7)]);
    Ok(())
}

#[test]
fn test_add_exercise_without_history_and_after_removal() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let row = service.create_exercise("Row", None, None)?;
    let id = service.save_plan(
        &plan("Legs", today(), &[(&squat, &[(100.0, 5)]), (&bench, &[(60.0, 5)])]),
        None,
    )?;
    let mut active = service.open_workout(id, false)?;
    let first = active.exercises[0].id;
    active.remove_exercise(service.store(), first)?;

    active.add_exercise(service.store(), &row)?;
    let added = active.exercises.last().unwrap();
    // Never collides with the remaining exercise's order.
    assert_eq!(added.order, 2);
    assert_eq!((added.sets[0].weight, added.sets[0].reps), (Some(0.0), Some(0)));
    assert!(added.history.is_empty());
    Ok(())
}

#[test]
fn test_add_exercise_failures() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let mut active = service.open_workout(id, false)?;

    service.store().fail("insert_workout_exercise");
    let err = active.add_exercise(service.store(), &bench).unwrap_err();
    assert!(matches!(err, WorkoutError::AddExerciseFailed(_)));
    assert_eq!(active.exercises.len(), 1);

    service.store().heal("insert_workout_exercise");
    service.store().fail("insert_set");
    active.add_exercise(service.store(), &bench)?;
    assert_eq!(active.exercises.len(), 2);
    assert!(active.exercises[1].sets.is_empty());
    Ok(())
}

#[test]
fn test_complete_requires_all_sets_done() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(
        &plan("Legs", today(), &[(&squat, &[(100.0, 5), (100.0, 5)])]),
        None,
    )?;
    let mut active = service.open_workout(id, false)?;
    let first = active.exercises[0].sets[0].key;
    active.update_set(service.store(), first, SetChange::Completed(true))?;
    service.store().take_calls();

    let err = active.complete(service.store()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Please complete all sets before finishing the workout."
    );
    assert!(matches!(err, WorkoutError::IncompleteSets { remaining: 1 }));
    assert!(service
        .store()
        .take_calls()
        .iter()
        .all(|c| !c.starts_with("update_workout")));
    assert_eq!(service.workout_detail(id)?.workout.status, WorkoutStatus::Scheduled);

    let second = active.exercises[0].sets[1].key;
    active.update_set(service.store(), second, SetChange::Completed(true))?;
    assert!(active.all_sets_completed());
    active.complete(service.store())?;
    assert_eq!(service.workout_detail(id)?.workout.status, WorkoutStatus::Completed);
    Ok(())
}

#[test]
fn test_completed_workout_is_read_only_unless_editing() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = log_session(&service, day(-1), &squat, &[100.0])?;

    let mut viewing = service.open_workout(id, false)?;
    assert!(viewing.is_read_only());
    let err = viewing.complete(service.store()).unwrap_err();
    assert!(matches!(err, WorkoutError::InvalidTransition { .. }));

    let mut editing = service.open_workout(id, true)?;
    assert!(!editing.is_read_only());
    let we_id = editing.exercises[0].id;
    editing.add_set(service.store(), we_id)?;
    // The new set is not done, but editing re-saves regardless.
    editing.complete(service.store())?;
    assert_eq!(service.workout_detail(id)?.workout.status, WorkoutStatus::Completed);
    Ok(())
}

#[test]
fn test_view_only_workout_rejects_changes() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let bench = service.create_exercise("Bench", None, None)?;
    let id = log_session(&service, day(-1), &squat, &[100.0])?;
    let mut viewing = service.open_workout(id, false)?;
    let we_id = viewing.exercises[0].id;
    let key = viewing.exercises[0].sets[0].key;
    service.store().take_calls();

    let results = [
        viewing.update_set(service.store(), key, SetChange::Weight(Some(1.0))).map(|_| ()),
        viewing.add_set(service.store(), we_id).map(|_| ()),
        viewing.remove_set(service.store(), we_id, key),
        viewing.add_exercise(service.store(), &bench).map(|_| ()),
        viewing.remove_exercise(service.store(), we_id),
    ];
    for result in results {
        assert!(matches!(result, Err(WorkoutError::ReadOnly)));
    }
    assert!(service.store().take_calls().is_empty());
    assert_eq!(viewing.exercises[0].sets[0].weight, Some(100.0));

    let mut editing = service.open_workout(id, true)?;
    editing.update_set(service.store(), key, SetChange::Weight(Some(102.5)))?;
    editing.reload(service.store())?;
    assert_eq!(editing.exercises[0].sets[0].weight, Some(102.5));
    Ok(())
}

// --- Cascade delete ---

#[test]
fn test_delete_workout_runs_children_first() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let we_ids = service.store().workout_exercise_ids(id)?;
    service.store().take_calls();

    service.delete_workout(id)?;

    assert_eq!(
        service.store().take_calls(),
        vec![
            format!("workout_exercise_ids:{id}"),
            format!("delete_sets_for:{we_ids:?}"),
            format!("delete_workout_exercises_for_workout:{id}"),
            format!("delete_workout:{id}"),
        ]
    );
    assert!(service.workout_detail(id).is_err());
    Ok(())
}

#[test]
fn test_delete_workout_stops_at_failed_step() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    service.store().fail("delete_sets_for");

    let err = service.delete_workout(id).unwrap_err();
    assert_eq!(err.to_string(), "Failed to delete associated sets");

    let detail = service.workout_detail(id)?;
    assert_eq!(detail.exercises.len(), 1);
    assert_eq!(detail.exercises[0].sets.len(), 1);
    Ok(())
}

#[test]
fn test_delete_saga_resumes_at_failed_step() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    let store = service.store();

    let mut saga = DeleteWorkoutSaga::plan(store, id)?;
    store.fail("delete_workout_exercises_for_workout");
    let err = saga.run(store).unwrap_err();
    assert_eq!(err.step, DeleteStep::WorkoutExercises { workout_id: id });
    assert_eq!(saga.completed(), 1);
    assert!(!saga.is_finished());
    assert!(service.workout_detail(id).is_ok());

    store.heal("delete_workout_exercises_for_workout");
    store.take_calls();
    saga.run(store)?;
    assert!(saga.is_finished());
    assert_eq!(
        store.take_calls(),
        vec![
            format!("delete_workout_exercises_for_workout:{id}"),
            format!("delete_workout:{id}"),
        ]
    );
    Ok(())
}

#[test]
fn test_delete_lookup_failure_deletes_nothing() -> Result<()> {
    let service = create_test_service()?;
    let squat = service.create_exercise("Squat", None, None)?;
    let id = service.save_plan(&plan("Legs", today(), &[(&squat, &[(100.0, 5)])]), None)?;
    service.store().fail("workout_exercise_ids");
    service.store().take_calls();

    let err = service.delete_workout(id).unwrap_err();
    assert!(matches!(workout_error(&err), WorkoutError::DeleteLookupFailed(_)));
    assert_eq!(err.to_string(), "Failed to fetch workout details for deletion");
    assert_eq!(service.store().take_calls().len(), 1);
    Ok(())
}

// --- Contexts ---

#[test]
fn test_session_changes_are_broadcast() -> Result<()> {
    let mut service = create_test_service()?;
    assert_eq!(service.auth.screen(), Screen::Authenticated);
    let events = service.auth.subscribe();

    service.sign_out()?;
    assert_eq!(service.auth.screen(), Screen::Unauthenticated);
    assert!(service.config.user_id.is_none());
    service.sign_in("user-2", "two@example.com")?;
    assert_eq!(service.auth.owner(), Some("user-2"));

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], SessionEvent::SignedOut);
    assert!(matches!(&received[1], SessionEvent::SignedIn(s) if s.user_id == "user-2"));

    assert!(service.sign_in(" ", "x@example.com").is_err());
    Ok(())
}

#[test]
fn test_theme_toggle_persists_flag() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("gymtrack-theme-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let config_path = dir.join("config.toml");
    gymtrack_lib::save_config_util(&config_path, &Config::default())?;

    let mut service = create_test_service()?;
    service.theme = gymtrack_lib::ThemeContext::new(ThemeMode::Light, Some(config_path.clone()));
    service.config_path = Some(config_path.clone());

    assert_eq!(service.toggle_theme()?, ThemeMode::Dark);
    assert!(service.theme.is_dark());
    let saved = gymtrack_lib::load_config_util(&config_path)?;
    assert_eq!(saved.theme, ThemeMode::Dark);
    assert!(std::fs::read_to_string(&config_path)?.contains("theme = \"dark\""));

    assert_eq!(service.toggle_theme()?, ThemeMode::Light);
    assert_eq!(gymtrack_lib::load_config_util(&config_path)?.theme, ThemeMode::Light);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
