//! End-to-end session scenarios: seed a store, run a coordinator through the
//! check-in window and monitoring phases, and verify the durable rows.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use classwatch::models::{BehaviorKind, ClassRecord, ClassSchedule, ScheduleDay, Student};
use classwatch::{AnalyticsExporter, BehaviorReading, Database, SessionCoordinator, SessionPhase};

struct TestEnv {
    root: PathBuf,
    db: Database,
    exporter: AnalyticsExporter,
}

impl TestEnv {
    async fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("classwatch-flow-{tag}-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();

        let db = Database::new(root.join("classwatch.sqlite3")).unwrap();
        let exporter = AnalyticsExporter::new(root.join("analytics")).unwrap();

        db.add_class(&ClassRecord {
            id: "CS101".to_string(),
            name: "Intro to Computer Science".to_string(),
            subject: "CS".to_string(),
            room: "B12".to_string(),
            schedule: ClassSchedule {
                days: vec![ScheduleDay::Mon],
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            },
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        for (id, name) in [("S001", "Ada"), ("S002", "Grace")] {
            db.add_student(&Student::new(id, name, "10A")).await.unwrap();
            assert!(db.enroll_student("CS101", id, Utc::now()).await.unwrap());
        }

        Self {
            root,
            db,
            exporter,
        }
    }

    fn coordinator(&self) -> SessionCoordinator {
        SessionCoordinator::new(self.db.clone(), self.exporter.clone())
    }

    fn cleanup(self) {
        drop(self.db);
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn reading(
    student_id: &str,
    kind: BehaviorKind,
    observed_at: DateTime<Utc>,
) -> BehaviorReading {
    BehaviorReading {
        student_id: student_id.to_string(),
        kind,
        confidence: 0.8,
        observed_at,
    }
}

#[tokio::test]
async fn attendance_rows_respect_the_dedup_window() {
    let env = TestEnv::new("dedup").await;
    let coordinator = env.coordinator();
    let t0 = Utc::now();

    coordinator.start_class("CS101").await.unwrap();
    coordinator
        .process_frame(vec![reading("S001", BehaviorKind::Attentive, t0)])
        .await
        .unwrap();
    coordinator
        .process_frame(vec![reading(
            "S001",
            BehaviorKind::Attentive,
            t0 + Duration::minutes(2),
        )])
        .await
        .unwrap();
    coordinator
        .process_frame(vec![reading(
            "S001",
            BehaviorKind::Attentive,
            t0 + Duration::minutes(10),
        )])
        .await
        .unwrap();
    coordinator.stop().await.unwrap();

    let rows = env
        .db
        .attendance_between(t0 - Duration::minutes(1), t0 + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2, "one row at t0 and one outside the window");

    env.cleanup();
}

#[tokio::test]
async fn check_in_window_produces_a_persisted_report() {
    let env = TestEnv::new("checkin").await;
    let coordinator = env.coordinator();
    let t0 = Utc::now();

    let snapshot = coordinator.start_class("CS101").await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::CheckInWindow);
    assert_eq!(snapshot.roster_size, 2);

    let checked_in_at = t0 + Duration::minutes(3);
    let snapshot = coordinator
        .process_frame(vec![reading("S002", BehaviorKind::Attentive, checked_in_at)])
        .await
        .unwrap();
    assert_eq!(snapshot.present_count, 1);
    assert!((snapshot.attendance_ratio - 0.5).abs() < 1e-9);

    coordinator.close_check_in_window().await.unwrap();
    assert_eq!(coordinator.snapshot().await.phase, SessionPhase::Monitoring);

    let report_path = fs::read_dir(env.exporter.dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("check_in_CS101"))
        })
        .expect("check-in report written");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["classId"], "CS101");
    assert_eq!(report["entries"][0]["studentId"], "S002");
    assert_eq!(report["entries"][0]["studentName"], "Grace");
    let reported_at: DateTime<Utc> = serde_json::from_value(
        report["entries"][0]["checkedInAt"].clone(),
    )
    .unwrap();
    assert_eq!(reported_at, checked_in_at);

    // the check-in observation also produced the attendance row
    let rows = env
        .db
        .attendance_between(t0 - Duration::minutes(1), t0 + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].student_id, "S002");

    coordinator.stop().await.unwrap();
    env.cleanup();
}

#[tokio::test]
async fn behavior_runs_are_flushed_on_stop() {
    let env = TestEnv::new("flush").await;
    let coordinator = env.coordinator().with_min_event_duration(0.0);
    let t0 = Utc::now();

    coordinator.start_class("CS101").await.unwrap();
    for (offset, kind) in [
        (0, BehaviorKind::Attentive),
        (5, BehaviorKind::Attentive),
        (8, BehaviorKind::Sleeping),
        (12, BehaviorKind::Sleeping),
    ] {
        coordinator
            .process_frame(vec![reading(
                "S001",
                kind,
                t0 + Duration::seconds(offset),
            )])
            .await
            .unwrap();
    }
    coordinator.stop().await.unwrap();
    assert_eq!(coordinator.snapshot().await.phase, SessionPhase::Idle);

    let rows = env
        .db
        .behaviors_between(t0 - Duration::minutes(1), t0 + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let attentive = rows
        .iter()
        .find(|row| row.kind == BehaviorKind::Attentive)
        .unwrap();
    assert!((attentive.duration_secs - 5.0).abs() < 1e-9);
    assert_eq!(attentive.student_name, "Ada");
    assert_eq!(attentive.class_name, "Intro to Computer Science");

    let sleeping = rows
        .iter()
        .find(|row| row.kind == BehaviorKind::Sleeping)
        .unwrap();
    assert!((sleeping.duration_secs - 4.0).abs() < 1e-9);

    env.cleanup();
}

#[tokio::test]
async fn short_behavior_runs_are_dropped() {
    let env = TestEnv::new("noise").await;
    let coordinator = env.coordinator();
    let t0 = Utc::now();

    coordinator.start_class("CS101").await.unwrap();
    coordinator
        .process_frame(vec![reading("S001", BehaviorKind::Attentive, t0)])
        .await
        .unwrap();
    coordinator
        .process_frame(vec![reading(
            "S001",
            BehaviorKind::Inattentive,
            t0 + Duration::seconds(1),
        )])
        .await
        .unwrap();
    coordinator.stop().await.unwrap();

    let rows = env
        .db
        .behaviors_between(t0 - Duration::minutes(1), t0 + Duration::minutes(1))
        .await
        .unwrap();
    assert!(rows.is_empty(), "sub-threshold runs must not be persisted");

    env.cleanup();
}

#[tokio::test]
async fn starting_while_active_is_rejected() {
    let env = TestEnv::new("double-start").await;
    let coordinator = env.coordinator();

    coordinator.start_class("CS101").await.unwrap();
    let err = coordinator.start_class("CS101").await.unwrap_err();
    assert!(err.to_string().contains("already active"));

    coordinator.stop().await.unwrap();
    coordinator.start_class("CS101").await.unwrap();
    coordinator.stop().await.unwrap();

    env.cleanup();
}

#[tokio::test]
async fn unknown_class_cannot_start_a_session() {
    let env = TestEnv::new("unknown-class").await;
    let coordinator = env.coordinator();

    let err = coordinator.start_class("NOPE").await.unwrap_err();
    assert!(err.to_string().contains("unknown class"));
    assert_eq!(coordinator.snapshot().await.phase, SessionPhase::Idle);

    env.cleanup();
}

#[tokio::test]
async fn late_check_in_timer_after_stop_is_a_no_op() {
    let env = TestEnv::new("late-timer").await;
    let coordinator = env.coordinator();

    coordinator.start_class("CS101").await.unwrap();
    coordinator.stop().await.unwrap();

    // the window is no longer open; closing must neither error nor write
    coordinator.close_check_in_window().await.unwrap();
    assert_eq!(coordinator.snapshot().await.phase, SessionPhase::Idle);
    assert!(fs::read_dir(env.exporter.dir()).unwrap().next().is_none());

    env.cleanup();
}
