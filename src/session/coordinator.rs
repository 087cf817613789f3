use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{error, info};
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::analytics::AnalyticsExporter;
use crate::analyzer::BehaviorReading;
use crate::db::{
    models::{BehaviorEvent, CheckInEntry, CheckInReport},
    Database, ATTENDANCE_DEDUP_MINUTES,
};

use super::state::{ClosedBehavior, SessionPhase, SessionSnapshot, SessionState};

/// Length of the check-in window opened by `start_class`.
pub const CHECK_IN_WINDOW_MINUTES: u64 = 15;
/// Behavior runs shorter than this are treated as noise and not persisted.
pub const MIN_EVENT_SECS: f64 = 3.0;
/// Folded events accumulate up to this many before a mid-session flush.
const FLUSH_BATCH_SIZE: usize = 16;

struct CoordinatorInner {
    state: SessionState,
    pending: Vec<BehaviorEvent>,
    last_attendance: HashMap<String, DateTime<Utc>>,
    session_id: Option<String>,
}

impl CoordinatorInner {
    fn new() -> Self {
        Self {
            state: SessionState::new(),
            pending: Vec::new(),
            last_attendance: HashMap::new(),
            session_id: None,
        }
    }
}

/// Owns the monitoring session: the phase machine, the check-in timer, and
/// every translation of transient observations into durable rows. Writes are
/// throttled and batched; nothing is persisted once per detection per frame.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Mutex<CoordinatorInner>>,
    db: Database,
    exporter: AnalyticsExporter,
    check_in_window: Duration,
    min_event_secs: f64,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionCoordinator {
    pub fn new(db: Database, exporter: AnalyticsExporter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CoordinatorInner::new())),
            db,
            exporter,
            check_in_window: Duration::from_secs(CHECK_IN_WINDOW_MINUTES * 60),
            min_event_secs: MIN_EVENT_SECS,
            timer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_check_in_window(mut self, window: Duration) -> Self {
        self.check_in_window = window;
        self
    }

    pub fn with_min_event_duration(mut self, secs: f64) -> Self {
        self.min_event_secs = secs;
        self
    }

    /// Open a session for a class: validates the class, loads the roster
    /// size, opens the check-in window and arms its one-shot timer. Starting
    /// while a session is active is an error.
    pub async fn start_class(&self, class_id: &str) -> Result<SessionSnapshot> {
        let class = self
            .db
            .get_class(class_id)
            .await?
            .ok_or_else(|| anyhow!("unknown class '{class_id}'"))?;
        let roster_size = self.db.enrollment_count(class_id).await?;
        let now = Utc::now();
        let session_id = Uuid::new_v4().to_string();

        {
            let mut inner = self.inner.lock().await;
            if inner.state.phase() != SessionPhase::Idle {
                bail!("a monitoring session is already active");
            }
            inner.state.begin(class.id.clone(), roster_size, now);
            inner.last_attendance.clear();
            inner.session_id = Some(session_id.clone());
        }

        let coordinator = self.clone();
        let window = self.check_in_window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Err(err) = coordinator.close_check_in_window().await {
                error!("failed to close check-in window: {err:#}");
            }
        });
        if let Some(previous) = self.timer.lock().await.replace(handle) {
            previous.abort();
        }

        info!(
            "session {session_id} started for class {} (roster size {roster_size})",
            class.id
        );
        Ok(self.snapshot().await)
    }

    /// Fold one frame's readings into the session, per the per-frame
    /// contract: duration display data, attendance ratio, label tallies, and
    /// check-in capture while the window is open. Attendance writes are
    /// throttled to once per student per de-duplication window; closed
    /// behavior runs are flushed in batches.
    pub async fn process_frame(&self, readings: Vec<BehaviorReading>) -> Result<SessionSnapshot> {
        let now = Utc::now();

        let (attendance_marks, batch, class_id, snapshot) = {
            let mut inner = self.inner.lock().await;
            if !inner.state.is_active() {
                return Ok(inner.state.snapshot(now));
            }
            let class_id = inner
                .state
                .class_id()
                .map(str::to_string)
                .unwrap_or_default();

            let mut attendance_marks = Vec::new();
            for reading in &readings {
                let due = match inner.last_attendance.get(&reading.student_id) {
                    None => true,
                    Some(last) => {
                        reading.observed_at - *last
                            >= ChronoDuration::minutes(ATTENDANCE_DEDUP_MINUTES)
                    }
                };
                if due {
                    inner
                        .last_attendance
                        .insert(reading.student_id.clone(), reading.observed_at);
                    attendance_marks.push((reading.student_id.clone(), reading.observed_at));
                }

                for closed in inner.state.observe(reading) {
                    if closed.duration_secs() >= self.min_event_secs {
                        inner.pending.push(to_event(closed, &class_id));
                    }
                }
            }

            let batch = if inner.pending.len() >= FLUSH_BATCH_SIZE {
                std::mem::take(&mut inner.pending)
            } else {
                Vec::new()
            };
            (attendance_marks, batch, class_id, inner.state.snapshot(now))
        };

        for (student_id, observed_at) in attendance_marks {
            if self
                .db
                .record_attendance(&student_id, &class_id, observed_at)
                .await?
            {
                info!("attendance recorded for {student_id} in {class_id}");
            }
        }

        self.db.record_behaviors(batch).await?;

        Ok(snapshot)
    }

    /// Close the check-in window and persist its report. Fired by the
    /// one-shot timer; safe to call directly. A no-op unless the window is
    /// open, so a late timer after a manual stop does nothing.
    pub async fn close_check_in_window(&self) -> Result<()> {
        let now = Utc::now();
        let (entries, class_id, opened_at) = {
            let mut inner = self.inner.lock().await;
            let Some(entries) = inner.state.close_check_in() else {
                return Ok(());
            };
            (
                entries,
                inner
                    .state
                    .class_id()
                    .map(str::to_string)
                    .unwrap_or_default(),
                inner.state.started_at().unwrap_or(now),
            )
        };

        let mut report_entries = Vec::with_capacity(entries.len());
        for (student_id, checked_in_at) in entries {
            let student_name = self
                .db
                .get_student(&student_id)
                .await?
                .map(|student| student.name);
            report_entries.push(CheckInEntry {
                student_id,
                student_name,
                checked_in_at,
            });
        }

        let report = CheckInReport {
            class_id,
            window_opened_at: opened_at,
            generated_at: now,
            entries: report_entries,
        };
        let path = self.exporter.write_check_in_report(&report)?;
        info!(
            "check-in window closed with {} students; report at {}",
            report.entries.len(),
            path.display()
        );

        self.flush_pending().await
    }

    /// Stop the session: abort the check-in timer, close and flush every
    /// open behavior run, clear all transient state.
    pub async fn stop(&self) -> Result<()> {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.abort();
        }

        let (batch, session_id) = {
            let mut inner = self.inner.lock().await;
            if !inner.state.is_active() {
                return Ok(());
            }
            let class_id = inner
                .state
                .class_id()
                .map(str::to_string)
                .unwrap_or_default();

            let closed: Vec<ClosedBehavior> = inner.state.finish();
            for event in closed {
                if event.duration_secs() >= self.min_event_secs {
                    inner.pending.push(to_event(event, &class_id));
                }
            }
            inner.last_attendance.clear();
            (std::mem::take(&mut inner.pending), inner.session_id.take())
        };

        self.db.record_behaviors(batch).await?;
        info!(
            "session {} stopped",
            session_id.as_deref().unwrap_or("<unknown>")
        );
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.state.snapshot(Utc::now())
    }

    async fn flush_pending(&self) -> Result<()> {
        let batch = {
            let mut inner = self.inner.lock().await;
            std::mem::take(&mut inner.pending)
        };
        self.db.record_behaviors(batch).await
    }
}

fn to_event(closed: ClosedBehavior, class_id: &str) -> BehaviorEvent {
    BehaviorEvent {
        id: None,
        class_id: class_id.to_string(),
        duration_secs: closed.duration_secs(),
        student_id: closed.student_id,
        kind: closed.kind,
        confidence: closed.confidence,
        start_time: closed.started_at,
        end_time: closed.ended_at,
    }
}
