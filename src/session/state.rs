use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::BehaviorReading;
use crate::db::models::BehaviorKind;

/// Open behavior runs longer than this are force-closed so steady states
/// still produce rows while monitoring continues.
pub const MAX_EVENT_SECS: f64 = 60.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    CheckInWindow,
    Monitoring,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

/// A finished run of one behavior for one student, ready to persist.
#[derive(Debug, Clone)]
pub struct ClosedBehavior {
    pub student_id: String,
    pub kind: BehaviorKind,
    pub confidence: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl ClosedBehavior {
    pub fn duration_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone)]
struct OpenBehavior {
    kind: BehaviorKind,
    started_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    confidence_sum: f64,
    samples: u32,
}

impl OpenBehavior {
    fn new(reading: &BehaviorReading) -> Self {
        Self {
            kind: reading.kind,
            started_at: reading.observed_at,
            last_seen_at: reading.observed_at,
            confidence_sum: reading.confidence,
            samples: 1,
        }
    }

    fn close(self, student_id: String) -> ClosedBehavior {
        ClosedBehavior {
            student_id,
            kind: self.kind,
            confidence: self.confidence_sum / self.samples as f64,
            started_at: self.started_at,
            ended_at: self.last_seen_at,
        }
    }
}

/// Display snapshot of the running session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub class_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: i64,
    pub present_count: usize,
    pub roster_size: usize,
    pub attendance_ratio: f64,
    pub label_totals: HashMap<BehaviorKind, u64>,
}

/// Transient per-session state: the phase machine, the check-in map and the
/// reporting tallies. All methods take explicit times; nothing here touches
/// the clock or the store.
#[derive(Debug, Default)]
pub struct SessionState {
    phase: SessionPhase,
    class_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    roster_size: usize,
    check_ins: HashMap<String, DateTime<Utc>>,
    seen: HashSet<String>,
    label_totals: HashMap<BehaviorKind, u64>,
    student_totals: HashMap<String, HashMap<BehaviorKind, u64>>,
    open_events: HashMap<String, OpenBehavior>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != SessionPhase::Idle
    }

    pub fn class_id(&self) -> Option<&str> {
        self.class_id.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn student_totals(&self) -> &HashMap<String, HashMap<BehaviorKind, u64>> {
        &self.student_totals
    }

    pub fn begin(&mut self, class_id: String, roster_size: usize, now: DateTime<Utc>) {
        *self = Self {
            phase: SessionPhase::CheckInWindow,
            class_id: Some(class_id),
            started_at: Some(now),
            roster_size,
            ..Self::default()
        };
    }

    /// Close the check-in window and return the captured first-seen times,
    /// earliest first. Returns None unless the window is open.
    pub fn close_check_in(&mut self) -> Option<Vec<(String, DateTime<Utc>)>> {
        if self.phase != SessionPhase::CheckInWindow {
            return None;
        }
        self.phase = SessionPhase::Monitoring;

        let mut entries: Vec<(String, DateTime<Utc>)> = self
            .check_ins
            .iter()
            .map(|(student_id, checked_in_at)| (student_id.clone(), *checked_in_at))
            .collect();
        entries.sort_by_key(|(_, checked_in_at)| *checked_in_at);
        Some(entries)
    }

    /// Fold one reading into the session: tallies, check-in capture while the
    /// window is open, and open-event bookkeeping. Returns any behavior runs
    /// this reading closed.
    pub fn observe(&mut self, reading: &BehaviorReading) -> Vec<ClosedBehavior> {
        if self.phase == SessionPhase::Idle {
            return Vec::new();
        }

        self.seen.insert(reading.student_id.clone());
        *self.label_totals.entry(reading.kind).or_insert(0) += 1;
        *self
            .student_totals
            .entry(reading.student_id.clone())
            .or_default()
            .entry(reading.kind)
            .or_insert(0) += 1;

        if self.phase == SessionPhase::CheckInWindow {
            self.check_ins
                .entry(reading.student_id.clone())
                .or_insert(reading.observed_at);
        }

        let mut closed = Vec::new();
        match self.open_events.remove(&reading.student_id) {
            None => {
                self.open_events
                    .insert(reading.student_id.clone(), OpenBehavior::new(reading));
            }
            Some(mut open) if open.kind == reading.kind => {
                open.last_seen_at = reading.observed_at;
                open.confidence_sum += reading.confidence;
                open.samples += 1;

                let run_secs =
                    (reading.observed_at - open.started_at).num_milliseconds() as f64 / 1000.0;
                if run_secs >= MAX_EVENT_SECS {
                    closed.push(open.close(reading.student_id.clone()));
                } else {
                    self.open_events.insert(reading.student_id.clone(), open);
                }
            }
            Some(open) => {
                closed.push(open.close(reading.student_id.clone()));
                self.open_events
                    .insert(reading.student_id.clone(), OpenBehavior::new(reading));
            }
        }
        closed
    }

    /// End the session: close every open run (each ends at its last
    /// sighting) and reset to Idle.
    pub fn finish(&mut self) -> Vec<ClosedBehavior> {
        let closed = self
            .open_events
            .drain()
            .map(|(student_id, open)| open.close(student_id))
            .collect();
        *self = Self::default();
        closed
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let present_count = self.seen.len();
        let attendance_ratio = if self.roster_size == 0 {
            0.0
        } else {
            present_count as f64 / self.roster_size as f64
        };

        SessionSnapshot {
            phase: self.phase,
            class_id: self.class_id.clone(),
            started_at: self.started_at,
            elapsed_secs: self
                .started_at
                .map(|started| (now - started).num_seconds())
                .unwrap_or(0),
            present_count,
            roster_size: self.roster_size,
            attendance_ratio,
            label_totals: self.label_totals.clone(),
        }
    }
}
