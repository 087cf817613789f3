use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single check-in row: the first time a student was observed for a class
/// outside the de-duplication window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Option<i64>,
    pub student_id: String,
    pub class_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Denormalized attendance row for range queries and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub id: i64,
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub class_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInEntry {
    pub student_id: String,
    pub student_name: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

/// Report produced when the check-in window closes: every student seen during
/// the window with their first-seen time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReport {
    pub class_id: String,
    pub window_opened_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<CheckInEntry>,
}
