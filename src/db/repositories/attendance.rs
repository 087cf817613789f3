use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::AttendanceRow};

/// No second attendance row for the same (student, class) within this window.
pub const ATTENDANCE_DEDUP_MINUTES: i64 = 5;

fn row_to_attendance(row: &Row) -> Result<AttendanceRow> {
    let timestamp: String = row.get("timestamp")?;
    Ok(AttendanceRow {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        student_name: row.get("student_name")?,
        class_id: row.get("class_id")?,
        class_name: row.get("class_name")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
    })
}

impl Database {
    /// Record attendance for a student in a class. Returns false when the
    /// write is suppressed by the de-duplication window. The check and the
    /// insert run in one transaction.
    pub async fn record_attendance(
        &self,
        student_id: &str,
        class_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        let student_id = student_id.to_string();
        let class_id = class_id.to_string();
        self.execute(move |conn| {
            let cutoff = (timestamp - Duration::minutes(ATTENDANCE_DEDUP_MINUTES)).to_rfc3339();
            let tx = conn.transaction()?;

            let recent: i64 = tx.query_row(
                "SELECT COUNT(*) FROM attendance
                 WHERE student_id = ?1 AND class_id = ?2 AND timestamp > ?3",
                params![student_id, class_id, cutoff],
                |row| row.get(0),
            )?;
            if recent > 0 {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO attendance (student_id, class_id, timestamp)
                 VALUES (?1, ?2, ?3)",
                params![student_id, class_id, timestamp.to_rfc3339()],
            )?;
            tx.commit().context("failed to commit attendance record")?;
            Ok(true)
        })
        .await
    }

    pub async fn attendance_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRow>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.student_id,
                        COALESCE(s.name, a.student_id) AS student_name,
                        a.class_id,
                        COALESCE(c.name, a.class_id) AS class_name,
                        a.timestamp
                 FROM attendance a
                 LEFT JOIN students s ON s.id = a.student_id
                 LEFT JOIN classes c ON c.id = a.class_id
                 WHERE a.timestamp >= ?1 AND a.timestamp < ?2
                 ORDER BY a.timestamp DESC",
            )?;

            let mut rows = stmt.query(params![start.to_rfc3339(), end.to_rfc3339()])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_attendance(row)?);
            }
            Ok(records)
        })
        .await
    }
}
