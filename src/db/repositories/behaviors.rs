use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_behavior, parse_datetime},
    models::{BehaviorEvent, BehaviorRow},
};

fn row_to_behavior(row: &Row) -> Result<BehaviorRow> {
    let kind: String = row.get("behavior_type")?;
    let start_time: String = row.get("start_time")?;
    let end_time: String = row.get("end_time")?;

    Ok(BehaviorRow {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        student_name: row.get("student_name")?,
        class_id: row.get("class_id")?,
        class_name: row.get("class_name")?,
        kind: parse_behavior(&kind)?,
        confidence: row.get("confidence")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_datetime(&end_time, "end_time")?,
        duration_secs: row.get("duration")?,
    })
}

impl Database {
    pub async fn record_behavior(&self, event: &BehaviorEvent) -> Result<()> {
        let record = event.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO behaviors
                 (student_id, class_id, behavior_type, confidence, start_time, end_time, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.student_id,
                    record.class_id,
                    record.kind.as_str(),
                    record.confidence,
                    record.start_time.to_rfc3339(),
                    record.end_time.to_rfc3339(),
                    record.duration_secs,
                ],
            )
            .context("failed to insert behavior event")?;
            Ok(())
        })
        .await
    }

    /// Insert a batch of behavior events in one transaction. The coordinator
    /// flushes folded events through here instead of writing once per frame.
    pub async fn record_behaviors(&self, events: Vec<BehaviorEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO behaviors
                     (student_id, class_id, behavior_type, confidence, start_time, end_time, duration)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for event in &events {
                    stmt.execute(params![
                        event.student_id,
                        event.class_id,
                        event.kind.as_str(),
                        event.confidence,
                        event.start_time.to_rfc3339(),
                        event.end_time.to_rfc3339(),
                        event.duration_secs,
                    ])?;
                }
            }
            tx.commit().context("failed to commit behavior batch")?;
            Ok(())
        })
        .await
    }

    pub async fn behaviors_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BehaviorRow>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, b.student_id,
                        COALESCE(s.name, b.student_id) AS student_name,
                        b.class_id,
                        COALESCE(c.name, b.class_id) AS class_name,
                        b.behavior_type, b.confidence, b.start_time, b.end_time, b.duration
                 FROM behaviors b
                 LEFT JOIN students s ON s.id = b.student_id
                 LEFT JOIN classes c ON c.id = b.class_id
                 WHERE b.start_time >= ?1 AND b.start_time < ?2
                 ORDER BY b.start_time DESC",
            )?;

            let mut rows = stmt.query(params![start.to_rfc3339(), end.to_rfc3339()])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_behavior(row)?);
            }
            Ok(records)
        })
        .await
    }
}
