use anyhow::{bail, Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{ClassRecord, ClassSchedule},
};

const CLASS_COLUMNS: &str = "id, name, subject, room, schedule, created_at";

fn row_to_class(row: &Row) -> Result<ClassRecord> {
    let id: String = row.get("id")?;
    let schedule: String = row.get("schedule")?;
    let created_at: String = row.get("created_at")?;

    Ok(ClassRecord {
        schedule: ClassSchedule::from_json(&schedule)
            .with_context(|| format!("class '{id}' has a malformed schedule"))?,
        id,
        name: row.get("name")?,
        subject: row.get("subject")?,
        room: row.get("room")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn add_class(&self, class: &ClassRecord) -> Result<()> {
        let record = class.clone();
        self.execute(move |conn| {
            if record.id.trim().is_empty() || record.name.trim().is_empty() {
                bail!("class id and name are required");
            }
            record.schedule.validate()?;

            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM classes WHERE id = ?1",
                    params![record.id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                bail!("class '{}' already exists", record.id);
            }

            conn.execute(
                "INSERT INTO classes (id, name, subject, room, schedule, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.subject,
                    record.room,
                    record.schedule.to_json()?,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_class(&self, class_id: &str) -> Result<Option<ClassRecord>> {
        let class_id = class_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLASS_COLUMNS} FROM classes WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![class_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_class(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_classes(&self) -> Result<Vec<ClassRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLASS_COLUMNS} FROM classes ORDER BY name"
            ))?;

            let mut rows = stmt.query([])?;
            let mut classes = Vec::new();
            while let Some(row) = rows.next()? {
                classes.push(row_to_class(row)?);
            }
            Ok(classes)
        })
        .await
    }

    pub async fn update_class(&self, class: &ClassRecord) -> Result<()> {
        let record = class.clone();
        self.execute(move |conn| {
            record.schedule.validate()?;

            let rows_affected = conn.execute(
                "UPDATE classes
                 SET name = ?1,
                     subject = ?2,
                     room = ?3,
                     schedule = ?4
                 WHERE id = ?5",
                params![
                    record.name,
                    record.subject,
                    record.room,
                    record.schedule.to_json()?,
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("class '{}' not found", record.id);
            }
            Ok(())
        })
        .await
    }

    /// Delete a class and its enrollment rows. Attendance and behavior
    /// history keeps referencing the class by id.
    pub async fn delete_class(&self, class_id: &str) -> Result<()> {
        let class_id = class_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM class_students WHERE class_id = ?1",
                params![class_id],
            )?;
            tx.execute("DELETE FROM classes WHERE id = ?1", params![class_id])?;

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
