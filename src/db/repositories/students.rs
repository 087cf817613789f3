use anyhow::{bail, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{encoding_from_blob, encoding_to_blob, parse_datetime},
    models::Student,
};
use crate::recognizer::{encoding_distance, FACE_MATCH_THRESHOLD};

const STUDENT_COLUMNS: &str = "id, name, class_name, face_encoding, face_image_path, created_at";

fn row_to_student(row: &Row) -> Result<Student> {
    let created_at: String = row.get("created_at")?;
    let encoding: Option<Vec<u8>> = row.get("face_encoding")?;

    Ok(Student {
        id: row.get("id")?,
        name: row.get("name")?,
        class_name: row.get("class_name")?,
        face_encoding: encoding.map(|blob| encoding_from_blob(&blob)).transpose()?,
        face_image_path: row.get("face_image_path")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn add_student(&self, student: &Student) -> Result<()> {
        let record = student.clone();
        self.execute(move |conn| {
            if record.id.trim().is_empty() || record.name.trim().is_empty() {
                bail!("student id and name are required");
            }

            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM students WHERE id = ?1",
                    params![record.id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                bail!("student '{}' already exists", record.id);
            }

            conn.execute(
                "INSERT INTO students (id, name, class_name, face_encoding, face_image_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.class_name,
                    record.face_encoding.as_deref().map(encoding_to_blob),
                    record.face_image_path,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![student_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_student(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_students(&self) -> Result<Vec<Student>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students ORDER BY name"
            ))?;

            let mut rows = stmt.query([])?;
            let mut students = Vec::new();
            while let Some(row) = rows.next()? {
                students.push(row_to_student(row)?);
            }
            Ok(students)
        })
        .await
    }

    pub async fn update_student(
        &self,
        student_id: &str,
        name: Option<String>,
        class_name: Option<String>,
    ) -> Result<()> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE students
                 SET name = COALESCE(?1, name),
                     class_name = COALESCE(?2, class_name)
                 WHERE id = ?3",
                params![name, class_name, student_id],
            )?;

            if rows_affected == 0 {
                bail!("student '{student_id}' not found");
            }
            Ok(())
        })
        .await
    }

    /// Attach or replace the stored face encoding (and optionally the
    /// reference image path) for a registered student.
    pub async fn attach_face(
        &self,
        student_id: &str,
        encoding: Vec<f64>,
        image_path: Option<String>,
    ) -> Result<()> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE students
                 SET face_encoding = ?1,
                     face_image_path = COALESCE(?2, face_image_path)
                 WHERE id = ?3",
                params![encoding_to_blob(&encoding), image_path, student_id],
            )?;

            if rows_affected == 0 {
                bail!("student '{student_id}' not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn remove_student(&self, student_id: &str) -> Result<()> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            // enrollment rows go with the student via ON DELETE CASCADE
            let rows_affected = conn.execute(
                "DELETE FROM students WHERE id = ?1",
                params![student_id],
            )?;

            if rows_affected == 0 {
                bail!("student '{student_id}' not found");
            }
            Ok(())
        })
        .await
    }

    /// Find the registered student whose stored encoding is nearest to the
    /// probe under Euclidean distance, if any falls inside the match
    /// threshold.
    pub async fn identify_student(&self, encoding: Vec<f64>) -> Result<Option<Student>> {
        self.execute(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, face_encoding FROM students WHERE face_encoding IS NOT NULL")?;

            let mut rows = stmt.query([])?;
            let mut best: Option<(String, f64)> = None;
            while let Some(row) = rows.next()? {
                let student_id: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                let stored = match encoding_from_blob(&blob) {
                    Ok(stored) => stored,
                    Err(err) => {
                        log::warn!("skipping corrupt encoding for student {student_id}: {err}");
                        continue;
                    }
                };

                let distance = encoding_distance(&encoding, &stored);
                if distance < FACE_MATCH_THRESHOLD
                    && best.as_ref().map_or(true, |(_, d)| distance < *d)
                {
                    best = Some((student_id, distance));
                }
            }

            let Some((student_id, _)) = best else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![student_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_student(row)?)),
                None => Ok(None),
            }
        })
        .await
    }
}
