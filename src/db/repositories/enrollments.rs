use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::parse_datetime, models::Student};

impl Database {
    /// Enroll a student into a class. Returns false when the pair is already
    /// enrolled; missing student or class is a validation error.
    pub async fn enroll_student(
        &self,
        class_id: &str,
        student_id: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool> {
        let class_id = class_id.to_string();
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let class_exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM classes WHERE id = ?1",
                    params![class_id],
                    |row| row.get(0),
                )
                .optional()?;
            if class_exists.is_none() {
                bail!("unknown class '{class_id}'");
            }

            let student_exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM students WHERE id = ?1",
                    params![student_id],
                    |row| row.get(0),
                )
                .optional()?;
            if student_exists.is_none() {
                bail!("unknown student '{student_id}'");
            }

            let rows_affected = conn.execute(
                "INSERT OR IGNORE INTO class_students (class_id, student_id, joined_at)
                 VALUES (?1, ?2, ?3)",
                params![class_id, student_id, joined_at.to_rfc3339()],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Remove an enrollment. Returns false when the pair was not enrolled.
    pub async fn unenroll_student(&self, class_id: &str, student_id: &str) -> Result<bool> {
        let class_id = class_id.to_string();
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM class_students WHERE class_id = ?1 AND student_id = ?2",
                params![class_id, student_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn enrolled_students(&self, class_id: &str) -> Result<Vec<Student>> {
        let class_id = class_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.name, s.class_name, s.face_encoding, s.face_image_path, s.created_at
                 FROM class_students cs
                 JOIN students s ON s.id = cs.student_id
                 WHERE cs.class_id = ?1
                 ORDER BY s.name",
            )?;

            let mut rows = stmt.query(params![class_id])?;
            let mut students = Vec::new();
            while let Some(row) = rows.next()? {
                let created_at: String = row.get("created_at")?;
                let encoding: Option<Vec<u8>> = row.get("face_encoding")?;
                students.push(Student {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    class_name: row.get("class_name")?,
                    face_encoding: encoding
                        .map(|blob| crate::db::helpers::encoding_from_blob(&blob))
                        .transpose()?,
                    face_image_path: row.get("face_image_path")?,
                    created_at: parse_datetime(&created_at, "created_at")?,
                });
            }
            Ok(students)
        })
        .await
    }

    pub async fn enrollment_count(&self, class_id: &str) -> Result<usize> {
        let class_id = class_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM class_students WHERE class_id = ?1",
                params![class_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Utc};

    use crate::db::connection::testing;
    use crate::db::models::{ClassRecord, ClassSchedule, ScheduleDay, Student};

    async fn seed(db: &crate::db::Database) {
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
        db.add_student(&Student::new("S001", "Ada", "10A")).await.unwrap();
    }

    #[tokio::test]
    async fn enrolling_twice_keeps_one_row() {
        let (db, path) = testing::open_temp("enroll-dup");
        seed(&db).await;

        assert!(db.enroll_student("CS101", "S001", Utc::now()).await.unwrap());
        assert!(!db.enroll_student("CS101", "S001", Utc::now()).await.unwrap());
        assert_eq!(db.enrollment_count("CS101").await.unwrap(), 1);

        drop(db);
        testing::cleanup(&path);
    }

    #[tokio::test]
    async fn unenrolling_missing_pair_is_a_no_op() {
        let (db, path) = testing::open_temp("unenroll-missing");
        seed(&db).await;

        assert!(!db.unenroll_student("CS101", "S001").await.unwrap());

        assert!(db.enroll_student("CS101", "S001", Utc::now()).await.unwrap());
        assert!(db.unenroll_student("CS101", "S001").await.unwrap());
        assert_eq!(db.enrollment_count("CS101").await.unwrap(), 0);

        drop(db);
        testing::cleanup(&path);
    }

    #[tokio::test]
    async fn enrolling_unknown_student_is_rejected() {
        let (db, path) = testing::open_temp("enroll-unknown");
        seed(&db).await;

        assert!(db.enroll_student("CS101", "S999", Utc::now()).await.is_err());
        assert!(db.enroll_student("CS999", "S001", Utc::now()).await.is_err());

        drop(db);
        testing::cleanup(&path);
    }
}
