//! Exports and summaries over persisted attendance and behavior rows.
//! Everything lands under the analytics directory with timestamped names.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::db::models::{AttendanceRow, BehaviorKind, BehaviorRow, CheckInReport};

#[derive(Clone)]
pub struct AnalyticsExporter {
    dir: PathBuf,
}

impl AnalyticsExporter {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create analytics directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stamped(&self, prefix: &str, extension: &str) -> PathBuf {
        self.dir.join(format!(
            "{prefix}_{}.{extension}",
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    }

    pub fn export_attendance_csv(&self, rows: &[AttendanceRow]) -> Result<PathBuf> {
        let path = self.stamped("attendance", "csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record([
            "student_id",
            "student_name",
            "class_id",
            "class_name",
            "timestamp",
        ])?;
        for row in rows {
            writer.write_record([
                row.student_id.clone(),
                row.student_name.clone(),
                row.class_id.clone(),
                row.class_name.clone(),
                row.timestamp.to_rfc3339(),
            ])?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn export_behaviors_csv(&self, rows: &[BehaviorRow]) -> Result<PathBuf> {
        let path = self.stamped("behaviors", "csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record([
            "student_id",
            "student_name",
            "class_id",
            "class_name",
            "behavior",
            "confidence",
            "start_time",
            "end_time",
            "duration_secs",
        ])?;
        for row in rows {
            writer.write_record([
                row.student_id.clone(),
                row.student_name.clone(),
                row.class_id.clone(),
                row.class_name.clone(),
                row.kind.as_str().to_string(),
                row.confidence.to_string(),
                row.start_time.to_rfc3339(),
                row.end_time.to_rfc3339(),
                row.duration_secs.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn export_behaviors_json(&self, rows: &[BehaviorRow]) -> Result<PathBuf> {
        let path = self.stamped("behaviors", "json");
        let serialized =
            serde_json::to_string_pretty(rows).context("failed to serialize behavior rows")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_check_in_report(&self, report: &CheckInReport) -> Result<PathBuf> {
        let path = self.dir.join(format!(
            "check_in_{}_{}.json",
            report.class_id,
            report.generated_at.format("%Y%m%d_%H%M%S")
        ));
        let serialized =
            serde_json::to_string_pretty(report).context("failed to serialize check-in report")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSummary {
    pub total_events: usize,
    pub label_totals: HashMap<BehaviorKind, u64>,
    pub dominant: Option<BehaviorKind>,
    pub mean_confidence: f64,
}

pub fn summarize(rows: &[BehaviorRow]) -> BehaviorSummary {
    let mut label_totals: HashMap<BehaviorKind, u64> = HashMap::new();
    let mut confidence_sum = 0.0;
    for row in rows {
        *label_totals.entry(row.kind).or_insert(0) += 1;
        confidence_sum += row.confidence;
    }

    let dominant = label_totals
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(kind, _)| *kind);

    BehaviorSummary {
        total_events: rows.len(),
        dominant,
        mean_confidence: if rows.is_empty() {
            0.0
        } else {
            confidence_sum / rows.len() as f64
        },
        label_totals,
    }
}
