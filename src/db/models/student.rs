use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered student. The face encoding is a fixed-length vector produced
/// by the external recognizer (128 floats by convention) and may be attached
/// after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub face_encoding: Option<Vec<f64>>,
    pub face_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class_name: class_name.into(),
            face_encoding: None,
            face_image_path: None,
            created_at: Utc::now(),
        }
    }
}
