use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of behavior labels the analyzer and the action model can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Attentive,
    Inattentive,
    Sleeping,
    HandRaised,
    UsingPhone,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorKind::Attentive => "attentive",
            BehaviorKind::Inattentive => "inattentive",
            BehaviorKind::Sleeping => "sleeping",
            BehaviorKind::HandRaised => "hand_raised",
            BehaviorKind::UsingPhone => "using_phone",
        }
    }
}

/// One persisted run of a single behavior for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEvent {
    pub id: Option<i64>,
    pub student_id: String,
    pub class_id: String,
    pub kind: BehaviorKind,
    pub confidence: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Denormalized behavior row for range queries and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRow {
    pub id: i64,
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub class_name: String,
    pub kind: BehaviorKind,
    pub confidence: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::helpers::parse_behavior;

    #[test]
    fn label_round_trip() {
        for kind in [
            BehaviorKind::Attentive,
            BehaviorKind::Inattentive,
            BehaviorKind::Sleeping,
            BehaviorKind::HandRaised,
            BehaviorKind::UsingPhone,
        ] {
            assert_eq!(parse_behavior(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!(parse_behavior("daydreaming").is_err());
    }
}
