//! Rule-based per-frame behavior classification.
//!
//! The heuristics are deliberately crude: one prior center per identity, a
//! fixed displacement threshold and an eye-presence check. No temporal
//! smoothing beyond the single previous frame.

mod config;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::db::models::BehaviorKind;
use crate::recognizer::FaceObservation;

pub use config::AnalyzerConfig;

/// One classified face in one frame.
#[derive(Debug, Clone)]
pub struct BehaviorReading {
    pub student_id: String,
    pub kind: BehaviorKind,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

/// Assigns behavior labels per face. The previous-center map is scoped to one
/// monitoring session; `reset` clears it so an identity returning in a later
/// session starts fresh.
pub struct FrameAnalyzer {
    config: AnalyzerConfig,
    prev_centers: HashMap<String, (f64, f64)>,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            config,
            prev_centers: HashMap::new(),
        }
    }

    pub fn analyze(
        &mut self,
        observation: &FaceObservation,
        observed_at: DateTime<Utc>,
    ) -> BehaviorReading {
        let center = observation.region.center();

        let (kind, confidence) = match self.prev_centers.get(&observation.student_id) {
            // First sighting of this identity: no movement baseline yet, so
            // the eye check does not apply either.
            None => (BehaviorKind::Attentive, self.config.first_seen_confidence),
            Some(&(prev_x, prev_y)) => {
                let displacement =
                    ((center.0 - prev_x).powi(2) + (center.1 - prev_y).powi(2)).sqrt();

                let movement_label = if displacement > self.config.head_movement_threshold {
                    (
                        BehaviorKind::Inattentive,
                        (displacement / self.config.movement_confidence_scale)
                            .min(self.config.inattentive_confidence_cap),
                    )
                } else {
                    (BehaviorKind::Attentive, self.config.attentive_confidence)
                };

                if observation.eye_count == 0 {
                    (BehaviorKind::Sleeping, self.config.sleeping_confidence)
                } else {
                    movement_label
                }
            }
        };

        self.prev_centers
            .insert(observation.student_id.clone(), center);

        BehaviorReading {
            student_id: observation.student_id.clone(),
            kind,
            confidence,
            observed_at,
        }
    }

    pub fn analyze_frame(
        &mut self,
        observations: &[FaceObservation],
        observed_at: DateTime<Utc>,
    ) -> Vec<BehaviorReading> {
        observations
            .iter()
            .map(|observation| self.analyze(observation, observed_at))
            .collect()
    }

    /// Forget all tracked identities. Called when a monitoring session ends.
    pub fn reset(&mut self) {
        self.prev_centers.clear();
    }
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::FaceRegion;

    fn observation(student_id: &str, left: i32, top: i32, eye_count: u32) -> FaceObservation {
        FaceObservation {
            student_id: student_id.to_string(),
            region: FaceRegion {
                left,
                top,
                right: left + 100,
                bottom: top + 100,
            },
            eye_count,
        }
    }

    #[test]
    fn first_observation_defaults_to_attentive() {
        let mut analyzer = FrameAnalyzer::new();
        let reading = analyzer.analyze(&observation("S001", 0, 0, 2), Utc::now());
        assert_eq!(reading.kind, BehaviorKind::Attentive);
        assert_eq!(reading.confidence, 0.7);
    }

    #[test]
    fn first_observation_ignores_eye_count() {
        let mut analyzer = FrameAnalyzer::new();
        let reading = analyzer.analyze(&observation("S001", 0, 0, 0), Utc::now());
        assert_eq!(reading.kind, BehaviorKind::Attentive);
        assert_eq!(reading.confidence, 0.7);
    }

    #[test]
    fn small_movement_stays_attentive() {
        let mut analyzer = FrameAnalyzer::new();
        let now = Utc::now();
        analyzer.analyze(&observation("S001", 0, 0, 2), now);
        let reading = analyzer.analyze(&observation("S001", 10, 0, 2), now);
        assert_eq!(reading.kind, BehaviorKind::Attentive);
        assert_eq!(reading.confidence, 0.8);
    }

    #[test]
    fn large_movement_is_inattentive_scaled_and_capped() {
        let mut analyzer = FrameAnalyzer::new();
        let now = Utc::now();
        analyzer.analyze(&observation("S001", 0, 0, 2), now);

        let reading = analyzer.analyze(&observation("S001", 50, 0, 2), now);
        assert_eq!(reading.kind, BehaviorKind::Inattentive);
        assert!((reading.confidence - 0.5).abs() < 1e-9);

        // displacement 200 px would scale to 2.0; capped at 0.9
        let reading = analyzer.analyze(&observation("S001", 250, 0, 2), now);
        assert_eq!(reading.kind, BehaviorKind::Inattentive);
        assert_eq!(reading.confidence, 0.9);
    }

    #[test]
    fn zero_eyes_overrides_movement_label() {
        let mut analyzer = FrameAnalyzer::new();
        let now = Utc::now();
        analyzer.analyze(&observation("S001", 0, 0, 2), now);

        let reading = analyzer.analyze(&observation("S001", 200, 0, 0), now);
        assert_eq!(reading.kind, BehaviorKind::Sleeping);
        assert_eq!(reading.confidence, 0.85);

        let reading = analyzer.analyze(&observation("S001", 200, 0, 0), now);
        assert_eq!(reading.kind, BehaviorKind::Sleeping);
    }

    #[test]
    fn reset_treats_returning_identity_as_new() {
        let mut analyzer = FrameAnalyzer::new();
        let now = Utc::now();
        analyzer.analyze(&observation("S001", 0, 0, 2), now);
        analyzer.reset();

        let reading = analyzer.analyze(&observation("S001", 500, 500, 2), now);
        assert_eq!(reading.kind, BehaviorKind::Attentive);
        assert_eq!(reading.confidence, 0.7);
    }
}
