//! Annotation collection and background training for the pose-based action
//! model. The model itself is an external collaborator behind `ActionModel`;
//! this module owns the sample files and keeps training off the tick thread.

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::db::models::BehaviorKind;
use crate::recognizer::Keypoint;

/// Frames per prediction window, matching the action model's input shape.
pub const SEQUENCE_LEN: usize = 30;

/// A labeled keypoint sequence collected from annotated training video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedSequence {
    pub label: BehaviorKind,
    pub recorded_at: DateTime<Utc>,
    /// Frames, each a set of body landmarks.
    pub frames: Vec<Vec<Keypoint>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingOutcome {
    pub success: bool,
    pub message: String,
}

/// The trainable classifier over keypoint sequences.
pub trait ActionModel: Send + Sync {
    /// Train over the samples; returns a summary message.
    fn train(&self, samples: &[AnnotatedSequence]) -> Result<String>;

    /// Classify one full-length window. `Ok(None)` means the model has no
    /// confident prediction for it.
    fn predict(&self, window: &[Vec<Keypoint>]) -> Result<Option<(BehaviorKind, f64)>>;
}

/// Sliding window of per-frame keypoints. Yields nothing until enough frames
/// have accumulated for one prediction.
pub struct SequenceBuffer {
    capacity: usize,
    frames: VecDeque<Vec<Keypoint>>,
}

impl SequenceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, frame: Vec<Keypoint>) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// The current window, or None while there are not yet enough frames.
    pub fn window(&self) -> Option<Vec<Vec<Keypoint>>> {
        if self.frames.len() < self.capacity {
            return None;
        }
        Some(self.frames.iter().cloned().collect())
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Stores annotated sequences as JSON files under the models directory.
pub struct Trainer {
    annotations_dir: PathBuf,
}

impl Trainer {
    pub fn new(models_dir: &Path) -> Result<Self> {
        let annotations_dir = models_dir.join("annotations");
        fs::create_dir_all(&annotations_dir).with_context(|| {
            format!(
                "failed to create annotations directory {}",
                annotations_dir.display()
            )
        })?;
        Ok(Self { annotations_dir })
    }

    pub fn save_annotation(&self, sequence: &AnnotatedSequence) -> Result<PathBuf> {
        let path = self
            .annotations_dir
            .join(format!("{}.json", Uuid::new_v4()));
        let serialized =
            serde_json::to_string(sequence).context("failed to serialize annotation")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write annotation {}", path.display()))?;
        Ok(path)
    }

    /// Load every stored annotation; unreadable files are skipped with a
    /// warning rather than failing the whole set.
    pub fn load_annotations(&self) -> Result<Vec<AnnotatedSequence>> {
        let mut samples = Vec::new();
        let entries = fs::read_dir(&self.annotations_dir).with_context(|| {
            format!(
                "failed to read annotations directory {}",
                self.annotations_dir.display()
            )
        })?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(err) => {
                    warn!("skipping unreadable annotation {}: {err}", path.display());
                    continue;
                }
            };
            match serde_json::from_str::<AnnotatedSequence>(&contents) {
                Ok(sequence) => samples.push(sequence),
                Err(err) => {
                    warn!("skipping malformed annotation {}: {err}", path.display());
                }
            }
        }

        Ok(samples)
    }
}

/// Run training on a blocking worker. The caller gets the outcome over the
/// returned channel instead of blocking the frame path.
pub fn train_in_background(
    model: Arc<dyn ActionModel>,
    samples: Vec<AnnotatedSequence>,
) -> oneshot::Receiver<TrainingOutcome> {
    let (outcome_tx, outcome_rx) = oneshot::channel();

    tokio::task::spawn_blocking(move || {
        let outcome = match model.train(&samples) {
            Ok(message) => TrainingOutcome {
                success: true,
                message,
            },
            Err(err) => TrainingOutcome {
                success: false,
                message: format!("{err:#}"),
            },
        };
        if outcome_tx.send(outcome).is_err() {
            error!("training caller dropped before receiving outcome");
        }
    });

    outcome_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: f32) -> Vec<Keypoint> {
        vec![Keypoint {
            x: value,
            y: value,
            confidence: 1.0,
        }]
    }

    #[test]
    fn buffer_yields_nothing_until_full() {
        let mut buffer = SequenceBuffer::new(3);
        buffer.push(frame(0.0));
        buffer.push(frame(1.0));
        assert!(buffer.window().is_none());

        buffer.push(frame(2.0));
        let window = buffer.window().unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0][0].x, 0.0);
    }

    #[test]
    fn buffer_slides_oldest_frame_out() {
        let mut buffer = SequenceBuffer::new(2);
        buffer.push(frame(0.0));
        buffer.push(frame(1.0));
        buffer.push(frame(2.0));

        let window = buffer.window().unwrap();
        assert_eq!(window[0][0].x, 1.0);
        assert_eq!(window[1][0].x, 2.0);
    }

    #[test]
    fn annotations_round_trip_and_skip_malformed() {
        let dir = std::env::temp_dir().join(format!("classwatch-trainer-{}", Uuid::new_v4()));
        let trainer = Trainer::new(&dir).unwrap();

        trainer
            .save_annotation(&AnnotatedSequence {
                label: BehaviorKind::HandRaised,
                recorded_at: Utc::now(),
                frames: vec![frame(0.5)],
            })
            .unwrap();
        std::fs::write(dir.join("annotations").join("broken.json"), "not json").unwrap();

        let samples = trainer.load_annotations().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, BehaviorKind::HandRaised);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn training_reports_outcome_asynchronously() {
        struct FailingModel;
        impl ActionModel for FailingModel {
            fn train(&self, _samples: &[AnnotatedSequence]) -> Result<String> {
                anyhow::bail!("not enough samples")
            }
            fn predict(
                &self,
                _window: &[Vec<Keypoint>],
            ) -> Result<Option<(BehaviorKind, f64)>> {
                Ok(None)
            }
        }

        let outcome = train_in_background(Arc::new(FailingModel), Vec::new())
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("not enough samples"));
    }
}
