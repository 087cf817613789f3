//! Boundary types and traits for the external capture and recognition
//! collaborators. The engine consumes camera frames, detected faces and pose
//! keypoints through these interfaces; the native implementations live
//! outside this crate.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Distance bound under which a probe encoding matches a stored one.
pub const FACE_MATCH_THRESHOLD: f64 = 0.6;

/// One decoded video frame, row-major BGR bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRegion {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl FaceRegion {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.left + self.right) as f64 / 2.0,
            (self.top + self.bottom) as f64 / 2.0,
        )
    }
}

/// A face the recognizer matched to a known identity in one frame, plus the
/// feature counts the analyzer's heuristics need.
#[derive(Debug, Clone)]
pub struct FaceObservation {
    pub student_id: String,
    pub region: FaceRegion,
    pub eye_count: u32,
}

/// Normalized pose landmark from the keypoint estimator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// Source of video frames (camera device or video file). The implementation
/// owns the underlying handle exclusively and releases it on drop, so every
/// exit path of the monitor loop returns the device.
pub trait FrameSource: Send {
    /// Pull the next frame. `Ok(None)` means the source produced nothing this
    /// tick (dropped frame); an error means the source is gone.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Face detection plus identity matching over one frame.
pub trait FaceRecognizer: Send + Sync {
    /// Detect faces and resolve them to known identities. No face found is
    /// an empty list, not an error.
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceObservation>>;
}

/// Euclidean distance between two encodings. Mismatched lengths never match.
pub fn encoding_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
