use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::analyzer::FrameAnalyzer;
use crate::recognizer::{FaceRecognizer, FrameSource};
use crate::session::SessionCoordinator;

/// Nominal capture cadence (~33 Hz).
pub const FRAME_INTERVAL_MS: u64 = 30;

/// The single capture tick: pull one frame, detect faces, classify, feed the
/// coordinator. Detection and analysis run nowhere else.
pub async fn monitor_loop(
    mut source: Box<dyn FrameSource>,
    recognizer: Arc<dyn FaceRecognizer>,
    coordinator: SessionCoordinator,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut analyzer = FrameAnalyzer::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => frame,
                    // dropped frame; try again next tick
                    Ok(None) => continue,
                    Err(err) => {
                        error!("frame source failed, stopping monitor: {err:#}");
                        break;
                    }
                };

                let observations = match recognizer.detect(&frame) {
                    Ok(observations) => observations,
                    Err(err) => {
                        warn!("face detection failed for this frame: {err:#}");
                        continue;
                    }
                };

                let readings = analyzer.analyze_frame(&observations, Utc::now());
                if let Err(err) = coordinator.process_frame(readings).await {
                    warn!("frame update failed: {err:#}");
                }
            }
            _ = cancel_token.cancelled() => {
                info!("monitor loop shutting down");
                break;
            }
        }
    }

    // dropping the source here releases the camera on every exit path
    drop(source);
}
