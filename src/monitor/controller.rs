use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::recognizer::{FaceRecognizer, FrameSource};
use crate::session::SessionCoordinator;

use super::loop_worker::{monitor_loop, FRAME_INTERVAL_MS};

/// Starts and stops the capture loop. Only one loop may run at a time; the
/// frame source moves into the loop task and is released when it exits.
pub struct MonitorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        source: Box<dyn FrameSource>,
        recognizer: Arc<dyn FaceRecognizer>,
        coordinator: SessionCoordinator,
    ) -> Result<()> {
        self.start_with_interval(
            source,
            recognizer,
            coordinator,
            Duration::from_millis(FRAME_INTERVAL_MS),
        )
    }

    pub fn start_with_interval(
        &mut self,
        source: Box<dyn FrameSource>,
        recognizer: Arc<dyn FaceRecognizer>,
        coordinator: SessionCoordinator,
        interval: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(monitor_loop(
            source,
            recognizer,
            coordinator,
            interval,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}
