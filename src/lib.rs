pub mod analytics;
pub mod analyzer;
pub mod db;
pub mod monitor;
pub mod recognizer;
pub mod session;
pub mod settings;
pub mod trainer;

pub use analytics::{summarize, AnalyticsExporter, BehaviorSummary};
pub use analyzer::{AnalyzerConfig, BehaviorReading, FrameAnalyzer};
pub use db::{models, Database, ATTENDANCE_DEDUP_MINUTES};
pub use monitor::MonitorController;
pub use recognizer::{FaceObservation, FaceRecognizer, FaceRegion, Frame, FrameSource, Keypoint};
pub use session::{SessionCoordinator, SessionPhase, SessionSnapshot, CHECK_IN_WINDOW_MINUTES};
pub use settings::{DataPaths, MonitorSettings, SettingsStore};
pub use trainer::{
    train_in_background, ActionModel, AnnotatedSequence, SequenceBuffer, Trainer, TrainingOutcome,
};

/// Initialize logging from `RUST_LOG`, defaulting to Info. Safe to call more
/// than once (later calls are no-ops).
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
