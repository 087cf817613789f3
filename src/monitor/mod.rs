mod controller;
mod loop_worker;

pub use controller::MonitorController;
pub use loop_worker::{monitor_loop, FRAME_INTERVAL_MS};
