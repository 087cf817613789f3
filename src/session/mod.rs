mod coordinator;
mod state;

pub use coordinator::{SessionCoordinator, CHECK_IN_WINDOW_MINUTES, MIN_EVENT_SECS};
pub use state::{ClosedBehavior, SessionPhase, SessionSnapshot, SessionState, MAX_EVENT_SECS};
