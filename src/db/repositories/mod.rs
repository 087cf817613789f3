mod attendance;
mod behaviors;
mod classes;
mod enrollments;
mod students;

pub use attendance::ATTENDANCE_DEDUP_MINUTES;
