pub mod attendance;
pub mod behavior;
pub mod class;
pub mod student;

pub use attendance::{AttendanceRecord, AttendanceRow, CheckInEntry, CheckInReport};
pub use behavior::{BehaviorEvent, BehaviorKind, BehaviorRow};
pub use class::{ClassRecord, ClassSchedule, ScheduleDay};
pub use student::Student;
