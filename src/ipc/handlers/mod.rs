pub mod assignments;
pub mod attendance;
pub mod backup_exchange;
pub mod core;
pub mod dashboard;
pub mod gradebook;
pub mod students;
