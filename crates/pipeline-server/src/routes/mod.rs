pub mod schedule;
pub mod tasks;
