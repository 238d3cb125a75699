pub mod config;
pub mod schedule;
pub mod seed;
pub mod sequence;
pub mod serve;
pub mod task;
