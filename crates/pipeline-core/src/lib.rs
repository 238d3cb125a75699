pub mod account;
pub mod assign;
pub mod component;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod evaluate;
pub mod fixtures;
pub mod io;
pub mod locks;
pub mod paths;
pub mod sequence;
pub mod store;
pub mod task;
pub mod types;

pub use engine::TaskEngine;
pub use error::{EngineError, Result};
