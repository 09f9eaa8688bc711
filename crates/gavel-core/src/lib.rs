pub mod assign;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod io;
pub mod matcher;
pub mod orchestrator;
pub mod planner;
pub mod platform;
pub mod rebalance;
pub mod snapshot;
pub mod sync;
pub mod types;
pub mod wait;

pub use error::{GavelError, Result};
