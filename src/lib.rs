pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{LocalStorage, SimulatedExecutor};
pub use config::{PlanConfig, RunSettings};
pub use core::{plan_run, ProtocolRunner};
pub use domain::model::PlanOutcome;
pub use utils::error::{PrepError, Result};
