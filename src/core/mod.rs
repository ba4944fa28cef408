pub mod pipette;
pub mod planner;
pub mod resources;
pub mod runner;
pub mod transfer;
pub mod volumes;

pub use crate::domain::model::{PlanOutcome, PlanStep, RunStats};
pub use crate::domain::ports::{ConfigProvider, ProtocolExecutor, Storage};
pub use crate::utils::error::Result;
pub use planner::plan_run;
pub use runner::ProtocolRunner;
