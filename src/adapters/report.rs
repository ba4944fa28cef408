use crate::adapters::tables;
use crate::domain::model::{PlanOutcome, PlanStep, PlanWarning, ResourceSummary};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::Serialize;

/// JSON document written next to the matrices: the full ordered plan plus
/// everything an operator needs to audit it.
#[derive(Debug, Serialize)]
pub struct PlanReport<'a> {
    pub generated_at: String,
    pub degraded: bool,
    pub warnings: &'a [PlanWarning],
    pub warning_messages: Vec<String>,
    pub resources: &'a ResourceSummary,
    pub steps: &'a [PlanStep],
}

impl<'a> PlanReport<'a> {
    pub fn new(outcome: &'a PlanOutcome) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            degraded: outcome.degraded,
            warnings: &outcome.warnings,
            warning_messages: outcome.warnings.iter().map(|w| w.to_string()).collect(),
            resources: &outcome.resources,
            steps: &outcome.steps,
        }
    }
}

/// Write volumes.csv, levels.csv and plan_report.json through the storage
/// port.
pub async fn write_outputs<S: Storage>(storage: &S, outcome: &PlanOutcome) -> Result<()> {
    storage
        .write_file("volumes.csv", &tables::volume_matrix_csv(&outcome.volumes)?)
        .await?;
    storage
        .write_file("levels.csv", &tables::level_matrix_csv(&outcome.levels)?)
        .await?;

    let report = PlanReport::new(outcome);
    let json = serde_json::to_vec_pretty(&report)?;
    storage.write_file("plan_report.json", &json).await?;

    tracing::info!("Outputs written: volumes.csv, levels.csv, plan_report.json");
    Ok(())
}
