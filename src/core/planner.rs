use crate::config::PlanConfig;
use crate::core::transfer::PlanItem;
use crate::core::{pipette, resources, transfer, volumes};
use crate::domain::model::{ConcentrationModel, PlanOutcome, PlanStep, PlanWarning, PlateLayouts};
use crate::utils::error::Result;

/// One complete planning pass: volume matrix, transfer expansion, channel
/// allocation, resource aggregation. Pure and deterministic — identical
/// inputs produce an identical step sequence.
pub fn plan_run(
    model: &ConcentrationModel,
    layouts: &PlateLayouts,
    config: &PlanConfig,
) -> Result<PlanOutcome> {
    tracing::info!(
        "Planning {} destination wells, {} components",
        model.targets().rows().len(),
        model.components().len()
    );

    let (volumes, levels, mut warnings) = volumes::compute_matrix(model, config)?;

    let (items, transfer_warnings) = transfer::generate(&volumes, &levels, layouts, config);
    warnings.extend(transfer_warnings);

    let mut steps = Vec::new();
    for item in items {
        match item {
            PlanItem::Checkpoint { message } => steps.push(PlanStep::Checkpoint { message }),
            PlanItem::Request(request) => {
                let instructions =
                    pipette::allocate(&request, &config.channels, config.min_transfer_volume)?;
                steps.extend(instructions.into_iter().map(PlanStep::Transfer));
            }
        }
    }

    let resources = resources::summarize(&steps, config);

    // A run is degraded only when volume validation was relaxed into
    // warnings; resolution warnings leave the produced plan exact.
    let degraded = warnings
        .iter()
        .any(|w| matches!(w, PlanWarning::VolumeImbalance { .. }));

    for warning in &warnings {
        tracing::warn!("Plan warning: {}", warning);
    }
    tracing::info!(
        "Plan ready: {} steps, {} warnings",
        steps.len(),
        warnings.len()
    );

    Ok(PlanOutcome {
        volumes,
        levels,
        steps,
        resources,
        warnings,
        degraded,
    })
}
