use crate::config::{ImbalancePolicy, PlanConfig};
use crate::domain::model::{
    ConcentrationModel, LevelMatrix, LevelRow, PlanWarning, ResolutionPolicy, StockEntry,
    StockLevel, VolumeMatrix, VolumeRow,
};
use crate::utils::error::{PrepError, Result};

/// Convert one target concentration into a transfer volume and stock level.
///
/// Generic policy: try the high stock, then the low stock, accepting a volume
/// only inside `[min_transfer_volume, well_volume / culture_ratio]`; when
/// neither level fits, fall back to the high stock (low if no high exists)
/// with the bounds ignored. Fixed-dose policy: always the high-stock formula,
/// no bounds, no fallback.
///
/// A zero target yields `(0, None)` under every policy.
pub fn compute_cell(
    entry: &StockEntry,
    policy: &ResolutionPolicy,
    target: f64,
    config: &PlanConfig,
) -> (f64, Option<StockLevel>) {
    if target == 0.0 {
        return (0.0, None);
    }

    if *policy == ResolutionPolicy::FixedDose {
        return match entry.high {
            Some(stock_high) => (
                target * config.well_volume / stock_high,
                Some(StockLevel::High),
            ),
            None => (0.0, None),
        };
    }

    // The acceptance ceiling equals the culture dose; kept as the protocol
    // computes it.
    let ceiling = config.well_volume / config.culture_ratio;

    if let Some(stock_high) = entry.high {
        let volume = target * config.well_volume / stock_high;
        if volume >= config.min_transfer_volume && volume <= ceiling {
            return (volume, Some(StockLevel::High));
        }
    }

    if let Some(stock_low) = entry.low {
        let volume = target * config.well_volume / stock_low;
        if volume >= config.min_transfer_volume && volume <= ceiling {
            return (volume, Some(StockLevel::Low));
        }
    }

    // Neither level fits the bounds; use the closer formula anyway, high
    // preferred.
    if let Some(stock_high) = entry.high {
        return (
            target * config.well_volume / stock_high,
            Some(StockLevel::High),
        );
    }
    if let Some(stock_low) = entry.low {
        return (
            target * config.well_volume / stock_low,
            Some(StockLevel::Low),
        );
    }

    (0.0, None)
}

/// Apply `compute_cell` across the whole model and derive the Water and
/// Culture fills: culture is `well_volume / culture_ratio` for every well,
/// water absorbs the remaining slack so each row totals `well_volume`.
///
/// Row totals outside `volume_tolerance` abort or warn per the configured
/// imbalance policy.
pub fn compute_matrix(
    model: &ConcentrationModel,
    config: &PlanConfig,
) -> Result<(VolumeMatrix, LevelMatrix, Vec<PlanWarning>)> {
    let culture_volume = config.well_volume / config.culture_ratio;
    let mut volume_rows = Vec::with_capacity(model.targets().rows().len());
    let mut level_rows = Vec::with_capacity(model.targets().rows().len());
    let mut warnings = Vec::new();

    for row in model.targets().rows() {
        let mut by_component = Vec::with_capacity(model.components().len());
        let mut levels = Vec::with_capacity(model.components().len());

        for (idx, component) in model.components().iter().enumerate() {
            let entry =
                model
                    .stock()
                    .get(component)
                    .ok_or_else(|| PrepError::MissingStockError {
                        component: component.as_str().to_string(),
                    })?;
            let policy = config.policies.policy_for(component);
            let (volume, level) = compute_cell(entry, policy, row.targets[idx], config);
            by_component.push(volume);
            levels.push(level);
        }

        let component_total: f64 = by_component.iter().sum();
        let volume_row = VolumeRow {
            well: row.well.clone(),
            by_component,
            water: config.well_volume - component_total - culture_volume,
            culture: culture_volume,
        };

        // Written so that a NaN total (degenerate targets) counts as
        // unbalanced rather than slipping through the comparison.
        let total = volume_row.total();
        let balanced = (total - config.well_volume).abs() <= config.volume_tolerance;
        if !balanced {
            match config.on_imbalance {
                ImbalancePolicy::Fail => {
                    return Err(PrepError::VolumeImbalanceError {
                        well: volume_row.well.as_str().to_string(),
                        total,
                        expected: config.well_volume,
                    });
                }
                ImbalancePolicy::Warn => {
                    tracing::warn!(
                        "Well {} totals {:.2} uL, expected {:.2} uL",
                        volume_row.well,
                        total,
                        config.well_volume
                    );
                    warnings.push(PlanWarning::VolumeImbalance {
                        well: volume_row.well.clone(),
                        total,
                        expected: config.well_volume,
                    });
                }
            }
        }

        level_rows.push(LevelRow {
            well: volume_row.well.clone(),
            levels,
        });
        volume_rows.push(volume_row);
    }

    let components = model.components().to_vec();
    Ok((
        VolumeMatrix {
            components: components.clone(),
            rows: volume_rows,
        },
        LevelMatrix {
            components,
            rows: level_rows,
        },
        warnings,
    ))
}
