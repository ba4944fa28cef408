use crate::config::PlanConfig;
use crate::domain::model::{
    ChannelSelect, Column, LevelMatrix, PlanWarning, PlateLayouts, ResolutionPolicy, SourceAddress,
    SourcePlate, StockLevel, TransferCategory, TransferRequest, VolumeMatrix, WellId,
};

/// Operator message carried by the checkpoint preceding the culture category.
pub const CULTURE_CHECKPOINT_MESSAGE: &str =
    "Replace plates with fresh culture if needed, then resume";

/// A generated plan entry before channel assignment: a logical transfer
/// request, or the operator checkpoint.
#[derive(Debug, Clone)]
pub enum PlanItem {
    Request(TransferRequest),
    Checkpoint { message: String },
}

/// Expand the volume matrix into an ordered sequence of logical transfers.
///
/// Categories run in fixed order — water, fixed-dose, generic components in
/// stock-declared order, culture — and each category visits destination wells
/// in matrix row order. Unresolvable sources skip the affected transfers with
/// a warning; they never abort the run.
pub fn generate(
    volumes: &VolumeMatrix,
    levels: &LevelMatrix,
    layouts: &PlateLayouts,
    config: &PlanConfig,
) -> (Vec<PlanItem>, Vec<PlanWarning>) {
    let mut items = Vec::new();
    let mut warnings = Vec::new();

    generate_water(volumes, config, &mut items);
    generate_fixed_dose(volumes, layouts, config, &mut items, &mut warnings);
    generate_components(volumes, levels, layouts, config, &mut items, &mut warnings);
    generate_culture(volumes, layouts, config, &mut items, &mut warnings);

    (items, warnings)
}

fn generate_water(volumes: &VolumeMatrix, config: &PlanConfig, items: &mut Vec<PlanItem>) {
    let source = SourceAddress {
        plate: SourcePlate::WaterReservoir,
        well: config.water_source.clone(),
    };
    for row in &volumes.rows {
        if row.water < config.min_transfer_volume {
            continue;
        }
        items.push(PlanItem::Request(TransferRequest {
            category: TransferCategory::Water,
            column: Column::Water,
            source: source.clone(),
            dest_well: row.well.clone(),
            volume: row.water,
            channel: ChannelSelect::Auto,
            mix_after: None,
        }));
    }
}

fn generate_fixed_dose(
    volumes: &VolumeMatrix,
    layouts: &PlateLayouts,
    config: &PlanConfig,
    items: &mut Vec<PlanItem>,
    warnings: &mut Vec<PlanWarning>,
) {
    let Some(component) = config.policies.fixed_dose_component() else {
        return;
    };
    let Some(idx) = volumes.components.iter().position(|c| *c == component) else {
        return;
    };

    // Resolved once; the fixed-dose reagent always comes from the high plate.
    let source_well = match layouts.high.find(component.as_str()) {
        Some(well) => well.clone(),
        None => {
            tracing::warn!(
                "No source for fixed-dose component '{}' on the high stock plate; skipping the category",
                component
            );
            warnings.push(PlanWarning::CategorySkipped {
                category: TransferCategory::FixedDose,
                reason: format!("no source well for '{}' on the high stock plate", component),
            });
            return;
        }
    };
    let source = SourceAddress {
        plate: SourcePlate::StockHigh,
        well: source_well,
    };

    for row in &volumes.rows {
        let volume = row.by_component[idx];
        if volume < config.min_transfer_volume {
            continue;
        }
        items.push(PlanItem::Request(TransferRequest {
            category: TransferCategory::FixedDose,
            column: Column::Component(component.clone()),
            source: source.clone(),
            dest_well: row.well.clone(),
            volume,
            channel: ChannelSelect::Auto,
            mix_after: None,
        }));
    }
}

fn generate_components(
    volumes: &VolumeMatrix,
    levels: &LevelMatrix,
    layouts: &PlateLayouts,
    config: &PlanConfig,
    items: &mut Vec<PlanItem>,
    warnings: &mut Vec<PlanWarning>,
) {
    let fixed_dose = config.policies.fixed_dose_component();

    for (idx, component) in volumes.components.iter().enumerate() {
        if fixed_dose.as_ref() == Some(component) {
            continue;
        }

        for (row, level_row) in volumes.rows.iter().zip(&levels.rows) {
            let volume = row.by_component[idx];
            if volume < config.min_transfer_volume {
                continue;
            }
            let Some(level) = level_row.levels[idx] else {
                continue;
            };

            let source = match config.policies.policy_for(component) {
                ResolutionPolicy::FixedSource {
                    low_well,
                    high_well,
                } => {
                    // Stored pre-diluted at fixed fresh-plate positions; the
                    // layout tables are not consulted.
                    let well = match level {
                        StockLevel::Low => low_well.clone(),
                        StockLevel::High => high_well.clone(),
                    };
                    SourceAddress {
                        plate: SourcePlate::StockFresh,
                        well,
                    }
                }
                _ => {
                    let layout = layouts.for_level(level);
                    match layout.find(component.as_str()) {
                        Some(well) => SourceAddress {
                            plate: layout.plate,
                            well: well.clone(),
                        },
                        None => {
                            tracing::warn!(
                                "No {} source for component '{}' (destination {}); skipping",
                                level,
                                component,
                                row.well
                            );
                            warnings.push(PlanWarning::UnresolvedSource {
                                well: row.well.clone(),
                                component: component.clone(),
                                level,
                            });
                            continue;
                        }
                    }
                }
            };

            items.push(PlanItem::Request(TransferRequest {
                category: TransferCategory::Component,
                column: Column::Component(component.clone()),
                source,
                dest_well: row.well.clone(),
                volume,
                channel: ChannelSelect::Auto,
                mix_after: None,
            }));
        }
    }
}

fn generate_culture(
    volumes: &VolumeMatrix,
    layouts: &PlateLayouts,
    config: &PlanConfig,
    items: &mut Vec<PlanItem>,
    warnings: &mut Vec<PlanWarning>,
) {
    // Culture is prepared immediately before use; the operator may need to
    // swap plates, so the checkpoint comes before the source is even
    // resolved.
    items.push(PlanItem::Checkpoint {
        message: CULTURE_CHECKPOINT_MESSAGE.to_string(),
    });

    let source_well: Option<&WellId> = layouts.fresh.find(&config.culture_label);
    let Some(source_well) = source_well else {
        tracing::warn!(
            "No '{}' well on the fresh stock plate; skipping the culture category",
            config.culture_label
        );
        warnings.push(PlanWarning::CategorySkipped {
            category: TransferCategory::Culture,
            reason: format!(
                "no '{}' well on the fresh stock plate",
                config.culture_label
            ),
        });
        return;
    };
    let source = SourceAddress {
        plate: SourcePlate::StockFresh,
        well: source_well.clone(),
    };

    let Some(volume) = volumes.culture_volume() else {
        return;
    };
    if volume < config.min_transfer_volume {
        return;
    }

    for row in &volumes.rows {
        items.push(PlanItem::Request(TransferRequest {
            category: TransferCategory::Culture,
            column: Column::Culture,
            source: source.clone(),
            dest_well: row.well.clone(),
            volume,
            channel: ChannelSelect::Auto,
            mix_after: Some(config.culture_mix),
        }));
    }
}
