use crate::config::PlanConfig;
use crate::domain::model::{ChannelUsage, PlanStep, ResourceSummary, SourceUsage};

/// Aggregate the instruction sequence into provisioning totals: volume per
/// source well (dead volume added to every nonzero source), and
/// transfer/tip/rack counts per channel. Sources and channels appear in
/// first-use order. Advisory only.
pub fn summarize(steps: &[PlanStep], config: &PlanConfig) -> ResourceSummary {
    let mut sources: Vec<SourceUsage> = Vec::new();
    let mut channels: Vec<ChannelUsage> = Vec::new();

    for step in steps {
        let PlanStep::Transfer(t) = step else {
            continue;
        };

        match sources.iter_mut().find(|s| s.source == t.source) {
            Some(usage) => usage.volume += t.volume,
            None => sources.push(SourceUsage {
                source: t.source.clone(),
                label: t.column.label().to_string(),
                volume: t.volume,
            }),
        }

        match channels.iter_mut().find(|c| c.channel == t.channel) {
            Some(usage) => usage.transfers += 1,
            None => channels.push(ChannelUsage {
                channel: t.channel.clone(),
                transfers: 1,
                tips: 0,
                racks: 0,
            }),
        }
    }

    for usage in &mut sources {
        if usage.volume > 0.0 {
            usage.volume += config.dead_volume;
        }
    }
    for usage in &mut channels {
        // One fresh tip per instruction.
        usage.tips = usage.transfers;
        usage.racks = usage.transfers.div_ceil(config.rack_capacity);
    }

    ResourceSummary { sources, channels }
}
