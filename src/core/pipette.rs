use crate::domain::model::{ChannelSelect, PipetteChannel, TransferInstruction, TransferRequest};
use crate::utils::error::{PrepError, Result};

/// Assign a pipette channel to a logical transfer and split it into atomic
/// instructions.
///
/// Volumes below `min_transfer_volume` produce no instructions — upstream
/// filters already drop them, but this is the authoritative gate. Auto
/// selection picks the smallest-capacity channel that can deliver the volume
/// in one transfer; when none can, the largest channel delivers it as
/// `ceil(volume / max)` equal sub-transfers. Each instruction uses its own
/// fresh tip. A split drops the request's mix action, as the host protocol
/// does.
pub fn allocate(
    request: &TransferRequest,
    channels: &[PipetteChannel],
    min_transfer_volume: f64,
) -> Result<Vec<TransferInstruction>> {
    if request.volume < min_transfer_volume {
        return Ok(Vec::new());
    }

    let channel = match &request.channel {
        ChannelSelect::Auto => auto_select(channels, request.volume)?,
        ChannelSelect::Channel(name) => {
            channels.iter().find(|c| &c.name == name).ok_or_else(|| {
                PrepError::UnknownChannelError {
                    channel: name.clone(),
                }
            })?
        }
    };

    if request.volume <= channel.max_volume {
        return Ok(vec![instruction(request, channel, request.volume, true)]);
    }

    let count = (request.volume / channel.max_volume).ceil() as u32;
    let per_transfer = request.volume / count as f64;
    Ok((0..count)
        .map(|_| instruction(request, channel, per_transfer, false))
        .collect())
}

fn auto_select(channels: &[PipetteChannel], volume: f64) -> Result<&PipetteChannel> {
    let mut by_capacity: Vec<&PipetteChannel> = channels.iter().collect();
    by_capacity.sort_by(|a, b| {
        a.max_volume
            .partial_cmp(&b.max_volume)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    by_capacity
        .iter()
        .find(|c| c.max_volume >= volume)
        .or_else(|| by_capacity.last())
        .copied()
        .ok_or_else(|| PrepError::MissingConfigError {
            field: "channels".to_string(),
        })
}

fn instruction(
    request: &TransferRequest,
    channel: &PipetteChannel,
    volume: f64,
    keep_mix: bool,
) -> TransferInstruction {
    TransferInstruction {
        category: request.category,
        column: request.column.clone(),
        source: request.source.clone(),
        dest_well: request.dest_well.clone(),
        volume,
        channel: channel.name.clone(),
        mix_after: if keep_mix { request.mix_after } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Column, MixAfter, SourceAddress, SourcePlate, TransferCategory, WellId,
    };

    fn channels() -> Vec<PipetteChannel> {
        vec![
            PipetteChannel {
                name: "p20".to_string(),
                max_volume: 20.0,
            },
            PipetteChannel {
                name: "p300".to_string(),
                max_volume: 300.0,
            },
        ]
    }

    fn request(volume: f64, channel: ChannelSelect) -> TransferRequest {
        TransferRequest {
            category: TransferCategory::Component,
            column: Column::Component(crate::domain::model::ComponentId::new("Glc")),
            source: SourceAddress {
                plate: SourcePlate::StockHigh,
                well: WellId::new("A1"),
            },
            dest_well: WellId::new("B2"),
            volume,
            channel,
            mix_after: None,
        }
    }

    #[test]
    fn test_below_threshold_produces_nothing() {
        let out = allocate(&request(0.5, ChannelSelect::Auto), &channels(), 1.0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_auto_picks_smallest_fitting_channel() {
        let out = allocate(&request(15.0, ChannelSelect::Auto), &channels(), 1.0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channel, "p20");

        // Exactly at capacity still fits the small channel.
        let out = allocate(&request(20.0, ChannelSelect::Auto), &channels(), 1.0).unwrap();
        assert_eq!(out[0].channel, "p20");

        let out = allocate(&request(250.0, ChannelSelect::Auto), &channels(), 1.0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channel, "p300");
    }

    #[test]
    fn test_oversized_volume_splits_equally() {
        let small = vec![PipetteChannel {
            name: "p20".to_string(),
            max_volume: 20.0,
        }];
        let out = allocate(&request(45.0, ChannelSelect::Auto), &small, 1.0).unwrap();
        assert_eq!(out.len(), 3);
        for sub in &out {
            assert!((sub.volume - 15.0).abs() < 1e-9);
            assert_eq!(sub.channel, "p20");
        }
    }

    #[test]
    fn test_explicit_channel_override() {
        let out = allocate(
            &request(5.0, ChannelSelect::Channel("p300".to_string())),
            &channels(),
            1.0,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channel, "p300");

        let err = allocate(
            &request(5.0, ChannelSelect::Channel("p1000".to_string())),
            &channels(),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::UnknownChannelError { .. }));
    }

    #[test]
    fn test_split_drops_mix() {
        let mut req = request(45.0, ChannelSelect::Channel("p20".to_string()));
        req.mix_after = Some(MixAfter {
            repetitions: 3,
            volume: 10.0,
        });
        let out = allocate(&req, &channels(), 1.0).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|i| i.mix_after.is_none()));

        let mut req = request(15.0, ChannelSelect::Auto);
        req.mix_after = Some(MixAfter {
            repetitions: 3,
            volume: 10.0,
        });
        let out = allocate(&req, &channels(), 1.0).unwrap();
        assert_eq!(out[0].mix_after, req.mix_after);
    }
}
