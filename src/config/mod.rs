#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

use crate::domain::model::{MixAfter, PipetteChannel, PolicyTable, WellId};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PrepError, Result};
use crate::utils::validation::{
    self, validate_non_empty_string, validate_non_negative, validate_positive, validate_well_id,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to do when a destination well's total volume deviates from the
/// configured well volume beyond tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImbalancePolicy {
    /// Record a warning, mark the run degraded, keep planning.
    Warn,
    /// Abort before any instruction generation.
    Fail,
}

impl FromStr for ImbalancePolicy {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(PrepError::InvalidConfigValueError {
                field: "on_imbalance".to_string(),
                value: other.to_string(),
                reason: "Expected 'warn' or 'fail'".to_string(),
            }),
        }
    }
}

/// Immutable parameters of one planning run. Built once from a provider and
/// passed by reference into every planning call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Total volume of each destination well (uL).
    pub well_volume: f64,
    /// Transfers below this volume are never emitted (uL).
    pub min_transfer_volume: f64,
    /// Culture dilution factor; culture dose = well_volume / culture_ratio.
    pub culture_ratio: f64,
    /// Undispensable residual reserved per source well (uL).
    pub dead_volume: f64,
    /// Allowed deviation of a well's total from well_volume (uL).
    pub volume_tolerance: f64,
    pub on_imbalance: ImbalancePolicy,
    /// Reservoir well water is drawn from.
    pub water_source: WellId,
    /// Label of the culture well on the fresh plate.
    pub culture_label: String,
    /// Re-suspension mix after every culture dispense.
    pub culture_mix: MixAfter,
    /// Tips per rack, for rack-count estimates.
    pub rack_capacity: u32,
    pub channels: Vec<PipetteChannel>,
    pub policies: PolicyTable,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            well_volume: 1500.0,
            min_transfer_volume: 1.0,
            culture_ratio: 100.0,
            dead_volume: 100.0,
            volume_tolerance: 0.01,
            on_imbalance: ImbalancePolicy::Warn,
            water_source: WellId::new("A1"),
            culture_label: "Culture".to_string(),
            culture_mix: MixAfter {
                repetitions: 3,
                volume: 10.0,
            },
            rack_capacity: 96,
            channels: vec![
                PipetteChannel {
                    name: "p20".to_string(),
                    max_volume: 20.0,
                },
                PipetteChannel {
                    name: "p300".to_string(),
                    max_volume: 300.0,
                },
            ],
            policies: PolicyTable::standard(),
        }
    }
}

impl Validate for PlanConfig {
    fn validate(&self) -> Result<()> {
        validate_positive("well_volume", self.well_volume)?;
        validate_positive("min_transfer_volume", self.min_transfer_volume)?;
        validation::validate_range("culture_ratio", self.culture_ratio, 1.0, 100_000.0)?;
        validate_non_negative("dead_volume", self.dead_volume)?;
        validate_positive("volume_tolerance", self.volume_tolerance)?;
        validate_well_id("water_source", self.water_source.as_str())?;
        validate_non_empty_string("culture_label", &self.culture_label)?;
        validate_positive("culture_mix.volume", self.culture_mix.volume)?;
        if self.culture_mix.repetitions == 0 {
            return Err(PrepError::InvalidConfigValueError {
                field: "culture_mix.repetitions".to_string(),
                value: "0".to_string(),
                reason: "At least one mix repetition is required".to_string(),
            });
        }
        if self.rack_capacity == 0 {
            return Err(PrepError::InvalidConfigValueError {
                field: "rack_capacity".to_string(),
                value: "0".to_string(),
                reason: "Rack capacity must be at least 1".to_string(),
            });
        }
        if self.channels.is_empty() {
            return Err(PrepError::MissingConfigError {
                field: "channels".to_string(),
            });
        }
        let mut names = std::collections::HashSet::new();
        for channel in &self.channels {
            validate_non_empty_string("channels.name", &channel.name)?;
            validate_positive("channels.max_volume", channel.max_volume)?;
            if !names.insert(channel.name.as_str()) {
                return Err(PrepError::InvalidConfigValueError {
                    field: "channels".to_string(),
                    value: channel.name.clone(),
                    reason: "Duplicate channel name".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Paths of the six input tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    pub stock: String,
    pub standard_recipe: String,
    pub targets: String,
    pub plate_high: String,
    pub plate_low: String,
    pub plate_fresh: String,
}

/// Resolved run settings, whichever provider they came from.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub plan: PlanConfig,
    pub inputs: InputPaths,
    pub output_path: String,
}

impl ConfigProvider for RunSettings {
    fn plan_config(&self) -> &PlanConfig {
        &self.plan
    }

    fn input_paths(&self) -> &InputPaths {
        &self.inputs
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }
}

impl Validate for RunSettings {
    fn validate(&self) -> Result<()> {
        self.plan.validate()?;
        for (field, path) in [
            ("inputs.stock", &self.inputs.stock),
            ("inputs.standard_recipe", &self.inputs.standard_recipe),
            ("inputs.targets", &self.inputs.targets),
            ("inputs.plate_high", &self.inputs.plate_high),
            ("inputs.plate_low", &self.inputs.plate_low),
            ("inputs.plate_fresh", &self.inputs.plate_fresh),
        ] {
            validate_non_empty_string(field, path)?;
        }
        validate_non_empty_string("output_path", &self.output_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_config_is_valid() {
        assert!(PlanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_channels() {
        let mut config = PlanConfig::default();
        config.channels.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_channels() {
        let mut config = PlanConfig::default();
        config.channels.push(PipetteChannel {
            name: "p20".to_string(),
            max_volume: 20.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_imbalance_policy_from_str() {
        assert_eq!(
            "warn".parse::<ImbalancePolicy>().unwrap(),
            ImbalancePolicy::Warn
        );
        assert_eq!(
            "FAIL".parse::<ImbalancePolicy>().unwrap(),
            ImbalancePolicy::Fail
        );
        assert!("ignore".parse::<ImbalancePolicy>().is_err());
    }
}
