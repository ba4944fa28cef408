use super::{ImbalancePolicy, InputPaths, PlanConfig, RunSettings};
use crate::domain::model::{ComponentId, PipetteChannel, PolicyTable, ResolutionPolicy, WellId};
use crate::utils::error::{PrepError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunInfo,
    pub plan: Option<PlanSection>,
    pub culture: Option<CultureSection>,
    pub pipettes: Option<Vec<PipetteSection>>,
    pub inputs: InputsSection,
    pub policies: Option<PoliciesSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSection {
    pub well_volume: Option<f64>,
    pub min_transfer_volume: Option<f64>,
    pub culture_ratio: Option<f64>,
    pub dead_volume: Option<f64>,
    pub volume_tolerance: Option<f64>,
    pub on_imbalance: Option<String>,
    pub water_source: Option<String>,
    pub rack_capacity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CultureSection {
    pub label: Option<String>,
    pub mix_repetitions: Option<u32>,
    pub mix_volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipetteSection {
    pub name: String,
    pub max_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsSection {
    pub stock: String,
    pub standard_recipe: String,
    pub targets: String,
    pub plate_high: String,
    pub plate_low: String,
    pub plate_fresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoliciesSection {
    pub fixed_dose: Option<String>,
    pub fresh_source: Option<FreshSourceSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshSourceSection {
    pub component: String,
    pub low_well: String,
    pub high_well: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub path: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PrepError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PrepError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR_NAME}` references with environment values; unknown
    /// variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Fold the file's sections over the built-in defaults.
    pub fn to_settings(&self) -> Result<RunSettings> {
        let mut plan = PlanConfig::default();

        if let Some(section) = &self.plan {
            if let Some(v) = section.well_volume {
                plan.well_volume = v;
            }
            if let Some(v) = section.min_transfer_volume {
                plan.min_transfer_volume = v;
            }
            if let Some(v) = section.culture_ratio {
                plan.culture_ratio = v;
            }
            if let Some(v) = section.dead_volume {
                plan.dead_volume = v;
            }
            if let Some(v) = section.volume_tolerance {
                plan.volume_tolerance = v;
            }
            if let Some(v) = &section.on_imbalance {
                plan.on_imbalance = v.parse::<ImbalancePolicy>()?;
            }
            if let Some(v) = &section.water_source {
                plan.water_source = WellId::new(v.as_str());
            }
            if let Some(v) = section.rack_capacity {
                plan.rack_capacity = v;
            }
        }

        if let Some(section) = &self.culture {
            if let Some(v) = &section.label {
                plan.culture_label = v.clone();
            }
            if let Some(v) = section.mix_repetitions {
                plan.culture_mix.repetitions = v;
            }
            if let Some(v) = section.mix_volume {
                plan.culture_mix.volume = v;
            }
        }

        if let Some(pipettes) = &self.pipettes {
            plan.channels = pipettes
                .iter()
                .map(|p| PipetteChannel {
                    name: p.name.clone(),
                    max_volume: p.max_volume,
                })
                .collect();
        }

        if let Some(section) = &self.policies {
            let mut table = PolicyTable::new();
            if let Some(id) = &section.fixed_dose {
                table.insert(ComponentId::new(id.as_str()), ResolutionPolicy::FixedDose);
            }
            if let Some(fresh) = &section.fresh_source {
                table.insert(
                    ComponentId::new(fresh.component.as_str()),
                    ResolutionPolicy::FixedSource {
                        low_well: WellId::new(fresh.low_well.as_str()),
                        high_well: WellId::new(fresh.high_well.as_str()),
                    },
                );
            }
            plan.policies = table;
        }

        let settings = RunSettings {
            plan,
            inputs: InputPaths {
                stock: self.inputs.stock.clone(),
                standard_recipe: self.inputs.standard_recipe.clone(),
                targets: self.inputs.targets.clone(),
                plate_high: self.inputs.plate_high.clone(),
                plate_low: self.inputs.plate_low.clone(),
                plate_fresh: self.inputs.plate_fresh.clone(),
            },
            output_path: self
                .output
                .as_ref()
                .and_then(|o| o.path.clone())
                .unwrap_or_else(|| "./output".to_string()),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_settings().map(|_| ())
    }
}
