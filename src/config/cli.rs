use super::{ImbalancePolicy, InputPaths, PlanConfig, RunSettings};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "mediaprep")]
#[command(about = "Plans automated liquid-handling runs for media optimization")]
pub struct CliConfig {
    /// TOML run configuration; overrides the individual path options
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, default_value = "./csv_inputs/stock_concentrations.csv")]
    pub stock: String,

    #[arg(
        long,
        default_value = "./csv_inputs/standard_recipe_concentrations.csv"
    )]
    pub recipe: String,

    #[arg(long, default_value = "./csv_inputs/target_concentrations.csv")]
    pub targets: String,

    #[arg(long, default_value = "./csv_inputs/24-well_stock_plate_high.csv")]
    pub plate_high: String,

    #[arg(long, default_value = "./csv_inputs/24-well_stock_plate_low.csv")]
    pub plate_low: String,

    #[arg(long, default_value = "./csv_inputs/24-well_stock_plate_fresh.csv")]
    pub plate_fresh: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Abort on a volume imbalance instead of warning
    #[arg(long)]
    pub strict: bool,

    /// Drive the simulated executor after planning
    #[arg(long)]
    pub execute: bool,

    /// Make the culture checkpoint wait for operator input
    #[arg(long)]
    pub interactive: bool,

    /// Emit JSON-formatted logs
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,
}

impl CliConfig {
    pub fn to_settings(&self) -> RunSettings {
        let mut plan = PlanConfig::default();
        if self.strict {
            plan.on_imbalance = ImbalancePolicy::Fail;
        }
        RunSettings {
            plan,
            inputs: InputPaths {
                stock: self.stock.clone(),
                standard_recipe: self.recipe.clone(),
                targets: self.targets.clone(),
                plate_high: self.plate_high.clone(),
                plate_low: self.plate_low.clone(),
                plate_fresh: self.plate_fresh.clone(),
            },
            output_path: self.output_path.clone(),
        }
    }
}
