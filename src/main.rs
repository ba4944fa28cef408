use clap::Parser;
use mediaprep::adapters::{report, tables};
use mediaprep::config::toml_config::TomlConfig;
use mediaprep::config::RunSettings;
use mediaprep::domain::model::{ConcentrationModel, PlanOutcome, PlanStep};
use mediaprep::domain::ports::ConfigProvider;
use mediaprep::utils::{logger, validation::Validate};
use mediaprep::{plan_run, CliConfig, LocalStorage, ProtocolRunner, SimulatedExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting mediaprep");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    match run(&cli, &settings).await {
        Ok(outcome) => {
            print_summary(&outcome);
            if outcome.degraded {
                tracing::warn!("Run completed degraded; review the warning list");
            }
        }
        Err(e) => {
            tracing::error!(
                "Planning failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                mediaprep::utils::error::ErrorSeverity::Low => 0,
                mediaprep::utils::error::ErrorSeverity::Medium => 2,
                mediaprep::utils::error::ErrorSeverity::High => 1,
                mediaprep::utils::error::ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn resolve_settings(cli: &CliConfig) -> mediaprep::Result<RunSettings> {
    let settings = match &cli.config {
        Some(path) => TomlConfig::from_file(path)?.to_settings()?,
        None => cli.to_settings(),
    };
    settings.validate()?;
    Ok(settings)
}

async fn run(cli: &CliConfig, settings: &RunSettings) -> mediaprep::Result<PlanOutcome> {
    let input_storage = LocalStorage::unrooted();
    let (stock, recipe, targets, layouts) =
        tables::load_inputs(&input_storage, settings.input_paths()).await?;
    tracing::info!(
        "Loaded {} stock components, {} destination wells",
        stock.len(),
        targets.rows().len()
    );

    let model = ConcentrationModel::assemble(stock, &recipe, targets, &settings.plan.policies)?;
    let outcome = plan_run(&model, &layouts, settings.plan_config())?;

    let output_storage = LocalStorage::new(settings.output_path().to_string());
    report::write_outputs(&output_storage, &outcome).await?;

    if cli.execute {
        let runner = ProtocolRunner::new(SimulatedExecutor::new(cli.interactive));
        runner.run(&outcome.steps).await?;
    }

    Ok(outcome)
}

fn print_summary(outcome: &PlanOutcome) {
    let transfers = outcome
        .steps
        .iter()
        .filter(|s| matches!(s, PlanStep::Transfer(_)))
        .count();

    println!(
        "✅ Plan ready: {} wells, {} transfers",
        outcome.volumes.rows.len(),
        transfers
    );
    for usage in &outcome.resources.sources {
        println!(
            "   {} ({}): {:.0} uL",
            usage.source, usage.label, usage.volume
        );
    }
    for usage in &outcome.resources.channels {
        println!(
            "   {}: {} transfers, {} tips, {} racks",
            usage.channel, usage.transfers, usage.tips, usage.racks
        );
    }
    for warning in &outcome.warnings {
        println!("⚠️  {}", warning);
    }
}
