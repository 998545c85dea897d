//! slotcast CLI: forecasts delivery-slot availability with AWS Forecast.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use slotcast::service::aws::AwsForecastService;
use slotcast::{CliArgs, Config, ForecastServiceRef, SlotcastPipeline, init_tracing, run_pipelines};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let paths = args.config_paths();
    if paths.is_empty() {
        eprintln!("Error: no config files or directories specified");
        return ExitCode::FAILURE;
    }

    info!("Loading config from {} source(s)", paths.len());

    let mut config = match Config::from_paths(&paths) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.select_pipelines(&args.pipelines) {
        eprintln!("Failed to select pipelines: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting slotcast with {} pipeline(s)", config.pipeline_count());

    for (pipeline_key, pipeline_config) in config.pipelines() {
        info!(
            "  Pipeline: {} ({} {} -> {})",
            pipeline_key,
            pipeline_config.granularity.as_str(),
            pipeline_config.input_path.display(),
            pipeline_config.output_dir.display()
        );
    }

    let service: ForecastServiceRef =
        Arc::new(AwsForecastService::from_env(config.service.region.clone()).await);

    let result = run_pipelines(
        &config.metrics.address,
        &config.global,
        "pipeline",
        |context| SlotcastPipeline::from_config(&config, service, context),
    )
    .await;

    match result {
        Ok(summary) if summary.all_succeeded() => ExitCode::SUCCESS,
        Ok(summary) => {
            eprintln!(
                "{} pipeline(s) failed, {} skipped",
                summary.failed, summary.skipped
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
