use clap::Parser;
use election_sim::app::runner::{self, RunRequest};
use election_sim::core::prompt::BallotTemplate;
use election_sim::utils::{logger, validation::Validate};
use election_sim::{CancellationSignal, CliConfig};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting election-sim CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let settings = match config.provider_settings() {
        Ok(settings) => settings,
        Err(e) => std::process::exit(runner::report_error(&e)),
    };

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let cancel = CancellationSignal::new();
    runner::spawn_ctrl_c_handler(cancel.clone());

    let request = RunRequest {
        settings,
        options: config.predictor_options(),
        template: BallotTemplate::default(),
        monitor: monitor_enabled,
        cancel,
    };

    let result = runner::run_simulation(config, request).await;
    let exit_code = runner::report_result(&result);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
