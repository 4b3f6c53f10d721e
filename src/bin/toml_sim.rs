use clap::Parser;
use election_sim::app::runner::{self, RunRequest};
use election_sim::core::comparison::{load_electoral_votes, load_historical};
use election_sim::core::loader::{default_profiles, load_profiles_from_path};
use election_sim::core::ConfigProvider;
use election_sim::utils::{logger, validation::Validate};
use election_sim::{CancellationSignal, Result, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-sim")]
#[command(about = "Election simulation driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "election-sim.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the model from config
    #[arg(long)]
    model: Option<String>,

    /// Load and check inputs, print the plan, but call no provider
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    logger::init_logger(args.verbose, args.json_logs);

    tracing::info!("🚀 Starting TOML-based election simulation");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Some(model) = args.model.clone() {
        tracing::info!("🔧 Model overridden to: {}", model);
        config.simulation.model = model;
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no provider calls will be made");
        if let Err(e) = perform_dry_run(&config) {
            std::process::exit(runner::report_error(&e));
        }
        return;
    }

    let settings = match config.provider_settings() {
        Ok(settings) => settings,
        Err(e) => std::process::exit(runner::report_error(&e)),
    };

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let cancel = CancellationSignal::new();
    runner::spawn_ctrl_c_handler(cancel.clone());

    let request = RunRequest {
        settings,
        options: config.predictor_options(),
        template: config.ballot.clone(),
        monitor: monitor_enabled,
        cancel,
    };

    let result = runner::run_simulation(config, request).await;
    let exit_code = runner::report_result(&result);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Model: {}", config.model());
    println!(
        "  Ballot: {} ({} vs {})",
        config.ballot.election_year, config.ballot.democratic_ticket, config.ballot.republican_ticket
    );
    println!("  Profiles: {}", config.input_path().unwrap_or("built-in sample"));
    println!("  Provider: {}", config.provider.base_url);
    println!("  API key variable: {}", config.provider.api_key_env);
    println!("  Concurrency: {}", config.concurrency());
    println!("  Repetitions per profile: {}", config.repetitions());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let batch = match config.input_path() {
        Some(path) => load_profiles_from_path(path)?,
        None => default_profiles(),
    };
    println!("📥 Profiles:");
    println!("  Valid rows: {}", batch.len());
    println!("  Skipped rows: {}", batch.skipped.len());
    for skipped in &batch.skipped {
        println!("    line {}: {}", skipped.line, skipped.reason);
    }

    let mut states: Vec<_> = batch.profiles.iter().map(|p| p.state).collect();
    states.sort();
    states.dedup();
    println!("  States covered: {}", states.len());

    let repetitions = config.repetitions().max(1) as usize;
    println!();
    println!("📡 Provider Plan:");
    println!(
        "  Calls without retries: {} ({} profile(s) x {} repetition(s))",
        batch.len() * repetitions,
        batch.len(),
        repetitions
    );
    println!(
        "  Max attempts per call: {}, timeout {}s",
        config.provider.max_attempts, config.provider.timeout_seconds
    );
    if config.provider.request_interval_ms > 0 {
        println!(
            "  Throttle: one request start every {} ms",
            config.provider.request_interval_ms
        );
    }
    let key_present = std::env::var(&config.provider.api_key_env)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false);
    println!(
        "  API key variable {}: {}",
        config.provider.api_key_env,
        if key_present { "set" } else { "NOT set" }
    );

    if let Some(path) = config.historical_path() {
        let historical = load_historical(path)?;
        println!();
        println!("📜 Historical results: {} state(s)", historical.len());
    }

    if let Some(path) = config.electoral_votes_path() {
        let votes = load_electoral_votes(path)?;
        println!(
            "⚖️ Electoral votes: {} across {} state(s)",
            votes.total(),
            votes.len()
        );
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if config.compress_output() {
        println!("  Compression: simulation_output.zip (ZIP)");
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during an actual run.");
    Ok(())
}
