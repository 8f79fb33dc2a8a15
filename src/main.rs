use anyhow::{Context, Result};
use atrbox::api::{MarketDataSource, SyntheticSource, YahooClient};
use atrbox::config::AppConfig;
use atrbox::context::AnalysisContext;
use atrbox::error::EvaluationResult;
use atrbox::monitor::{self, Monitor};
use atrbox::report::Report;
use atrbox::risk::RiskSettings;
use atrbox::strategy::Analysis;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_OFFLINE_SEED: u64 = 42;

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(
    name = "atrbox",
    about = "ATR box scalping signals: opening-range box, volatility filter, reversal patterns"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ticker symbol (case-insensitive). Overrides the config file.
    #[arg(long, global = true)]
    symbol: Option<String>,

    /// Use the seeded synthetic data source instead of Yahoo Finance.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Seed for --offline data.
    #[arg(long, global = true, default_value_t = DEFAULT_OFFLINE_SEED)]
    seed: u64,

    /// Print the report as JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Path to a TOML config file. Defaults to ./atrbox.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account size in dollars for position sizing.
    #[arg(long, global = true)]
    account_size: Option<f64>,

    /// Percent of the account risked per trade.
    #[arg(long, global = true)]
    risk_percent: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single evaluation and print the report.
    Analyze,
    /// Re-evaluate on a fixed interval until Ctrl+C.
    Watch {
        /// Seconds between evaluations (30-300).
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    setup_logging(&config.log_filter);

    tracing::info!("🚀 atrbox starting for {}", config.symbol);

    if cli.offline {
        let source = SyntheticSource::new(cli.seed, Utc::now());
        run(&cli, &config, source).await
    } else {
        let source = YahooClient::new(
            config.yahoo.base_url.clone(),
            config.yahoo.timeout(),
            config.yahoo.requests_per_minute,
        )
        .context("failed to create Yahoo client")?;
        run(&cli, &config, source).await
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    if let Some(symbol) = &cli.symbol {
        config.symbol = symbol.clone();
    }
    config.symbol = config.symbol.trim().to_uppercase();

    if let Some(account_size) = cli.account_size {
        config.risk.account_size = account_size;
    }
    if let Some(risk_percent) = cli.risk_percent {
        config.risk.risk_percent = risk_percent;
    }
    if let Commands::Watch {
        interval: Some(secs),
    } = cli.command
    {
        config.refresh_interval_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Commands
// ============================================================================

async fn run<S: MarketDataSource>(cli: &Cli, config: &AppConfig, source: S) -> Result<()> {
    tracing::info!("📡 Data source: {}", source.name());

    let monitor = Monitor::new(source, config.fetch_plan(), config.strategy_config()?);
    let mut ctx = AnalysisContext::new();

    match cli.command {
        Commands::Analyze => {
            let analysis = monitor.run(&mut ctx, &config.symbol, Utc::now()).await?;
            print_report(&analysis, &config.risk, &ctx, cli.json)?;
        }
        Commands::Watch { .. } => {
            tracing::info!("Press Ctrl+C to stop...");

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                }
            };

            let runs = monitor::watch(
                &monitor,
                &mut ctx,
                &config.symbol,
                config.refresh_interval(),
                shutdown,
                |ctx, result| handle_result(result, &config.risk, ctx, cli.json),
            )
            .await;

            tracing::info!("👋 Stopped after {} evaluations", runs);
        }
    }

    Ok(())
}

fn handle_result(
    result: &EvaluationResult<Analysis>,
    risk: &RiskSettings,
    ctx: &AnalysisContext,
    json: bool,
) {
    match result {
        Ok(analysis) => {
            if let Err(e) = print_report(analysis, risk, ctx, json) {
                tracing::error!("Failed to render report: {}", e);
            }
        }
        // Already logged by the monitor; keep watching
        Err(e) => eprintln!("❌ Error: {}", e),
    }
}

fn print_report(
    analysis: &Analysis,
    risk: &RiskSettings,
    ctx: &AnalysisContext,
    json: bool,
) -> Result<()> {
    let report = Report::new(analysis, risk, ctx);

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render_text());
    }

    Ok(())
}
