use analytics::{FiscalCalendar, parse_reference_instant};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, LogFormat, LoggingSettings};
use core_types::{DisplayRecord, DisplayValue};
use database::DbRepository;
use reporting::{Board, DashboardReporter};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// The main entry point for the loyalty insights service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = configuration::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    // Held until exit so buffered file logs are flushed.
    let _guard = init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Serve => web_server::run_server(config).await,
        Commands::Kpis(args) => handle_kpis(args, config).await,
        Commands::Quarters(args) => handle_quarters(args, &config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Fiscal-quarter KPI reporting for a loyalty program.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `logging.format` from the configuration.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP and WebSocket dashboard server.
    Serve,
    /// Compute a KPI board once and print it.
    Kpis(KpiArgs),
    /// Show the fiscal quarter of an instant and the quarter it is compared against.
    Quarters(QuarterArgs),
}

#[derive(Parser)]
struct KpiArgs {
    /// Reference instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long)]
    at: Option<String>,

    /// Print the engagement board instead of the main one.
    #[arg(long)]
    engagement: bool,

    /// Print the cards as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct QuarterArgs {
    /// Reference instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long)]
    at: Option<String>,

    /// Overrides `reporting.fiscal_year_start_month`.
    #[arg(long)]
    start_month: Option<u32>,
}

// ==============================================================================
// Tracing
// ==============================================================================

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .context("Invalid log filter")?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match settings.format {
        LogFormat::Pretty => fmt::layer().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    });

    let guard = settings.directory.as_ref().map(|directory| {
        let appender = tracing_appender::rolling::daily(directory, "loyalty-insights.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
        guard
    });

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install the tracing subscriber")?;
    Ok(guard)
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn reference_instant(at: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match at {
        Some(at) => Ok(parse_reference_instant(at)?),
        None => Ok(Utc::now()),
    }
}

async fn handle_kpis(args: KpiArgs, config: Config) -> anyhow::Result<()> {
    let reference = reference_instant(args.at.as_deref())?;
    tracing::info!(%reference, engagement = args.engagement, "Computing KPI board");

    let db_pool = database::connect(&config.database).await?;
    let reporter = DashboardReporter::new(DbRepository::from_pool(db_pool), &config.reporting)?;
    let board = if args.engagement {
        reporter.engagement_kpis(reference).await?
    } else {
        reporter.kpis(reference).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        print_board(&board);
    }
    Ok(())
}

fn print_board(board: &Board) {
    println!(
        "{} ({}) compared with {} ({})",
        board.window.current_quarter, board.window.current, board.window.prior_quarter, board.window.prior
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value", "Change", "Trend"]);
    for record in &board.cards {
        table.add_row(card_row(record));
    }
    println!("{table}");
}

fn card_row(record: &DisplayRecord) -> Vec<String> {
    let value = match &record.value {
        DisplayValue::Count(n) => n.to_string(),
        DisplayValue::Number(n) => n.to_string(),
        DisplayValue::Text(text) => text.clone(),
    };
    vec![record.title.clone(), value, record.change.clone(), record.trend.as_str().to_string()]
}

/// Needs no database.
fn handle_quarters(args: QuarterArgs, config: &Config) -> anyhow::Result<()> {
    let reference = reference_instant(args.at.as_deref())?;
    let calendar = FiscalCalendar::new(args.start_month.unwrap_or(config.reporting.fiscal_year_start_month))?;
    let window = calendar.resolve(reference)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["", "Quarter", "Start", "End", "Days"]);
    table.add_row(vec![
        "Current".to_string(),
        window.current_quarter.to_string(),
        window.current.start.to_string(),
        window.current.end.to_string(),
        window.current.num_days().to_string(),
    ]);
    table.add_row(vec![
        "Compared with".to_string(),
        window.prior_quarter.to_string(),
        window.prior.start.to_string(),
        window.prior.end.to_string(),
        window.prior.num_days().to_string(),
    ]);

    println!("Reference instant: {}", reference.to_rfc3339());
    println!("{table}");
    Ok(())
}
