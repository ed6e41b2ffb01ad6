//! TrendPlan CLI — turn market data and a model output into a trading plan.
//!
//! Commands:
//! - `plan` — plan one JSON request (candles or price points + model output)
//! - `csv` — plan candles from a CSV file with a model output given inline
//! - `features` — dump the derived feature rows as CSV
//! - `batch` — plan every request file in a directory in parallel
//! - `profiles` — print the active timeframe profile table as TOML
//!
//! Logs go to stderr (`RUST_LOG` overrides the default filter) so stdout
//! carries only the JSON or CSV result.

mod batch;
mod csv_io;
mod request;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use trendplan_core::profile::DEFAULT_TIMEFRAME;
use trendplan_core::{
    derive_features, Candle, ModelOutput, PlanError, Planner, ProfileTable, TradingPlan,
};

#[derive(Parser)]
#[command(
    name = "trendplan",
    about = "TrendPlan CLI — indicator-scored trading plans from model outputs"
)]
struct Cli {
    /// TOML file replacing the built-in timeframe profiles.
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a single JSON request. Exits with status 1 if the plan is degraded.
    Plan {
        /// Request file, or `-` for stdin.
        #[arg(long)]
        input: PathBuf,

        /// Pretty-print the response.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Plan candles read from CSV (timestamp,open,high,low,close,volume).
    Csv {
        /// Candle CSV file.
        #[arg(long)]
        candles: PathBuf,

        /// Timeframe label (5m, 15m, 1h, 4h, 1d).
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,

        /// Model output: one probability, or SHORT,WAIT,LONG probabilities.
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        model_output: Vec<f64>,

        /// Pretty-print the plan.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Write derived feature rows for a candle CSV to stdout.
    Features {
        /// Candle CSV file.
        #[arg(long)]
        candles: PathBuf,

        /// Only the last N rows.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Plan every `*.json` request in a directory, writing `<stem>.plan.json`.
    Batch {
        #[arg(long)]
        dir: PathBuf,
    },
    /// Print the active profile table as TOML.
    Profiles,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trendplan=info,trendplan_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let custom;
    let table = match &cli.profiles {
        Some(path) => {
            custom = ProfileTable::from_file(path)
                .with_context(|| format!("failed to load profiles from {}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded profile table");
            &custom
        }
        None => ProfileTable::builtin(),
    };
    let planner = Planner::new(table);

    match cli.command {
        Commands::Plan { input, pretty } => run_plan(&input, pretty, &planner),
        Commands::Csv {
            candles,
            timeframe,
            model_output,
            pretty,
        } => run_csv(&candles, &timeframe, &model_output, pretty, &planner),
        Commands::Features { candles, tail } => run_features(&candles, tail),
        Commands::Batch { dir } => run_batch_cmd(&dir, &planner),
        Commands::Profiles => run_profiles(table),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read request from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("failed to serialize plan")
}

fn run_plan(input: &Path, pretty: bool, planner: &Planner) -> Result<()> {
    let raw = read_input(input)?;
    let response = request::handle_request(&raw, planner);
    println!("{}", to_json(&response, pretty)?);
    if response.is_degraded() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_csv(
    path: &Path,
    timeframe: &str,
    model_output: &[f64],
    pretty: bool,
    planner: &Planner,
) -> Result<()> {
    let plan = plan_csv(path, timeframe, model_output, planner);
    println!("{}", to_json(&plan, pretty)?);
    if plan.is_degraded() {
        std::process::exit(1);
    }
    Ok(())
}

/// Plan a candle CSV. Never fails: unreadable files and malformed model
/// outputs become a degraded plan.
fn plan_csv(
    path: &Path,
    timeframe: &str,
    model_output: &[f64],
    planner: &Planner,
) -> TradingPlan {
    let candles = match read_candle_file(path) {
        Ok(candles) => candles,
        Err(e) => {
            let err = PlanError::InvalidTimeframeData(format!("{e:#}"));
            tracing::warn!(error = %err, "rejecting candle file");
            return TradingPlan::degraded(timeframe, &[], &err);
        }
    };
    match ModelOutput::from_values(model_output) {
        Ok(output) => planner.plan_or_degraded(&candles, timeframe, &output),
        Err(err) => {
            tracing::warn!(error = %err, "rejecting model output");
            TradingPlan::degraded(timeframe, &candles, &err)
        }
    }
}

fn read_candle_file(path: &Path) -> Result<Vec<Candle>> {
    let file =
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    csv_io::read_candles(file)
}

fn run_features(path: &Path, tail: Option<usize>) -> Result<()> {
    let candles = read_candle_file(path)?;
    let rows = derive_features(&candles)?;
    let skip = tail.map_or(0, |n| rows.len().saturating_sub(n));
    csv_io::write_features(&rows[skip..], std::io::stdout().lock())
}

fn run_batch_cmd(dir: &Path, planner: &Planner) -> Result<()> {
    let summary = batch::run_batch(dir, planner)?;
    println!(
        "Planned: {}  Degraded: {}  Failed: {}",
        summary.planned,
        summary.degraded,
        summary.failed.len()
    );
    for (path, err) in &summary.failed {
        eprintln!("Error for {}: {err}", path.display());
    }
    if !summary.failed.is_empty() {
        bail!("{} request file(s) failed", summary.failed.len());
    }
    Ok(())
}

fn run_profiles(table: &ProfileTable) -> Result<()> {
    let toml = table.to_toml().context("failed to render profile table")?;
    print!("{toml}");
    Ok(())
}
