// 🧭 state-risk CLI
// score | trend | breakdown over CSV inputs

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use state_risk::{
    load_sources, normalize_state, open_database, save_report, InsuranceSelection, RiskPipeline,
    RiskReport, ScoringConfig, SourcePaths, StateCode,
};

#[derive(Parser, Debug)]
#[command(
    name = "state-risk",
    about = "Score US states on insurance cost and disaster exposure",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank every state by composite risk score
    Score {
        #[command(flatten)]
        inputs: InputArgs,

        /// Save the scored run to this SQLite database
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },

    /// Premium trend of one state against the national trend
    Trend {
        #[command(flatten)]
        inputs: InputArgs,

        /// State code or name
        #[arg(long)]
        state: String,

        /// Baseline year [default: from config]
        #[arg(long)]
        base_year: Option<i32>,
    },

    /// Disaster counts by incident category for one state
    Breakdown {
        #[command(flatten)]
        inputs: InputArgs,

        /// State code or name
        #[arg(long)]
        state: String,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Auto insurance CSV (state, avg_<year>...)
    #[arg(long, value_name = "FILE")]
    auto: Option<PathBuf>,

    /// Home insurance CSV (state, avg_annual_usd, source_year)
    #[arg(long, value_name = "FILE")]
    home: Option<PathBuf>,

    /// Disaster declarations CSV
    #[arg(long, value_name = "FILE")]
    disasters: Option<PathBuf>,

    /// Weather observations CSV
    #[arg(long, value_name = "FILE")]
    weather: Option<PathBuf>,

    /// Scoring config JSON [default: built-in three-factor weights]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Which insurance table drives the run
    #[arg(long, default_value = "auto")]
    insurance: InsuranceArg,

    /// Auto premium year [default: last configured year]
    #[arg(long)]
    year: Option<i32>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InsuranceArg {
    Auto,
    Home,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Score { inputs, db } => {
            let report = run(&inputs, load_config(&inputs)?)?;
            print_scores(&report, inputs.json)?;

            if let Some(path) = db {
                let conn = open_database(&path)?;
                if save_report(&conn, &report)? {
                    eprintln!("✓ Snapshot saved to {}", path.display());
                } else {
                    eprintln!("✓ Snapshot already stored in {}", path.display());
                }
            }
        }
        Command::Trend {
            inputs,
            state,
            base_year,
        } => {
            let state = parse_state(&state)?;
            let config = load_config(&inputs)?;
            let base_year = base_year.unwrap_or(config.trend_base_year);
            let report = run(&inputs, config)?;
            print_trend(&report, state, base_year, inputs.json)?;
        }
        Command::Breakdown { inputs, state } => {
            let state = parse_state(&state)?;
            let report = run(&inputs, load_config(&inputs)?)?;
            print_breakdown(&report, state, inputs.json)?;
        }
    }

    Ok(())
}

// ============================================================================
// RUN
// ============================================================================

fn load_config(inputs: &InputArgs) -> Result<ScoringConfig> {
    match &inputs.config {
        Some(path) => ScoringConfig::from_file(path),
        None => Ok(ScoringConfig::default()),
    }
}

fn run(inputs: &InputArgs, config: ScoringConfig) -> Result<RiskReport> {
    let selection = match inputs.insurance {
        InsuranceArg::Auto => InsuranceSelection::Auto {
            year: inputs.year.unwrap_or(config.auto_years.end),
        },
        InsuranceArg::Home => InsuranceSelection::Home,
    };

    let tables = load_sources(&SourcePaths {
        auto: inputs.auto.clone(),
        home: inputs.home.clone(),
        disasters: inputs.disasters.clone(),
        weather: inputs.weather.clone(),
    })?;

    let report = RiskPipeline::new(config)?
        .run(&tables, selection)
        .with_context(|| format!("Failed to score {} insurance", selection))?;

    Ok(report)
}

fn parse_state(raw: &str) -> Result<StateCode> {
    normalize_state(raw).ok_or_else(|| anyhow!("Unknown state: {}", raw))
}

// ============================================================================
// OUTPUT
// ============================================================================

fn print_scores(report: &RiskReport, json: bool) -> Result<()> {
    let ranked = report.ranked();

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    println!("📊 {} risk ranking", report.selection);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:>4}  {:<5} {:>12} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "#", "State", "Premium", "Disasters", "Prem idx", "Sev idx", "Wx idx", "Risk"
    );

    for (rank, row) in ranked.iter().enumerate() {
        println!(
            "{:>4}  {:<5} {:>12.2} {:>10} {:>10.2} {:>10.2} {:>10.2} {:>8.3}",
            rank + 1,
            row.state.code(),
            row.average_premium,
            row.disaster_count,
            row.premium_index,
            row.severity_index,
            row.weather_index,
            row.risk_score
        );
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", report.diagnostics.summary());
    println!("Digest: {}", report.digest);

    Ok(())
}

fn print_trend(report: &RiskReport, state: StateCode, base_year: i32, json: bool) -> Result<()> {
    let series = report.trend_series(state, base_year);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    let fmt = |v: Option<f64>| v.map(|x| format!("{:.3}", x)).unwrap_or_else(|| "-".to_string());

    println!("📈 {} premium trend (base {})", state.name(), base_year);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:>6} {:>10} {:>10}", "Year", state.code(), "National");
    for point in &series {
        println!(
            "{:>6} {:>10} {:>10}",
            point.year,
            fmt(point.state_index),
            fmt(point.national_index)
        );
    }

    Ok(())
}

fn print_breakdown(report: &RiskReport, state: StateCode, json: bool) -> Result<()> {
    let entries = report.breakdown(state);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("🌪️  {} incidents by category", state.name());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━");
    for entry in &entries {
        println!("{:<14} {:>8}", entry.category.name(), entry.count);
    }

    Ok(())
}
