//! Rankboard CLI: headless ranking queries and database bootstrap.
//!
//! Commands:
//! - `rank`: run one ranking query, print the table, optionally export it
//! - `init-db`: create the schema, optionally seeded with demo data

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rankboard_core::domain::{format_signed_pct, MAX_TOP_N, MIN_TOP_N};
use rankboard_core::export::export_records;
use rankboard_core::sample_data::{seed_store, SampleSpec};
use rankboard_core::{run_ranking, AppConfig, Frequency, RankedSet, SqliteStore};

#[derive(Parser)]
#[command(
    name = "rankboard",
    about = "Rankboard CLI — stock return rankings from a SQLite returns table"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank instruments by their latest return in a date window.
    Rank {
        /// SQLite database. Overrides `database.path` from the config.
        #[arg(long)]
        db: Option<PathBuf>,

        /// TOML config file. Defaults apply when omitted. Its
        /// `query.include_negative` key is ignored here; use --include-negative.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Return frequency: daily, weekly, monthly, quarterly, yearly.
        #[arg(long)]
        frequency: Option<String>,

        /// Start date (YYYY-MM-DD). Defaults to the configured lookback before --end.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Best and worst N to keep (10-100).
        #[arg(long)]
        top_n: Option<usize>,

        /// Keep instruments whose latest return is zero or negative.
        /// Without this flag only positive returns are ranked.
        #[arg(long, default_value_t = false)]
        include_negative: bool,

        /// Write the result to this path (.csv or .xlsx).
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Create the returns and names tables.
    InitDb {
        /// SQLite database to create or update.
        #[arg(long, default_value = "data/returns.db")]
        db: PathBuf,

        /// Seed deterministic demo prices and returns.
        #[arg(long, default_value_t = false)]
        demo: bool,

        /// Number of demo tickers.
        #[arg(long, default_value_t = 60)]
        tickers: usize,

        /// Random seed for the demo data.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            db,
            config,
            frequency,
            start,
            end,
            top_n,
            include_negative,
            export,
        } => run_rank(RankArgs {
            db,
            config,
            frequency,
            start,
            end,
            top_n,
            include_negative,
            export,
        }),
        Commands::InitDb {
            db,
            demo,
            tickers,
            seed,
        } => run_init_db(db, demo, tickers, seed),
    }
}

/// Log to stderr so stdout carries only the table.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct RankArgs {
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    frequency: Option<String>,
    start: Option<String>,
    end: Option<String>,
    top_n: Option<usize>,
    include_negative: bool,
    export: Option<PathBuf>,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_rank(args: RankArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(db) = args.db {
        config.database.path = db;
    }

    let end = args
        .end
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut params = config.query.params_ending(end);
    if let Some(key) = args.frequency.as_deref() {
        params.frequency = Frequency::from_key(key).with_context(|| {
            format!("unknown frequency '{key}'. Valid: daily, weekly, monthly, quarterly, yearly")
        })?;
    }
    if let Some(start) = args.start.as_deref() {
        params.start_date = parse_date(start)?;
    }
    if let Some(n) = args.top_n {
        if !(MIN_TOP_N..=MAX_TOP_N).contains(&n) {
            bail!("--top-n must be between {MIN_TOP_N} and {MAX_TOP_N}");
        }
        params.top_n = n;
    }
    params.include_negative = args.include_negative;
    params.validate()?;

    let store = SqliteStore::open(&config.database)?;
    let set = run_ranking(
        &store,
        &params,
        config.database.name_placeholder.as_deref(),
        &|message: &str| tracing::info!("{message}"),
    )?;

    if set.is_empty() {
        println!("No data for {}", params.describe());
        return Ok(());
    }
    print_table(&set);

    if let Some(path) = args.export {
        let format = export_records(&set.records, &path)?;
        println!("Exported {} rows as {format:?} to {}", set.len(), path.display());
    }
    Ok(())
}

fn print_table(set: &RankedSet) {
    println!("{}", set.params.describe());
    if set.truncated {
        println!(
            "{} matched; showing the top and bottom {}",
            set.total_matched, set.params.top_n
        );
    }
    println!();
    println!(
        "{:>4}  {:<8} {:<24} {:>9} {:>11} {:>9} {:>6}  {}",
        "#", "Ticker", "Name", "Latest %", "Latest Date", "Avg %", "Points", "Period"
    );
    println!("{}", "─".repeat(100));
    for (i, r) in set.records.iter().enumerate() {
        println!(
            "{:>4}  {:<8} {:<24} {:>9} {:>11} {:>9} {:>6}  {} ~ {}",
            i + 1,
            r.ticker,
            truncate(&r.name, 24),
            format_signed_pct(r.latest_return_pct()),
            r.latest_date,
            format_signed_pct(r.avg_return_pct()),
            r.data_points,
            r.first_date,
            r.last_date,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 1).collect();
        format!("{kept}.")
    }
}

fn run_init_db(db: PathBuf, demo: bool, tickers: usize, seed: u64) -> Result<()> {
    let mut config = AppConfig::default().database;
    config.path = db;
    let mut store = SqliteStore::create(&config)?;
    println!("Schema ready in {}", config.path.display());

    if demo {
        let spec = SampleSpec {
            tickers,
            seed,
            ..SampleSpec::default()
        };
        let (prices, returns) = seed_store(&mut store, &spec)?;
        println!(
            "Seeded {tickers} demo tickers: {prices} price rows, {returns} return rows ({} → {})",
            spec.start, spec.end
        );
    }
    Ok(())
}
