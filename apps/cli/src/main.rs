//! Tickerscope CLI: cache-backed daily price fetching.
//!
//! Commands:
//! - `fetch`: serve daily bars for symbols, from the local cache when complete
//! - `status`: list cached symbols with their date coverage

mod config;
mod main_lib;
mod output;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use main_lib::{build_services, close_store, init_tracing, open_store};
use output::OutputFormat;
use tickerscope_core::prices::{CompletenessPolicy, FetcherConfig, PriceStore};
use tickerscope_core::Error;
use tickerscope_market_data::{AssetClass, DateRange, SymbolClassifier};

#[derive(Parser)]
#[command(
    name = "tickerscope",
    version,
    about = "Cache-backed daily price series from Alpha Vantage"
)]
struct Cli {
    /// SQLite cache file. Overrides TS_DB_PATH.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars for one or more symbols.
    Fetch(FetchArgs),
    /// Report cached symbols and their date ranges.
    Status {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Symbols to fetch (e.g. AAPL BTC-USD GBP-EUR).
    #[arg(required = true)]
    symbols: Vec<String>,

    /// First date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: NaiveDate,

    /// Last date (YYYY-MM-DD), inclusive. Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Treat a range as cached when every weekday has a row.
    #[arg(long, default_value_t = false)]
    weekdays_only: bool,

    /// Force an asset class for a symbol, e.g. --class USDX=equity.
    #[arg(long = "class", value_name = "SYMBOL=CLASS", value_parser = parse_class_override)]
    classes: Vec<(String, AssetClass)>,

    /// Give up on unfinished symbols after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Write output to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_class_override(value: &str) -> std::result::Result<(String, AssetClass), String> {
    let (symbol, class) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=CLASS, got '{}'", value))?;
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(format!("missing symbol in '{}'", value));
    }
    Ok((symbol.to_string(), class.parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_tracing(config.log_format);

    match cli.command {
        Commands::Fetch(args) => run_fetch(&config, args).await,
        Commands::Status { format } => run_status(&config, format),
    }
}

async fn run_fetch(config: &Config, args: FetchArgs) -> Result<()> {
    let end = args
        .end
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let range = DateRange::new(args.start, end)?;

    if config.using_demo_key {
        tracing::warn!("No TS_API_KEY configured; using the public demo key");
    }

    let mut classifier = SymbolClassifier::new();
    for (symbol, class) in args.classes {
        classifier.add_override(symbol, class);
    }
    let completeness = if args.weekdays_only {
        CompletenessPolicy::Weekdays
    } else {
        CompletenessPolicy::CalendarDays
    };

    let services = build_services(config, classifier, FetcherConfig { completeness })?;
    let outcome = match args.deadline_secs {
        Some(secs) => {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
            services
                .fetcher
                .fetch_many_until(&args.symbols, &range, deadline)
                .await
        }
        None => services.fetcher.fetch_many(&args.symbols, &range).await,
    };
    close_store(&services.store);

    let result = match outcome {
        Ok(result) => result,
        Err(Error::NoDataAvailable { failures }) => {
            for failure in &failures {
                eprintln!("  {}", failure);
            }
            bail!("No data available for any requested symbol");
        }
        Err(e) => return Err(e.into()),
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    output::write_result(out.as_mut(), &result, args.format)?;
    out.flush()?;

    if result.failure_count() > 0 {
        eprintln!("Partial result: {}", result.summary());
        for failure in result.failures() {
            eprintln!("  {}", failure);
        }
    }
    tracing::info!("{}", result.summary());
    Ok(())
}

fn run_status(config: &Config, format: OutputFormat) -> Result<()> {
    let store = open_store(&config.db_path)?;
    let summaries = store.summaries()?;
    close_store(&store);

    let mut stdout = io::stdout().lock();
    output::write_summaries(&mut stdout, &summaries, format)?;
    stdout.flush()?;
    Ok(())
}
