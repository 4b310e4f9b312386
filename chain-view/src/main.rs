//! Options chain viewer.
//!
//! Derives the filtered, sorted and call/put-paired view of an options chain
//! from a directory of JSON record exports, with summary statistics, chart
//! projections and CSV/JSON export.
//!
//! # Usage
//!
//! ```bash
//! # List underlying symbols present in the data
//! chain-view --data-dir data/options symbols
//!
//! # Show the chain for one symbol, puts only, sorted by open interest
//! chain-view view --symbol BTCQ --type put --sort open_interest --desc
//!
//! # Export the current view
//! chain-view export --symbol BTCQ --format csv --output exports
//!
//! # Export every record stored today (UTC) as delivered
//! chain-view export-all --output exports
//!
//! # ... or the records stored on a given day
//! chain-view export-all --date 2024-01-02
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::warn;

use chain_view::analytics::Analytics;
use chain_view::export::{self, BulkExport, ViewExport};
use chain_view::{
    ChainConfig, DerivedView, FilterSpec, JsonFileSource, OptionType, RecordSource, SortField,
    SortSpec, ViewState, Workspace,
};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "chain-view")]
#[command(about = "Filter, sort, pair and summarize options chains")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of JSON record files (overrides the configuration)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the underlying symbols in the data directory
    Symbols,

    /// Print statistics, analytics and the organized chain for a symbol
    View {
        #[arg(short, long)]
        symbol: String,

        #[command(flatten)]
        view: ViewArgs,

        /// Maximum number of chain rows to print
        #[arg(long, default_value_t = 50)]
        rows: usize,
    },

    /// Export the current view of a symbol
    Export {
        #[arg(short, long)]
        symbol: String,

        #[command(flatten)]
        view: ViewArgs,

        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output directory
        #[arg(short, long, default_value = "exports")]
        output: PathBuf,
    },

    /// Export every record stored on one day, unfiltered
    ExportAll {
        /// Storage day to export (YYYY-MM-DD, defaults to today in UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output directory
        #[arg(short, long, default_value = "exports")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

/// Filter and sort options shared by `view` and `export`.
#[derive(Args)]
struct ViewArgs {
    /// Only calls or only puts
    #[arg(long = "type")]
    quote_type: Option<OptionType>,

    /// Earliest expiration (YYYY-MM-DD)
    #[arg(long)]
    date_min: Option<NaiveDate>,

    /// Latest expiration (YYYY-MM-DD)
    #[arg(long)]
    date_max: Option<NaiveDate>,

    #[arg(long)]
    strike_min: Option<Decimal>,

    #[arg(long)]
    strike_max: Option<Decimal>,

    /// Minimum implied volatility, in percent
    #[arg(long)]
    iv_min: Option<f64>,

    /// Maximum implied volatility, in percent
    #[arg(long)]
    iv_max: Option<f64>,

    /// Weekly (true) or standard (false) expirations only
    #[arg(long)]
    weekly: Option<bool>,

    /// Field to sort on
    #[arg(long, default_value = "expirationDate")]
    sort: SortField,

    /// Sort descending
    #[arg(long)]
    desc: bool,
}

impl ViewArgs {
    fn state(&self) -> ViewState {
        let mut filters = FilterSpec::new()
            .with_dates(self.date_min, self.date_max)
            .with_strikes(self.strike_min, self.strike_max)
            .with_volatility(self.iv_min, self.iv_max);
        if let Some(quote_type) = self.quote_type {
            filters = filters.with_type(quote_type);
        }
        if let Some(weekly) = self.weekly {
            filters = filters.with_weekly(weekly);
        }

        let sort = if self.desc {
            SortSpec::descending(self.sort)
        } else {
            SortSpec::ascending(self.sort)
        };
        ViewState::new(filters, sort)
    }
}

fn load_config(cli: &Cli) -> Result<ChainConfig> {
    let mut config = match &cli.config {
        Some(path) => ChainConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ChainConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn open_view(config: &ChainConfig, symbol: &str, state: &ViewState) -> Result<DerivedView> {
    let source = JsonFileSource::new(&config.data_dir);
    let mut workspace = Workspace::new().with_horizon(config.horizon_days);
    workspace
        .open(&source, symbol)
        .with_context(|| format!("Failed to load options for {}", symbol))?;

    match workspace.derive(state, config) {
        Some(view) => Ok(view),
        None => bail!("No view available for {}", symbol),
    }
}

fn print_analytics(analytics: &Analytics) {
    println!(
        "Smile points: {} calls, {} puts",
        analytics.smile.calls.len(),
        analytics.smile.puts.len()
    );

    if !analytics.top_volume.is_empty() {
        println!("\nTop open interest:");
        for bar in &analytics.top_volume {
            let date = bar.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
            println!("  {:<14} {:>10}  {}", bar.label, bar.volume, date);
        }
    }

    if !analytics.iv_term_structure.is_empty() {
        println!("\nIV term structure:");
        for term in &analytics.iv_term_structure {
            println!(
                "  {}  avg IV {:>6.2}%  OI {:>10}  ({} options)",
                term.date, term.avg_iv, term.volume, term.count
            );
        }
    }

    if !analytics.sentiment.is_empty() {
        println!("\nCall/put ratio by expiration:");
        for row in &analytics.sentiment {
            println!(
                "  {}  calls {:>4}  puts {:>4}  ratio {:>6.2}",
                row.date, row.calls, row.puts, row.ratio
            );
        }
    }
}

/// Underlying quote line. A missing or unreadable quote never fails the view.
fn print_underlying(config: &ChainConfig, symbol: &str) {
    let source = JsonFileSource::new(&config.data_dir);
    match source.latest_quote(symbol) {
        Ok(Some(quote)) => {
            let scraped = quote
                .scrape_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "Underlying: last {}  bid {}  ask {}  spread {}  (scraped {})",
                quote.last_price,
                quote.bid_price,
                quote.ask_price,
                quote.spread(),
                scraped
            );
        }
        Ok(None) => {}
        Err(e) => warn!("No underlying quote for {}: {}", symbol, e),
    }
}

fn cmd_symbols(config: &ChainConfig) -> Result<()> {
    let source = JsonFileSource::new(&config.data_dir);
    let symbols = source.symbols().context("Failed to list symbols")?;
    if symbols.is_empty() {
        println!("No symbols found in {}", config.data_dir.display());
    }
    for symbol in symbols {
        println!("{}", symbol);
    }
    Ok(())
}

fn cmd_view(config: &ChainConfig, symbol: &str, state: &ViewState, rows: usize) -> Result<()> {
    let view = open_view(config, symbol, state)?;

    println!("{}", SEPARATOR);
    println!("{} ({} sorted {:?})", symbol, state.sort.field, state.sort.direction);
    println!("{}", SEPARATOR);
    print_underlying(config, symbol);
    println!("{}", view.statistics.summary());
    println!();
    print_analytics(&view.analytics);

    println!("\n{}", SEPARATOR);
    println!(
        "{:<8} {:<10} {:>10} {:>10} {:>10} {:>8} {:>10} {:>8}",
        "TYPE", "EXPIRY", "STRIKE", "BID", "ASK", "IV", "OI", "WEEKLY"
    );
    for record in view.organized.iter().take(rows) {
        println!(
            "{:<8} {:<10} {:>10} {:>10} {:>10} {:>8.2} {:>10} {:>8}",
            record.quote_type.label(),
            record.expiration_label().unwrap_or_else(|| "-".to_string()),
            record.strike_price,
            record.bid_price,
            record.ask_price,
            record.implied_volatility,
            record.open_interest,
            if record.is_weekly { "yes" } else { "no" },
        );
    }
    if view.organized.len() > rows {
        println!("... {} more rows", view.organized.len() - rows);
    }
    println!(
        "\nPairs: {}  unmatched calls: {}  unmatched puts: {}",
        view.pairing.pairs, view.pairing.unmatched_calls, view.pairing.unmatched_puts
    );
    Ok(())
}

fn cmd_export(
    config: &ChainConfig,
    symbol: &str,
    state: &ViewState,
    format: ExportFormat,
    output: &Path,
) -> Result<()> {
    let view = open_view(config, symbol, state)?;
    let now = Utc::now();

    let path = match format {
        ExportFormat::Csv => {
            let csv = export::to_csv(&view.organized, &config.bookkeeping_columns)?;
            export::write_file(output, &export::csv_file_name(symbol, now.date_naive()), &csv)?
        }
        ExportFormat::Json => {
            let document = ViewExport {
                symbol: symbol.to_string(),
                export_date: now,
                filters: state.filters.clone(),
                sort: state.sort,
                data: view.rows,
                statistics: view.statistics,
            };
            export::write_file(output, &document.file_name(), &document.to_json_pretty()?)?
        }
    };

    println!("Exported {} to {}", symbol, path.display());
    Ok(())
}

fn cmd_export_all(config: &ChainConfig, day: Option<NaiveDate>, output: &Path) -> Result<()> {
    let now = Utc::now();
    let day = day.unwrap_or_else(|| now.date_naive());
    let source = JsonFileSource::new(&config.data_dir);
    let rows = source
        .fetch_day(day)
        .with_context(|| format!("Failed to load records stored on {}", day))?;

    let document = BulkExport::new(now, rows);
    let path = export::write_file(output, &document.file_name(), &document.to_json_pretty()?)?;

    println!("Exported {} records to {}", document.total_records, path.display());
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chain_view=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Symbols => cmd_symbols(&config)?,
        Commands::View { symbol, view, rows } => cmd_view(&config, symbol, &view.state(), *rows)?,
        Commands::Export {
            symbol,
            view,
            format,
            output,
        } => cmd_export(&config, symbol, &view.state(), *format, output)?,
        Commands::ExportAll { date, output } => cmd_export_all(&config, *date, output)?,
    }

    Ok(())
}
