//! ChipView CLI — indicator bundles and broker chip data from the command line.
//!
//! Commands:
//! - `bundle` — build a display bundle from a local JSON or CSV history
//! - `fetch` — pull chip data and daily history for a ticker from the backend
//! - `broker` — one broker's daily net trades in a ticker
//! - `config` — print the effective configuration as TOML
//!
//! JSON goes to stdout; logs go to stderr (`RUST_LOG` overrides the `info`
//! default).

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chipview_core::data::{
    format_share_count, history_from_csv, history_from_json, Backend, BrokerTrade, ChipBars,
    ChipData, ChipQuery, HttpBackend, RawBar, TradeSide,
};
use chipview_core::engine::{cutoff_at, cutoff_months_before};
use chipview_core::{ChipViewConfig, DisplayBundle, EngineConfig};
use chipview_runner::{ChartSession, RequestState};

/// Upper bound on a single bundle computation.
const COMPUTE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "chipview",
    about = "ChipView CLI — stock indicators and broker chip data"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the display bundle for a local daily history.
    Bundle {
        /// History file: a JSON array of bars, or CSV (`.csv`) with a
        /// date,open,high,low,close,volume header.
        #[arg(long)]
        history: PathBuf,

        /// First displayed date (YYYY-MM-DD).
        #[arg(long, conflicts_with = "months")]
        cutoff: Option<String>,

        /// Display the last N months before today. Defaults to
        /// `engine.display_months`.
        #[arg(long)]
        months: Option<u32>,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Fetch chip data and history for a ticker and print a combined report.
    Fetch {
        /// Stock code or name (e.g., 2330).
        ticker: String,

        /// Start of the chip data range (YYYY-MM-DD). Requires --end.
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// End of the chip data range (YYYY-MM-DD). Requires --start.
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Months of history to display, ending at --end (or today).
        #[arg(long)]
        months: Option<u32>,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print one broker's daily net trades in a ticker.
    Broker {
        /// Stock code or name.
        ticker: String,

        /// Broker branch name.
        broker: String,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Bundle {
            history,
            cutoff,
            months,
            pretty,
        } => run_bundle(&config, &history, cutoff.as_deref(), months, pretty),
        Commands::Fetch {
            ticker,
            start,
            end,
            months,
            pretty,
        } => run_fetch(&config, &ticker, start.as_deref(), end.as_deref(), months, pretty),
        Commands::Broker {
            ticker,
            broker,
            pretty,
        } => run_broker(&config, &ticker, &broker, pretty),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ChipViewConfig> {
    match path {
        Some(path) => ChipViewConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ChipViewConfig::default()),
    }
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("--{flag} {value:?} is not a YYYY-MM-DD date"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// `--cutoff` wins; otherwise `months` (or the configured default) before
/// `anchor`.
fn resolve_cutoff(
    cutoff: Option<&str>,
    months: Option<u32>,
    anchor: NaiveDate,
    engine: &EngineConfig,
) -> Result<i64> {
    match cutoff {
        Some(date) => Ok(cutoff_at(parse_date("cutoff", date)?)),
        None => Ok(cutoff_months_before(
            anchor,
            months.unwrap_or(engine.display_months),
        )),
    }
}

fn load_history(path: &Path) -> Result<Vec<RawBar>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let bars = if is_csv {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        history_from_csv(file)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        history_from_json(&text)?
    };
    info!(path = %path.display(), bars = bars.len(), "history loaded");
    Ok(bars)
}

/// Run one request through a chart session and wait for the result.
fn compute_bundle(raw: &[RawBar], cutoff: i64, engine: &EngineConfig) -> Result<DisplayBundle> {
    let mut session = ChartSession::new(engine.clone()).context("starting worker")?;
    session.request(raw, cutoff)?;

    match session.wait(COMPUTE_TIMEOUT) {
        RequestState::Delivered => session
            .take_bundle()
            .ok_or_else(|| anyhow!("request delivered without a bundle")),
        RequestState::Failed => match session.error() {
            Some(e) => bail!("cannot render chart: {e}"),
            None => bail!("cannot render chart"),
        },
        state => bail!("bundle computation did not finish ({state:?})"),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn run_bundle(
    config: &ChipViewConfig,
    history: &Path,
    cutoff: Option<&str>,
    months: Option<u32>,
    pretty: bool,
) -> Result<()> {
    let raw = load_history(history)?;
    let cutoff = resolve_cutoff(cutoff, months, today(), &config.engine)?;
    let bundle = compute_bundle(&raw, cutoff, &config.engine)?;
    info!(
        points = bundle.len(),
        max_volume = bundle.max_volume,
        "bundle ready"
    );
    print_json(&bundle, pretty)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchReport<'a> {
    chip: &'a ChipData,
    chip_bars: &'a ChipBars,
    bundle: &'a DisplayBundle,
}

fn run_fetch(
    config: &ChipViewConfig,
    ticker: &str,
    start: Option<&str>,
    end: Option<&str>,
    months: Option<u32>,
    pretty: bool,
) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let mut query = ChipQuery::new(ticker)?;
    let range = match (start, end) {
        (Some(start), Some(end)) => Some((parse_date("start", start)?, parse_date("end", end)?)),
        (None, None) => None,
        _ => bail!("--start and --end must be given together"),
    };
    if let Some((start, end)) = range {
        query = query.with_range(start, end)?;
    }

    let chip = backend
        .chip_data(&query)
        .with_context(|| format!("fetching chip data for {}", query.ticker))?;
    let chip_bars = chip.bars()?;
    let history = backend
        .stock_history(&query.ticker)
        .with_context(|| format!("fetching history for {}", query.ticker))?;

    let anchor = range.map_or_else(today, |(_, end)| end);
    let cutoff = resolve_cutoff(None, months, anchor, &config.engine)?;
    let bundle = compute_bundle(&history, cutoff, &config.engine)?;

    info!(
        ticker = %query.ticker,
        backend = backend.name(),
        buyers = chip_bars.buyers.len(),
        sellers = chip_bars.sellers.len(),
        points = bundle.len(),
        "fetched"
    );
    print_json(
        &FetchReport {
            chip: &chip,
            chip_bars: &chip_bars,
            bundle: &bundle,
        },
        pretty,
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeLine<'a> {
    date: &'a str,
    net_shares: i64,
    /// `net_shares` with thousands separators.
    shares: String,
    side: TradeSide,
}

fn trade_lines(trades: &[BrokerTrade]) -> Vec<TradeLine<'_>> {
    trades
        .iter()
        .map(|t| TradeLine {
            date: &t.date,
            net_shares: t.net_shares,
            shares: format_share_count(t.net_shares),
            side: t.side(),
        })
        .collect()
}

fn run_broker(config: &ChipViewConfig, ticker: &str, broker: &str, pretty: bool) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let trades = backend
        .broker_trades(ticker, broker)
        .with_context(|| format!("fetching trades of {broker} in {ticker}"))?;

    let net: i64 = trades.iter().map(|t| t.net_shares).sum();
    info!(
        ticker,
        broker,
        days = trades.len(),
        net = %format_share_count(net),
        "broker trades"
    );
    print_json(&trade_lines(&trades), pretty)
}
