//! CLI definition and dispatch.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analyzer::{self, MatchRecord};
use crate::domain::backtest::{self, BacktestSummary};
use crate::domain::config_validation::{
    MAX_WORKERS, validate_lab_config, validate_scan_config, validate_scan_tuning,
};
use crate::domain::error::QuantscanError;
use crate::domain::favorites::{self, Favorite, split_tags};
use crate::domain::indicator::{self, IndicatorPanel};
use crate::domain::lab::{self, LabConfig, TradePlan};
use crate::domain::quotes;
use crate::domain::scanner::{
    DEFAULT_LOOKBACK_DAYS, DEFAULT_TASK_TIMEOUT, DEFAULT_WORKERS, ScanController, ScanOptions,
    ScanRequest,
};
use crate::domain::session::{ScanPhase, ScanProgress, ScanSession};
use crate::domain::stats;
use crate::domain::strategy::{Strategy, parse_strategies};
use crate::domain::universe::{Symbol, build_universe, normalize_code, parse_markets};
use crate::logging::{DEFAULT_LEVEL, LogFormat};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "quantscan", about = "Stock signal scanner and strategy backtester", version)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "quantscan.ini")]
    pub config: PathBuf,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the configured markets for live strategy signals
    Scan {
        /// Comma-separated markets, overriding [scan] markets
        #[arg(long)]
        markets: Option<String>,
        /// Comma-separated strategy keys, overriding [scan] strategies
        #[arg(long)]
        strategies: Option<String>,
        /// Keep penny stocks even when [scan] exclude_penny is set
        #[arg(long)]
        include_penny: bool,
        #[arg(long)]
        workers: Option<usize>,
        /// Date recorded in scan history (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Do not write scan history
        #[arg(long)]
        no_history: bool,
    },
    /// Analyze one symbol at its latest bar
    Analyze {
        code: String,
        #[arg(long)]
        market: Option<String>,
    },
    /// Five-bar forward win rate of one or every strategy on a symbol
    Backtest {
        code: String,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        market: Option<String>,
    },
    /// Stance and risk-sized trade plan of every strategy on a symbol
    Lab {
        code: String,
        #[arg(long)]
        market: Option<String>,
        /// Capital in domestic currency, overriding [lab] capital
        #[arg(long)]
        capital: Option<f64>,
    },
    /// Browse saved scan history
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Re-price a scan date's history and replace the strategy stats
    Verify { date: NaiveDate },
    /// Show the stored per-strategy win rates
    Stats,
    /// Manage the watch list
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
    /// Validate the configuration file
    Validate,
    /// Load a CSV directory into the SQLite cache
    Import {
        dir: PathBuf,
        /// Calendar days of history to import per symbol
        #[arg(long, default_value_t = 3650)]
        days: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List scan dates, most recent first
    Dates,
    /// Show the rows saved for one scan date
    Show { date: NaiveDate },
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommand {
    /// Add a symbol at the given or latest price
    Add {
        code: String,
        #[arg(long)]
        price: Option<f64>,
        /// Comma-separated strategy tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        market: Option<String>,
    },
    Remove {
        code: String,
    },
    /// List favorites with their return since entry
    List,
    SetPrice {
        code: String,
        price: f64,
    },
    SetDate {
        code: String,
        date: NaiveDate,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = load_config(&cli.config).and_then(|config| dispatch(cli.command, &config, cli.json));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn dispatch(command: Command, config: &FileConfigAdapter, json: bool) -> Result<(), QuantscanError> {
    match command {
        Command::Scan {
            markets,
            strategies,
            include_penny,
            workers,
            date,
            no_history,
        } => {
            let overrides = ScanOverrides {
                markets,
                strategies,
                include_penny,
                workers,
                date,
                no_history,
            };
            run_scan(config, overrides, json)
        }
        Command::Analyze { code, market } => run_analyze(config, &code, market.as_deref(), json),
        Command::Backtest {
            code,
            strategy,
            market,
        } => run_backtest(config, &code, strategy.as_deref(), market.as_deref(), json),
        Command::Lab {
            code,
            market,
            capital,
        } => run_lab(config, &code, market.as_deref(), capital, json),
        Command::History { action } => run_history(config, action, json),
        Command::Verify { date } => run_verify(config, date, json),
        Command::Stats => run_stats(config, json),
        Command::Favorites { action } => run_favorites(config, action, json),
        Command::Validate => run_validate(config),
        Command::Import { dir, days } => run_import(config, &dir, days),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantscanError> {
    FileConfigAdapter::from_file(path)
}

/// Level and format from `[logging]`, or defaults when the file is unreadable.
pub fn logging_settings(path: &Path) -> (String, LogFormat) {
    match FileConfigAdapter::from_file(path) {
        Ok(config) => (
            config
                .get_string("logging", "level")
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
            LogFormat::parse(&config.get_string("logging", "format").unwrap_or_default()),
        ),
        Err(_) => (DEFAULT_LEVEL.to_string(), LogFormat::Compact),
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), QuantscanError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| QuantscanError::Io(std::io::Error::other(e)))?;
    writeln!(out)?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), QuantscanError> {
    write_json(&mut std::io::stdout().lock(), value)
}

fn build_runtime() -> Result<tokio::runtime::Runtime, QuantscanError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

pub struct Backends {
    pub data: Arc<dyn DataPort>,
    pub store: Option<Arc<dyn StorePort>>,
}

impl Backends {
    pub fn store(&self) -> Result<Arc<dyn StorePort>, QuantscanError> {
        self.store
            .clone()
            .ok_or_else(|| QuantscanError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })
    }
}

fn csv_dir(config: &dyn ConfigPort) -> Result<PathBuf, QuantscanError> {
    config
        .get_string("data", "csv_dir")
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| QuantscanError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })
}

fn data_source(config: &dyn ConfigPort) -> String {
    config
        .get_string("data", "source")
        .unwrap_or_else(|| "sqlite".to_string())
        .trim()
        .to_lowercase()
}

#[cfg(feature = "sqlite")]
fn open_sqlite(
    config: &dyn ConfigPort,
) -> Result<Option<Arc<crate::adapters::sqlite_adapter::SqliteAdapter>>, QuantscanError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    if config.get_string("sqlite", "path").is_none() {
        return Ok(None);
    }
    let adapter = SqliteAdapter::from_config(config)?;
    adapter.initialize_schema()?;
    Ok(Some(Arc::new(adapter)))
}

#[cfg(feature = "sqlite")]
pub fn open_backends(config: &dyn ConfigPort) -> Result<Backends, QuantscanError> {
    let sqlite = open_sqlite(config)?;
    let store = sqlite.clone().map(|s| s as Arc<dyn StorePort>);

    let data = match data_source(config).as_str() {
        "csv" => Arc::new(CsvAdapter::new(csv_dir(config)?)) as Arc<dyn DataPort>,
        "sqlite" => match sqlite {
            Some(adapter) => adapter as Arc<dyn DataPort>,
            None => {
                return Err(QuantscanError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                });
            }
        },
        other => {
            return Err(QuantscanError::ConfigInvalid {
                section: "data".into(),
                key: "source".into(),
                reason: format!("unknown data source '{other}'"),
            });
        }
    };

    Ok(Backends { data, store })
}

#[cfg(not(feature = "sqlite"))]
pub fn open_backends(config: &dyn ConfigPort) -> Result<Backends, QuantscanError> {
    match data_source(config).as_str() {
        "csv" => Ok(Backends {
            data: Arc::new(CsvAdapter::new(csv_dir(config)?)),
            store: None,
        }),
        other => Err(QuantscanError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("data source '{other}' requires the sqlite feature"),
        }),
    }
}

/// Finds the code in the given market or the configured markets. Falls back
/// to a bare symbol classified by its code shape.
fn resolve_symbol(
    data: &dyn DataPort,
    config: &dyn ConfigPort,
    code: &str,
    market: Option<&str>,
) -> Symbol {
    let code = normalize_code(code);
    let markets: Vec<String> = match market {
        Some(m) => vec![m.trim().to_uppercase()],
        None => config
            .get_list("scan", "markets")
            .iter()
            .map(|m| m.to_uppercase())
            .collect(),
    };

    for m in &markets {
        match data.list_symbols(m) {
            Ok(listing) => {
                if let Some(symbol) = listing.into_iter().find(|s| s.code == code) {
                    return symbol;
                }
            }
            Err(e) => debug!(market = %m, error = %e, "listing unavailable"),
        }
    }
    Symbol::new(&code, &code, market.unwrap_or_default())
}

fn lookback_days(config: &dyn ConfigPort) -> u32 {
    let days = config.get_int("scan", "lookback_days", i64::from(DEFAULT_LOOKBACK_DAYS));
    u32::try_from(days).unwrap_or(DEFAULT_LOOKBACK_DAYS)
}

fn load_panel(
    data: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: &Symbol,
) -> Result<IndicatorPanel, QuantscanError> {
    let bars = data.fetch_ohlcv(&symbol.code, lookback_days(config))?;
    if bars.is_empty() {
        return Err(QuantscanError::NoData {
            code: symbol.code.clone(),
        });
    }
    indicator::compute(&bars)
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScanOverrides {
    pub markets: Option<String>,
    pub strategies: Option<String>,
    pub include_penny: bool,
    pub workers: Option<usize>,
    pub date: Option<NaiveDate>,
    pub no_history: bool,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub markets: Vec<String>,
    pub strategies: Vec<Strategy>,
    pub exclude_penny: bool,
    pub scan_date: NaiveDate,
    pub save_history: bool,
    pub options: ScanOptions,
}

fn invalid(section: &str, key: &str, reason: impl ToString) -> QuantscanError {
    QuantscanError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.to_string(),
    }
}

pub fn build_scan_settings(
    config: &dyn ConfigPort,
    overrides: &ScanOverrides,
) -> Result<ScanSettings, QuantscanError> {
    if overrides.markets.is_some() {
        validate_scan_tuning(config)?;
    } else {
        validate_scan_config(config)?;
    }

    let raw_markets = match &overrides.markets {
        Some(m) => m.clone(),
        None => config.get_string("scan", "markets").unwrap_or_default(),
    };
    let markets = parse_markets(&raw_markets).map_err(|e| invalid("scan", "markets", e))?;

    let raw_strategies = match &overrides.strategies {
        Some(s) => s.clone(),
        None => config.get_string("scan", "strategies").unwrap_or_default(),
    };
    let strategies =
        parse_strategies(&raw_strategies).map_err(|e| invalid("scan", "strategies", e))?;

    let workers = match overrides.workers {
        Some(w) if w == 0 || w as i64 > MAX_WORKERS => {
            return Err(invalid(
                "scan",
                "workers",
                format!("workers must be between 1 and {MAX_WORKERS}"),
            ));
        }
        Some(w) => w,
        None => config.get_int("scan", "workers", DEFAULT_WORKERS as i64) as usize,
    };
    let timeout_secs = config.get_int(
        "scan",
        "task_timeout_secs",
        DEFAULT_TASK_TIMEOUT.as_secs() as i64,
    );

    Ok(ScanSettings {
        markets,
        strategies,
        exclude_penny: config.get_bool("scan", "exclude_penny", true) && !overrides.include_penny,
        scan_date: overrides.date.unwrap_or_else(today),
        save_history: !overrides.no_history,
        options: ScanOptions {
            workers,
            task_timeout: Duration::from_secs(timeout_secs.max(1) as u64),
            lookback_days: lookback_days(config),
        },
    })
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    progress: &'a ScanProgress,
    results: &'a [MatchRecord],
}

fn run_scan(
    config: &dyn ConfigPort,
    overrides: ScanOverrides,
    json: bool,
) -> Result<(), QuantscanError> {
    let settings = build_scan_settings(config, &overrides)?;
    let backends = open_backends(config)?;

    eprintln!("Listing {}...", settings.markets.join(", "));
    let symbols = build_universe(backends.data.as_ref(), &settings.markets)?;
    eprintln!(
        "Scanning {} symbols with {} workers",
        symbols.len(),
        settings.options.workers
    );

    let request = ScanRequest {
        symbols,
        strategies: settings.strategies.clone(),
        exclude_penny: settings.exclude_penny,
        scan_date: settings.scan_date,
    };
    let store = if settings.save_history {
        backends.store.clone()
    } else {
        None
    };

    let runtime = build_runtime()?;
    let (progress, results) = runtime.block_on(drive_scan(
        Arc::clone(&backends.data),
        store,
        request,
        settings.options,
    ))?;

    for warning in &progress.warnings {
        eprintln!("warning: {warning}");
    }
    render_scan(&mut std::io::stdout().lock(), &progress, &results, json)
}

/// Writes the scan results followed by a status line. A cancelled scan
/// still shows the matches consumed before the cancel.
pub fn render_scan<W: Write>(
    out: &mut W,
    progress: &ScanProgress,
    results: &[MatchRecord],
    json: bool,
) -> Result<(), QuantscanError> {
    if json {
        return write_json(out, &ScanOutput { progress, results });
    }

    for record in results {
        write_match(out, record)?;
    }
    if progress.phase == ScanPhase::Cancelled {
        writeln!(
            out,
            "\nScan cancelled after {}/{} symbols: {} partial matches, history not saved",
            progress.processed,
            progress.total,
            results.len()
        )?;
    } else {
        writeln!(
            out,
            "\nScan completed: {}/{} symbols, {} matches, {} history rows written",
            progress.processed, progress.total, progress.matches, progress.history_written
        )?;
    }
    Ok(())
}

async fn drive_scan(
    data: Arc<dyn DataPort>,
    store: Option<Arc<dyn StorePort>>,
    request: ScanRequest,
    options: ScanOptions,
) -> Result<(ScanProgress, Vec<MatchRecord>), QuantscanError> {
    let controller = ScanController::new();
    let (session, handle) = controller
        .start(data, store, request, options)
        .map_err(|e| QuantscanError::Computation {
            code: "scan".into(),
            reason: e.to_string(),
        })?;

    let token = session.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling scan...");
            token.cancel();
        }
    });
    let ticker = tokio::spawn(report_progress(Arc::clone(&session)));

    let joined = handle.await;
    interrupt.abort();
    ticker.abort();
    eprintln!();

    let progress = joined.map_err(|e| QuantscanError::Computation {
        code: "scan".into(),
        reason: e.to_string(),
    })?;
    Ok((progress, session.results()))
}

async fn report_progress(session: Arc<ScanSession>) {
    let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        interval.tick().await;
        let progress = session.snapshot();
        if progress.phase.is_terminal() {
            break;
        }
        eprint!(
            "\r  {}/{} ({:.0}%)  matches: {}",
            progress.processed,
            progress.total,
            progress.percent(),
            progress.matches
        );
    }
}

fn write_match<W: Write>(out: &mut W, record: &MatchRecord) -> std::io::Result<()> {
    let currency = record.currency;
    writeln!(
        out,
        "{} {} ({})  {}",
        record.symbol.code,
        record.symbol.name,
        record.symbol.market,
        currency.format_price(record.price)
    )?;
    writeln!(out, "  Signals:  {}", record.strategy_line())?;
    writeln!(
        out,
        "  Win rate: {} ({}, {}-bar)",
        record.top_win_rate,
        record.top_strategy().label(),
        backtest::HOLD_BARS
    )?;
    writeln!(out, "  {}", record.report.title)?;
    writeln!(out, "  {}", record.report.situation)?;
    writeln!(out, "  {}", record.report.action)?;
    let snap = &record.snapshot;
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
    writeln!(
        out,
        "  RSI {}  Disparity {}  Bandwidth {}  ATR {:.2}",
        fmt(snap.rsi),
        fmt(snap.disparity25),
        snap.bandwidth
            .map_or_else(|| "-".to_string(), |v| format!("{v:.3}")),
        snap.atr
    )
}

// ---------------------------------------------------------------------------
// analyze / backtest / lab
// ---------------------------------------------------------------------------

fn run_analyze(
    config: &dyn ConfigPort,
    code: &str,
    market: Option<&str>,
    json: bool,
) -> Result<(), QuantscanError> {
    let backends = open_backends(config)?;
    let symbol = resolve_symbol(backends.data.as_ref(), config, code, market);
    let record = analyzer::analyze(backends.data.as_ref(), &symbol, false, lookback_days(config))?;

    if json {
        return print_json(&record);
    }
    match record {
        Some(record) => write_match(&mut std::io::stdout().lock(), &record)?,
        None => println!("{} {}: no live signal", symbol.code, symbol.name),
    }
    Ok(())
}

#[derive(Serialize)]
struct BacktestLine {
    strategy: Strategy,
    summary: BacktestSummary,
    win_rate: Option<f64>,
}

fn run_backtest(
    config: &dyn ConfigPort,
    code: &str,
    strategy: Option<&str>,
    market: Option<&str>,
    json: bool,
) -> Result<(), QuantscanError> {
    let strategies = match strategy {
        Some(raw) => vec![
            raw.parse::<Strategy>()
                .map_err(|e| invalid("backtest", "strategy", e))?,
        ],
        None => Strategy::ALL.to_vec(),
    };

    let backends = open_backends(config)?;
    let symbol = resolve_symbol(backends.data.as_ref(), config, code, market);
    let panel = load_panel(backends.data.as_ref(), config, &symbol)?;

    let lines: Vec<BacktestLine> = strategies
        .into_iter()
        .map(|strategy| {
            let summary = backtest::backtest(&panel, strategy);
            BacktestLine {
                strategy,
                summary,
                win_rate: summary.win_rate(),
            }
        })
        .collect();

    if json {
        return print_json(&lines);
    }
    println!(
        "{} {}: {} bars, {}-bar forward win rate",
        symbol.code,
        symbol.name,
        panel.len(),
        backtest::HOLD_BARS
    );
    for line in &lines {
        println!("  {:<12} {}", line.strategy.label(), line.summary);
    }
    Ok(())
}

pub fn build_lab_config(
    config: &dyn ConfigPort,
    capital: Option<f64>,
) -> Result<LabConfig, QuantscanError> {
    validate_lab_config(config)?;
    let defaults = LabConfig::default();
    let capital = capital.unwrap_or_else(|| config.get_double("lab", "capital", defaults.capital));
    if capital <= 0.0 {
        return Err(invalid("lab", "capital", "capital must be positive"));
    }
    Ok(LabConfig {
        capital,
        usd_rate: config.get_double("lab", "usd_rate", defaults.usd_rate),
    })
}

#[derive(Serialize)]
struct LabOutput<'a> {
    symbol: &'a Symbol,
    plans: &'a [TradePlan],
}

fn run_lab(
    config: &dyn ConfigPort,
    code: &str,
    market: Option<&str>,
    capital: Option<f64>,
    json: bool,
) -> Result<(), QuantscanError> {
    let lab_config = build_lab_config(config, capital)?;
    let backends = open_backends(config)?;
    let symbol = resolve_symbol(backends.data.as_ref(), config, code, market);
    let panel = load_panel(backends.data.as_ref(), config, &symbol)?;
    let currency = symbol.currency();

    let plans: Vec<TradePlan> = Strategy::ALL
        .iter()
        .map(|&s| lab::trade_plan(s, &panel, currency, &lab_config))
        .collect();

    if json {
        return print_json(&LabOutput {
            symbol: &symbol,
            plans: &plans,
        });
    }

    println!(
        "{} {}  {}",
        symbol.code,
        symbol.name,
        currency.format_price(panel.last_close())
    );
    for (strategy, stance) in lab::consensus(&panel) {
        println!("  {:<12} {}", strategy.label(), stance);
    }
    for plan in &plans {
        println!(
            "\n  {} [{}]  entry {}  stop {}  target {}",
            plan.strategy.label(),
            plan.stance,
            currency.format_price(plan.entry),
            currency.format_price(plan.stop),
            currency.format_price(plan.target)
        );
        println!(
            "    ATR {:.2} ({:.1}%)  risk {}  shares {}  max loss {}",
            plan.atr,
            plan.atr_pct,
            currency.format_price(plan.allowable_risk),
            plan.shares,
            currency.format_price(plan.total_loss)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// history / verify / stats
// ---------------------------------------------------------------------------

fn run_history(
    config: &dyn ConfigPort,
    action: HistoryCommand,
    json: bool,
) -> Result<(), QuantscanError> {
    let store = open_backends(config)?.store()?;
    match action {
        HistoryCommand::Dates => {
            let dates = store.history_dates()?;
            if json {
                return print_json(&dates);
            }
            if dates.is_empty() {
                eprintln!("No scan history");
            }
            for date in dates {
                println!("{date}");
            }
        }
        HistoryCommand::Show { date } => {
            let rows = store.history_for_date(date)?;
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                eprintln!("No history for {date}");
            }
            for row in &rows {
                println!(
                    "{}  {:<12} {} {} ({})  entry {}",
                    row.scan_date,
                    row.strategy.label(),
                    row.code,
                    row.name,
                    row.market,
                    row.entry_price
                );
            }
        }
    }
    Ok(())
}

fn quote_settings(config: &dyn ConfigPort) -> (usize, Duration) {
    let workers = config
        .get_int("scan", "workers", DEFAULT_WORKERS as i64)
        .clamp(1, MAX_WORKERS) as usize;
    let timeout = config
        .get_int(
            "scan",
            "task_timeout_secs",
            DEFAULT_TASK_TIMEOUT.as_secs() as i64,
        )
        .max(1) as u64;
    (workers, Duration::from_secs(timeout))
}

fn run_verify(config: &dyn ConfigPort, date: NaiveDate, json: bool) -> Result<(), QuantscanError> {
    let backends = open_backends(config)?;
    let store = backends.store()?;
    let (workers, timeout) = quote_settings(config);

    let runtime = build_runtime()?;
    let verification = runtime.block_on(stats::verify_date(
        Arc::clone(&backends.data),
        store,
        date,
        today(),
        workers,
        timeout,
    ))?;
    info!(date = %date, stats = verification.stats.len(), "verification done");

    if json {
        return print_json(&verification);
    }
    println!(
        "{}: {} rows, {} priced",
        verification.scan_date, verification.rows, verification.priced
    );
    for stat in &verification.stats {
        println!("  {}  {}/{}", stat.label(), stat.wins, stat.total);
    }
    Ok(())
}

fn run_stats(config: &dyn ConfigPort, json: bool) -> Result<(), QuantscanError> {
    let store = open_backends(config)?.store()?;
    let stats = store.strategy_stats()?;
    if json {
        return print_json(&stats);
    }
    if stats.is_empty() {
        eprintln!("No strategy stats yet; run `quantscan verify <date>`");
    }
    for stat in &stats {
        println!(
            "{:<20} {}/{}  updated {}",
            stat.label(),
            stat.wins,
            stat.total,
            stat.last_updated
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// favorites
// ---------------------------------------------------------------------------

fn report_change(changed: bool, code: &str, action: &str) {
    if changed {
        eprintln!("{action} {code}");
    } else {
        eprintln!("{code}: no change");
    }
}

fn run_favorites(
    config: &dyn ConfigPort,
    action: FavoritesCommand,
    json: bool,
) -> Result<(), QuantscanError> {
    let backends = open_backends(config)?;
    let store = backends.store()?;

    match action {
        FavoritesCommand::Add {
            code,
            price,
            tags,
            market,
        } => {
            let symbol = resolve_symbol(backends.data.as_ref(), config, &code, market.as_deref());
            let entry_price = match price {
                Some(p) => p,
                None => backends
                    .data
                    .fetch_latest_quote(&symbol.code)?
                    .ok_or_else(|| QuantscanError::NoData {
                        code: symbol.code.clone(),
                    })?,
            };
            let favorite = Favorite::new(
                &symbol,
                entry_price,
                today(),
                split_tags(&tags.unwrap_or_default()),
            );
            report_change(store.add_favorite(&favorite)?, &favorite.code, "Added");
        }
        FavoritesCommand::Remove { code } => {
            let code = normalize_code(&code);
            report_change(store.remove_favorite(&code)?, &code, "Removed");
        }
        FavoritesCommand::SetPrice { code, price } => {
            let code = normalize_code(&code);
            report_change(store.update_favorite_price(&code, price)?, &code, "Updated");
        }
        FavoritesCommand::SetDate { code, date } => {
            let code = normalize_code(&code);
            report_change(store.update_favorite_date(&code, date)?, &code, "Updated");
        }
        FavoritesCommand::List => {
            let list = store.list_favorites()?;
            let codes = list.iter().map(|f| f.code.clone()).collect();
            let (workers, timeout) = quote_settings(config);
            let runtime = build_runtime()?;
            let prices = runtime.block_on(quotes::fetch_quotes(
                Arc::clone(&backends.data),
                codes,
                workers,
                timeout,
            ));

            let as_of = today();
            let rows: Vec<_> = list
                .iter()
                .map(|f| favorites::performance(f, prices.get(&f.code).copied(), as_of))
                .collect();

            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                eprintln!("No favorites");
            }
            for perf in &rows {
                let fav = &perf.favorite;
                let current = perf
                    .current
                    .map_or_else(|| "-".to_string(), |p| format!("{p}"));
                println!(
                    "{} {}  entry {} on {}  now {}  {:+.2}% over {}d ({:+.2}%/d)  [{}]",
                    fav.code,
                    fav.name,
                    fav.entry_price,
                    fav.entry_date,
                    current,
                    perf.return_pct,
                    perf.days_held,
                    perf.daily_return_pct,
                    fav.tags_joined()
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate / import
// ---------------------------------------------------------------------------

fn run_validate(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    validate_scan_config(config)?;
    validate_lab_config(config)?;
    eprintln!("Configuration is valid");
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_import(config: &dyn ConfigPort, dir: &Path, days: u32) -> Result<(), QuantscanError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let markets = parse_markets(&config.get_string("scan", "markets").unwrap_or_default())
        .map_err(|e| invalid("scan", "markets", e))?;
    let target = SqliteAdapter::from_config(config)?;
    target.initialize_schema()?;
    let source = CsvAdapter::new(dir.to_path_buf());

    let symbols = build_universe(&source, &markets)?;
    target.insert_symbols(&symbols)?;

    let mut imported = 0usize;
    for symbol in &symbols {
        match source.fetch_ohlcv(&symbol.code, days) {
            Ok(bars) => {
                target.insert_bars(&bars)?;
                imported += 1;
                debug!(code = %symbol.code, bars = bars.len(), "imported");
            }
            Err(e) if e.is_data_unavailable() => {
                eprintln!("warning: skipping {} ({e})", symbol.code);
            }
            Err(e) => return Err(e),
        }
    }
    eprintln!("Imported {imported} of {} symbols from {}", symbols.len(), dir.display());
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(_config: &dyn ConfigPort, _dir: &Path, _days: u32) -> Result<(), QuantscanError> {
    Err(QuantscanError::ConfigInvalid {
        section: "data".into(),
        key: "source".into(),
        reason: "import requires the sqlite feature".into(),
    })
}
