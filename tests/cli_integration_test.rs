//! CLI integration tests.
//!
//! Tests cover:
//! - Settings builders over real INI files on disk
//! - `validate` exit codes for good and bad configuration
//! - A full scan -> history -> verify -> stats flow over a CSV directory
//!   with a SQLite store
//! - Watch-list commands and CSV import into SQLite

mod common;

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use common::*;
use quantscan::adapters::file_config_adapter::FileConfigAdapter;
use quantscan::cli::{self, Cli, ScanOverrides};
use quantscan::domain::error::QuantscanError;
use quantscan::domain::strategy::Strategy;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_debug(code: ExitCode) -> String {
    format!("{code:?}")
}

fn run(args: &[&str]) -> String {
    let mut argv = vec!["quantscan"];
    argv.extend_from_slice(args);
    exit_debug(cli::run(Cli::try_parse_from(argv).unwrap()))
}

fn success() -> String {
    exit_debug(ExitCode::SUCCESS)
}

fn write_bars_csv(dir: &Path, code: &str, bars: &[OhlcvBar]) {
    let mut writer = csv::Writer::from_path(dir.join(format!("{code}.csv"))).unwrap();
    writer
        .write_record(["date", "open", "high", "low", "close", "volume"])
        .unwrap();
    for bar in bars {
        writer
            .write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
}

/// CSV market data with one Elite entry and one symbol too short to analyze.
fn market_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("symbols.csv"),
        "code,name,market\n005930,Samsung,KOSPI\n000660,Hynix,KOSPI\nAAPL,Apple,NASDAQ\n",
    )
    .unwrap();
    write_bars_csv(dir.path(), "005930", &flat_then_rise("005930", 100.0, 211));
    write_bars_csv(dir.path(), "000660", &flat_then_rise("000660", 100.0, 120));
    dir
}

fn workspace_ini(data: &Path, db: &Path) -> String {
    format!(
        "[scan]\nmarkets = KOSPI\nexclude_penny = false\nworkers = 2\ntask_timeout_secs = 10\n\n\
         [data]\nsource = csv\ncsv_dir = {}\n\n\
         [sqlite]\npath = {}\n\n\
         [lab]\ncapital = 10000000\nusd_rate = 1400\n",
        data.display(),
        db.display()
    )
}

mod settings {
    use super::*;

    #[test]
    fn scan_settings_from_file() {
        let file = write_temp_ini(
            "[scan]\nmarkets = KOSPI,NASDAQ\nstrategies = elite, vwap\nworkers = 3\ntask_timeout_secs = 30\nlookback_days = 500\n",
        );
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let settings = cli::build_scan_settings(&config, &ScanOverrides::default()).unwrap();
        assert_eq!(settings.markets, vec!["KOSPI", "NASDAQ"]);
        assert_eq!(settings.strategies, vec![Strategy::Elite, Strategy::Vwap]);
        assert_eq!(settings.options.workers, 3);
        assert_eq!(settings.options.task_timeout.as_secs(), 30);
        assert_eq!(settings.options.lookback_days, 500);
    }

    #[test]
    fn unknown_strategy_is_config_invalid() {
        let file = write_temp_ini("[scan]\nmarkets = KOSPI\nstrategies = momentum\n");
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let err = cli::build_scan_settings(&config, &ScanOverrides::default()).unwrap_err();
        assert!(matches!(err, QuantscanError::ConfigInvalid { .. }));
    }

    #[test]
    fn lab_settings_from_file() {
        let file = write_temp_ini("[lab]\ncapital = 2500000\nusd_rate = 1350.5\n");
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let lab = cli::build_lab_config(&config, None).unwrap();
        assert_eq!(lab.capital, 2_500_000.0);
        assert_eq!(lab.usd_rate, 1350.5);
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_exits_zero() {
        let dir = market_dir();
        let file = write_temp_ini(&workspace_ini(dir.path(), &dir.path().join("q.db")));
        assert_eq!(run(&["-c", file.path().to_str().unwrap(), "validate"]), success());
    }

    #[test]
    fn invalid_config_exits_with_config_code() {
        let file = write_temp_ini("[scan]\nmarkets = KOSPI\nworkers = 0\n");
        assert_eq!(
            run(&["-c", file.path().to_str().unwrap(), "validate"]),
            exit_debug(ExitCode::from(2))
        );
    }

    #[test]
    fn missing_config_file_exits_with_config_code() {
        assert_eq!(
            run(&["-c", "/nonexistent/quantscan.ini", "validate"]),
            exit_debug(ExitCode::from(2))
        );
    }
}

#[cfg(feature = "sqlite")]
mod workflow {
    use super::*;
    use quantscan::adapters::sqlite_adapter::SqliteAdapter;
    use quantscan::ports::config_port::ConfigPort;
    use quantscan::ports::data_port::DataPort;
    use quantscan::ports::store_port::StorePort;

    fn open_store(config: &dyn ConfigPort) -> SqliteAdapter {
        SqliteAdapter::from_config(config).unwrap()
    }

    #[test]
    fn scan_history_verify_and_stats() {
        let dir = market_dir();
        let db = dir.path().join("quantscan.db");
        let file = write_temp_ini(&workspace_ini(dir.path(), &db));
        let ini = file.path().to_str().unwrap();

        assert_eq!(run(&["-c", ini, "scan", "--date", "2024-05-02"]), success());

        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let store = open_store(&config);
        let rows = store.history_for_date(date(2024, 5, 2)).unwrap();
        assert!(rows.iter().any(|r| r.code == "005930" && r.strategy == Strategy::Elite));
        assert!(rows.iter().all(|r| r.code != "000660"));
        let written = rows.len();

        assert_eq!(run(&["-c", ini, "scan", "--date", "2024-05-02"]), success());
        assert_eq!(store.history_for_date(date(2024, 5, 2)).unwrap().len(), written);

        assert_eq!(run(&["-c", ini, "history", "dates"]), success());
        assert_eq!(run(&["-c", ini, "--json", "history", "show", "2024-05-02"]), success());

        assert_eq!(run(&["-c", ini, "verify", "2024-05-02"]), success());
        let elite = store.strategy_stat(Strategy::Elite).unwrap().unwrap();
        assert_eq!((elite.wins, elite.total), (0, 1));

        assert_eq!(run(&["-c", ini, "stats"]), success());
    }

    #[test]
    fn no_history_flag_skips_persistence() {
        let dir = market_dir();
        let file = write_temp_ini(&workspace_ini(dir.path(), &dir.path().join("q.db")));
        let ini = file.path().to_str().unwrap();

        assert_eq!(
            run(&["-c", ini, "--json", "scan", "--no-history", "--strategies", "elite"]),
            success()
        );
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!(open_store(&config).history_dates().unwrap().is_empty());
    }

    #[test]
    fn single_symbol_commands() {
        let dir = market_dir();
        let file = write_temp_ini(&workspace_ini(dir.path(), &dir.path().join("q.db")));
        let ini = file.path().to_str().unwrap();

        assert_eq!(run(&["-c", ini, "analyze", "5930"]), success());
        assert_eq!(run(&["-c", ini, "--json", "backtest", "005930", "-s", "elite"]), success());
        assert_eq!(run(&["-c", ini, "lab", "005930", "--capital", "5000000"]), success());
        assert_eq!(
            run(&["-c", ini, "backtest", "005930", "-s", "momentum"]),
            exit_debug(ExitCode::from(2))
        );
        assert_eq!(
            run(&["-c", ini, "analyze", "000660"]),
            exit_debug(ExitCode::from(5))
        );
    }

    #[test]
    fn favorites_lifecycle() {
        let dir = market_dir();
        let file = write_temp_ini(&workspace_ini(dir.path(), &dir.path().join("q.db")));
        let ini = file.path().to_str().unwrap();

        assert_eq!(
            run(&["-c", ini, "favorites", "add", "5930", "--tags", "elite,dbb"]),
            success()
        );
        assert_eq!(run(&["-c", ini, "favorites", "set-price", "005930", "95"]), success());
        assert_eq!(
            run(&["-c", ini, "favorites", "set-date", "005930", "2024-01-02"]),
            success()
        );
        assert_eq!(run(&["-c", ini, "--json", "favorites", "list"]), success());

        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let store = open_store(&config);
        let favorites = store.list_favorites().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].name, "Samsung");
        assert_eq!(favorites[0].entry_price, 95.0);
        assert_eq!(favorites[0].entry_date, date(2024, 1, 2));
        assert_eq!(favorites[0].tags, vec!["elite", "dbb"]);

        assert_eq!(run(&["-c", ini, "favorites", "remove", "005930"]), success());
        assert!(store.list_favorites().unwrap().is_empty());
    }

    #[test]
    fn import_loads_csv_into_sqlite() {
        let dir = market_dir();
        let db = dir.path().join("cache.db");
        let file = write_temp_ini(&format!(
            "[scan]\nmarkets = KOSPI\nexclude_penny = false\n\n[sqlite]\npath = {}\n",
            db.display()
        ));
        let ini = file.path().to_str().unwrap();

        assert_eq!(
            run(&["-c", ini, "import", dir.path().to_str().unwrap()]),
            success()
        );

        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let store = open_store(&config);
        assert_eq!(store.list_symbols("KOSPI").unwrap().len(), 2);
        assert_eq!(store.fetch_ohlcv("005930", 3650).unwrap().len(), 211);
        assert_eq!(store.fetch_latest_quote("005930").unwrap(), Some(101.0));

        assert_eq!(run(&["-c", ini, "scan", "--date", "2024-05-03"]), success());
        assert_eq!(store.history_dates().unwrap(), vec![date(2024, 5, 3)]);
    }
}
