//! Scan orchestration over a symbol universe.
//!
//! Symbols are analyzed on the bounded pool in [`crate::domain::pool`]. A
//! cancelled scan keeps the matches consumed so far, leaves in-flight work
//! to finish unobserved, and writes no history.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::analyzer::{self, MatchRecord};
use crate::domain::error::QuantscanError;
use crate::domain::history;
use crate::domain::pool::{PoolExit, PoolLimits, TaskOutcome, run_bounded};
use crate::domain::session::{CancelToken, ScanPhase, ScanProgress, ScanSession};
use crate::domain::strategy::Strategy;
use crate::domain::universe::Symbol;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub symbols: Vec<Symbol>,
    /// Empty means every analyzed match passes.
    pub strategies: Vec<Strategy>,
    pub exclude_penny: bool,
    pub scan_date: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub workers: usize,
    pub task_timeout: Duration,
    pub lookback_days: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// A record passes when no strategy is requested or it matched any requested one.
pub fn passes_filter(record: &MatchRecord, strategies: &[Strategy]) -> bool {
    strategies.is_empty() || strategies.iter().any(|&s| record.contains(s))
}

pub async fn run_scan(
    session: Arc<ScanSession>,
    data_port: Arc<dyn DataPort>,
    store: Option<Arc<dyn StorePort>>,
    request: ScanRequest,
    options: ScanOptions,
) -> ScanProgress {
    let cancel = session.cancel_token();
    let limits = PoolLimits {
        workers: options.workers.max(1),
        task_timeout: options.task_timeout,
    };
    session.begin(request.symbols.len());
    info!(
        symbols = request.symbols.len(),
        workers = limits.workers,
        timeout_secs = options.task_timeout.as_secs(),
        "scan started"
    );

    let exclude_penny = request.exclude_penny;
    let lookback = options.lookback_days;
    let symbols = request.symbols.into_iter().map(|s| (s.code.clone(), s));
    let exit = run_bounded(
        symbols,
        limits,
        &cancel,
        move |symbol: Symbol| analyzer::analyze(data_port.as_ref(), &symbol, exclude_penny, lookback),
        |joined| {
            session.record_processed();
            let (code, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "scan task failed");
                    return;
                }
            };
            match outcome {
                TaskOutcome::Finished(Ok(Some(record))) => {
                    if passes_filter(&record, &request.strategies) {
                        debug!(code = %code, strategies = %record.strategy_line(), "match");
                        session.push_result(record);
                    }
                }
                TaskOutcome::Finished(Ok(None)) => {}
                TaskOutcome::Finished(Err(e)) if e.is_data_unavailable() => {
                    debug!(code = %code, error = %e, "skipping symbol");
                }
                TaskOutcome::Finished(Err(e)) => {
                    warn!(code = %code, error = %e, "analysis failed");
                }
                TaskOutcome::Panicked(reason) => {
                    let e = QuantscanError::Computation { code, reason };
                    warn!(error = %e, "analysis panicked");
                }
                TaskOutcome::TimedOut => {
                    let e = QuantscanError::Timeout {
                        code,
                        secs: options.task_timeout.as_secs(),
                    };
                    debug!(error = %e, "abandoned symbol");
                }
            }
        },
    )
    .await;

    if was_cancelled(exit, &cancel) {
        session.finish(true);
        let progress = session.snapshot();
        info!(processed = progress.processed, total = progress.total, "scan cancelled");
        return progress;
    }

    if let Some(store) = store {
        save_history(&session, store, request.scan_date).await;
    }
    session.finish(false);
    let progress = session.snapshot();
    info!(
        processed = progress.processed,
        matches = progress.matches,
        "scan completed"
    );
    progress
}

/// A drained pool still counts as cancelled when the token was set after
/// the last completion was consumed.
fn was_cancelled(exit: PoolExit, cancel: &CancelToken) -> bool {
    exit == PoolExit::Cancelled || cancel.is_cancelled()
}

async fn save_history(session: &Arc<ScanSession>, store: Arc<dyn StorePort>, scan_date: NaiveDate) {
    let rows = history::rows_from_matches(scan_date, &session.results());
    if rows.is_empty() {
        return;
    }
    let saved = tokio::task::spawn_blocking(move || history::persist(store.as_ref(), &rows)).await;
    match saved {
        Ok(Ok(summary)) => session.add_history_written(summary.inserted),
        Ok(Err(e)) => {
            warn!(error = %e, "failed to save scan history");
            session.push_warning(format!("scan history not saved: {e}"));
        }
        Err(e) => {
            warn!(error = %e, "history task failed");
            session.push_warning(format!("scan history not saved: {e}"));
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("a scan is already running")]
pub struct ScanAlreadyRunning;

/// Owns the current session on behalf of a control surface: one running
/// scan at a time, a new scan supersedes a finished one.
#[derive(Default)]
pub struct ScanController {
    current: Mutex<Option<Arc<ScanSession>>>,
}

impl ScanController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a scan on the current tokio runtime.
    pub fn start(
        &self,
        data_port: Arc<dyn DataPort>,
        store: Option<Arc<dyn StorePort>>,
        request: ScanRequest,
        options: ScanOptions,
    ) -> Result<(Arc<ScanSession>, tokio::task::JoinHandle<ScanProgress>), ScanAlreadyRunning> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = current.as_ref() {
            if matches!(session.phase(), ScanPhase::Running) {
                return Err(ScanAlreadyRunning);
            }
        }
        let session = Arc::new(ScanSession::new());
        session.begin(request.symbols.len());
        *current = Some(Arc::clone(&session));
        let handle = tokio::spawn(run_scan(
            Arc::clone(&session),
            data_port,
            store,
            request,
            options,
        ));
        Ok((session, handle))
    }

    pub fn cancel(&self) {
        if let Some(session) = self.current.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            session.cancel();
        }
    }

    pub fn progress(&self) -> Option<ScanProgress> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.snapshot())
    }
}
