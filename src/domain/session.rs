//! Scan session state shared between the worker pool and its observers.
//!
//! Every field is updated atomically on its own. Observers that need several
//! fields together take a [`ScanProgress`] snapshot.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::domain::analyzer::MatchRecord;

/// Cooperative cancellation flag. In-flight work is never interrupted; the
/// dispatcher checks the flag and stops consuming results.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ScanPhase {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
}

impl ScanPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ScanPhase::Running,
            2 => ScanPhase::Completed,
            3 => ScanPhase::Cancelled,
            _ => ScanPhase::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScanPhase::Completed | ScanPhase::Cancelled)
    }
}

/// Point-in-time copy of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub processed: usize,
    pub total: usize,
    pub matches: usize,
    pub history_written: usize,
    pub warnings: Vec<String>,
}

impl ScanProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Default)]
pub struct ScanSession {
    phase: AtomicU8,
    processed: AtomicUsize,
    total: AtomicUsize,
    history_written: AtomicUsize,
    results: Mutex<Vec<MatchRecord>>,
    warnings: Mutex<Vec<String>>,
    cancel: CancelToken,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn phase(&self) -> ScanPhase {
        ScanPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Idle -> Running with a fixed total.
    pub fn begin(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.phase.store(ScanPhase::Running as u8, Ordering::SeqCst);
    }

    pub fn record_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn push_result(&self, record: MatchRecord) {
        lock(&self.results).push(record);
    }

    pub fn push_warning(&self, warning: impl Into<String>) {
        lock(&self.warnings).push(warning.into());
    }

    pub fn add_history_written(&self, rows: usize) {
        self.history_written.fetch_add(rows, Ordering::SeqCst);
    }

    /// Running -> Completed or Cancelled.
    pub fn finish(&self, cancelled: bool) {
        let phase = if cancelled {
            ScanPhase::Cancelled
        } else {
            ScanPhase::Completed
        };
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    pub fn results(&self) -> Vec<MatchRecord> {
        lock(&self.results).clone()
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            phase: self.phase(),
            processed: self.processed.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            matches: lock(&self.results).len(),
            history_written: self.history_written.load(Ordering::SeqCst),
            warnings: lock(&self.warnings).clone(),
        }
    }
}
