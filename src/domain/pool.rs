//! Bounded fan-out of blocking jobs.
//!
//! At most `workers` jobs are in flight. Each runs on the blocking pool under
//! its own timeout; a job that overruns is abandoned and finishes unobserved.
//! The cancel token is checked before every dispatch and after every
//! completion, and completions seen after cancellation are dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};

use crate::domain::session::CancelToken;

#[derive(Debug, Clone, Copy)]
pub struct PoolLimits {
    pub workers: usize,
    pub task_timeout: Duration,
}

/// How one keyed job ended.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Finished(T),
    Panicked(String),
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolExit {
    Drained,
    Cancelled,
}

pub async fn run_bounded<I, T, F, C>(
    items: impl IntoIterator<Item = (String, I)>,
    limits: PoolLimits,
    cancel: &CancelToken,
    job: F,
    mut consume: C,
) -> PoolExit
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> T + Send + Sync + 'static,
    C: FnMut(Result<(String, TaskOutcome<T>), JoinError>),
{
    let workers = limits.workers.max(1);
    let job = Arc::new(job);
    let mut pending = items.into_iter();
    let mut tasks: JoinSet<(String, TaskOutcome<T>)> = JoinSet::new();

    loop {
        while tasks.len() < workers {
            if cancel.is_cancelled() {
                tasks.abort_all();
                return PoolExit::Cancelled;
            }
            let Some((key, item)) = pending.next() else { break };
            let job = Arc::clone(&job);
            let timeout = limits.task_timeout;
            tasks.spawn(async move {
                let handle = tokio::task::spawn_blocking(move || job(item));
                let outcome = match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(value)) => TaskOutcome::Finished(value),
                    Ok(Err(e)) => TaskOutcome::Panicked(e.to_string()),
                    Err(_) => TaskOutcome::TimedOut,
                };
                (key, outcome)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            return PoolExit::Drained;
        };
        if cancel.is_cancelled() {
            tasks.abort_all();
            return PoolExit::Cancelled;
        }
        consume(joined);
    }
}
