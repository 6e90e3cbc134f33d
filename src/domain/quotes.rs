//! Batched latest-quote fetch over a bounded worker pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::pool::{PoolLimits, TaskOutcome, run_bounded};
use crate::domain::session::CancelToken;
use crate::ports::data_port::DataPort;

/// Fetches the latest quote for every code with at most `workers` requests
/// in flight. Codes whose quote is unavailable, fails, or exceeds
/// `task_timeout` are omitted from the result.
pub async fn fetch_quotes(
    data_port: Arc<dyn DataPort>,
    codes: Vec<String>,
    workers: usize,
    task_timeout: Duration,
) -> HashMap<String, f64> {
    let limits = PoolLimits {
        workers,
        task_timeout,
    };
    let mut prices = HashMap::new();
    let keyed = codes.into_iter().map(|code| (code.clone(), code));

    run_bounded(
        keyed,
        limits,
        &CancelToken::new(),
        move |code: String| data_port.fetch_latest_quote(&code),
        |joined| match joined {
            Ok((code, TaskOutcome::Finished(Ok(Some(price))))) => {
                prices.insert(code, price);
            }
            Ok((_, TaskOutcome::Finished(Ok(None)))) => {}
            Ok((code, TaskOutcome::Finished(Err(e)))) => {
                debug!(code = %code, error = %e, "quote unavailable");
            }
            Ok((code, TaskOutcome::Panicked(reason))) => {
                debug!(code = %code, reason = %reason, "quote task failed");
            }
            Ok((code, TaskOutcome::TimedOut)) => debug!(code = %code, "quote timed out"),
            Err(e) => debug!(error = %e, "quote task failed"),
        },
    )
    .await;

    prices
}
