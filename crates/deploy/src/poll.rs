//! Receipt polling with a bounded, cancellable retry policy.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use alloy_core::primitives::B256;
use backon::{ConstantBuilder, Retryable};
use tokio_util::sync::CancellationToken;

use crate::{ChainClient, Error, Result, TransactionReceipt};

/// Default delay between receipt lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default bound on receipt lookups.
pub const DEFAULT_MAX_ATTEMPTS: usize = 120;

/// Retry policy for the receipt poll.
///
/// The loop stops at whichever bound is hit first: `max_attempts` lookups, or `timeout`
/// of wall-clock time when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed delay between lookups.
    pub interval: Duration,
    /// Total number of lookups, including the first one. Values below 1 are treated as 1.
    pub max_attempts: usize,
    /// Optional overall deadline.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: None,
        }
    }
}

/// Outcome of a single lookup, as seen by the retry loop.
#[derive(Debug)]
enum Lookup {
    Pending,
    Failed(Error),
}

/// Poll `eth_getTransactionReceipt` until the receipt appears.
///
/// A missing receipt is retried after `policy.interval`; any query error ends the loop
/// immediately. Exhausting the policy yields [`Error::PollTimeout`], and firing `cancel`
/// yields [`Error::PollCancelled`].
pub async fn wait_for_receipt<C: ChainClient>(
    client: &C,
    tx_hash: B256,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<TransactionReceipt> {
    let lookups = AtomicUsize::new(0);
    let counter = &lookups;

    let lookup = move || async move {
        counter.fetch_add(1, Ordering::Relaxed);
        match client.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => Ok(receipt),
            Ok(None) => Err(Lookup::Pending),
            Err(e) => Err(Lookup::Failed(e)),
        }
    };

    let backoff = ConstantBuilder::default()
        .with_delay(policy.interval)
        .with_max_times(policy.max_attempts.saturating_sub(1));

    let polling = lookup
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(|e| matches!(e, Lookup::Pending))
        .notify(|_, delay: Duration| {
            tracing::debug!(
                %tx_hash,
                attempt = lookups.load(Ordering::Relaxed),
                ?delay,
                "Receipt not available yet, retrying"
            );
        });

    let timed_out = || Error::PollTimeout {
        tx_hash,
        attempts: lookups.load(Ordering::Relaxed),
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::PollCancelled { tx_hash }),
        outcome = async move {
            match policy.timeout {
                Some(limit) => tokio::time::timeout(limit, polling).await.ok(),
                None => Some(polling.await),
            }
        } => outcome,
    };

    match outcome {
        Some(Ok(receipt)) => Ok(receipt),
        Some(Err(Lookup::Failed(e))) => Err(e),
        Some(Err(Lookup::Pending)) | None => Err(timed_out()),
    }
}
