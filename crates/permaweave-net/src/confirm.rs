//! Confirmation tracking and batch submission.
//!
//! After submission a transaction is the network's to confirm; this
//! module watches it happen. Polling backs off exponentially (capped) to
//! bound gateway load, and a caller-supplied cancel token stops
//! observation without touching the transaction's network-side state.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use permaweave_core::{CanonicalTransaction, SignedTransaction, TxId};

use crate::error::{NotFoundError, SubmissionError, TrackError};
use crate::gateway::{Gateway, GatewayStatus};
use crate::retry::{with_retry, RetryPolicy};

/// Client-facing confirmation state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Accepted, awaiting a confirmed block.
    Pending,
    /// In the ledger.
    Confirmed { confirmations: u64 },
    /// Seen pending earlier, now gone: dropped before confirmation.
    Failed,
}

/// A status snapshot for one transaction. Recomputed on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationRecord {
    pub id: TxId,
    pub status: TxStatus,
}

impl ConfirmationRecord {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, TxStatus::Confirmed { .. })
    }
}

/// Polling behavior.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Give up waiting (and report the pending snapshot) after this long.
    pub timeout: Duration,
    /// Delay before the second poll; doubles up to the cap.
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
            max_poll_interval: Duration::from_secs(30),
        }
    }
}

/// Cancellation handle: the caller keeps this and fires it to stop an
/// in-flight wait.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// The token handed to waiting calls. Cloneable; dropping every handle
/// without firing means "never cancelled".
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never fire.
    pub fn never() -> Self {
        let (_handle, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when cancelled; never resolves if all handles are dropped
    /// unfired.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Sender gone without firing: park forever.
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a linked cancel handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Outcome of one transaction within a batch submission.
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: TxId,
    pub result: Result<(), SubmissionError>,
}

/// Watches submitted transactions through to confirmation and submits
/// batches.
pub struct ConfirmationTracker<G> {
    gateway: G,
    config: TrackerConfig,
    retry: RetryPolicy,
}

impl<G: Gateway> ConfirmationTracker<G> {
    pub fn new(gateway: G, config: TrackerConfig, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            config,
            retry,
        }
    }

    /// One status query.
    ///
    /// An id the network has never seen is [`NotFoundError`], which is
    /// not the same thing as pending.
    pub async fn poll_status(&self, id: &TxId) -> Result<ConfirmationRecord, TrackError> {
        match self.poll_raw(id).await? {
            GatewayStatus::NotFound => Err(NotFoundError(*id).into()),
            GatewayStatus::Pending => Ok(ConfirmationRecord {
                id: *id,
                status: TxStatus::Pending,
            }),
            GatewayStatus::Confirmed { confirmations } => Ok(ConfirmationRecord {
                id: *id,
                status: TxStatus::Confirmed { confirmations },
            }),
        }
    }

    /// Poll until the transaction confirms, fails, or the configured
    /// timeout passes.
    ///
    /// Timeout is not an error: the result is the pending snapshot, since
    /// "not yet confirmed" is a normal state. A transaction that was seen
    /// pending and then vanishes reports [`TxStatus::Failed`]. An id never
    /// seen at all is [`NotFoundError`]. Cancellation returns the last
    /// snapshot immediately.
    pub async fn await_confirmation(
        &self,
        id: &TxId,
        cancel: &CancelToken,
    ) -> Result<ConfirmationRecord, TrackError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut interval = self.config.poll_interval;
        let mut seen_pending = false;
        let mut cancel = cancel.clone();

        loop {
            match self.poll_raw(id).await? {
                GatewayStatus::Confirmed { confirmations } => {
                    info!(%id, confirmations, "transaction confirmed");
                    return Ok(ConfirmationRecord {
                        id: *id,
                        status: TxStatus::Confirmed { confirmations },
                    });
                }
                GatewayStatus::NotFound if seen_pending => {
                    warn!(%id, "transaction dropped before confirmation");
                    return Ok(ConfirmationRecord {
                        id: *id,
                        status: TxStatus::Failed,
                    });
                }
                GatewayStatus::NotFound => return Err(NotFoundError(*id).into()),
                GatewayStatus::Pending => {
                    seen_pending = true;
                    debug!(%id, "still pending");
                }
            }

            let pending = ConfirmationRecord {
                id: *id,
                status: TxStatus::Pending,
            };
            let now = Instant::now();
            if now >= deadline {
                debug!(%id, "confirmation wait timed out");
                return Ok(pending);
            }

            let sleep_for = interval.min(deadline - now);
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = cancel.cancelled() => {
                    debug!(%id, "confirmation wait cancelled");
                    return Ok(pending);
                }
            }
            interval = interval.saturating_mul(2).min(self.config.max_poll_interval);
        }
    }

    /// Submit one canonical transaction document, retrying transient
    /// failures.
    pub async fn submit_form(&self, form: &CanonicalTransaction) -> Result<(), SubmissionError> {
        match with_retry(&self.retry, || self.gateway.submit_transaction(form)).await {
            Ok(()) => Ok(()),
            Err((_, crate::error::GatewayError::Rejected(reason))) => {
                Err(SubmissionError::Rejected { reason })
            }
            Err((attempts, source)) => Err(SubmissionError::RetriesExhausted { attempts, source }),
        }
    }

    /// Submit each transaction independently, preserving input order.
    ///
    /// One failure never aborts the rest, and every outcome — accepted or
    /// failed with its reason — is reported.
    pub async fn submit_batch(&self, transactions: &[SignedTransaction]) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let id = tx.id();
            let result = self.submit_form(&tx.to_canonical_form()).await;
            match &result {
                Ok(()) => info!(%id, "batch item accepted"),
                Err(e) => warn!(%id, error = %e, "batch item failed"),
            }
            outcomes.push(BatchOutcome { id, result });
        }
        outcomes
    }

    async fn poll_raw(&self, id: &TxId) -> Result<GatewayStatus, TrackError> {
        with_retry(&self.retry, || self.gateway.status(id))
            .await
            .map_err(|(attempts, source)| TrackError::RetriesExhausted { attempts, source })
    }
}
