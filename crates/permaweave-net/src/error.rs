//! Error types for gateway-facing operations.

use thiserror::Error;

use permaweave_core::TxId;

/// Errors surfaced by the gateway collaborator.
///
/// Transient failures (timeouts, unavailability) are retried internally;
/// rejections are final and surface immediately.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway did not answer in time.
    #[error("gateway timed out")]
    Timeout,

    /// The gateway answered with a server-side failure (5xx class).
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway rejected the request as invalid. Never retried.
    #[error("rejected by gateway: {0}")]
    Rejected(String),

    /// The requested resource does not exist on the network.
    #[error("not found")]
    NotFound,

    /// The gateway's response could not be interpreted.
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// No price quote could be obtained within the retry budget.
#[derive(Debug, Error)]
#[error("no price quote after {attempts} attempts: {source}")]
pub struct QuoteUnavailableError {
    pub attempts: u32,
    #[source]
    pub source: GatewayError,
}

/// A transaction submission failed.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The gateway rejected the transaction as invalid. Not retryable.
    #[error("transaction rejected: {reason}")]
    Rejected { reason: String },

    /// Transient failures exhausted the retry budget.
    #[error("submission failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    /// A chunk upload for an accepted transaction failed.
    #[error("upload of chunk {index} failed: {source}")]
    ChunkUpload {
        index: usize,
        #[source]
        source: GatewayError,
    },
}

/// The network has never seen this transaction id.
///
/// Distinct from pending: pending means accepted but unconfirmed.
#[derive(Debug, Error)]
#[error("transaction {0} not found on the network")]
pub struct NotFoundError(pub TxId);

/// Errors polling a transaction's confirmation status.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("status poll failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: GatewayError,
    },
}
