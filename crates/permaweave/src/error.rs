//! Error types for the unified client.

use thiserror::Error;

use permaweave_core::{CanonicalError, TransactionError};
use permaweave_net::{
    GatewayError, QuoteUnavailableError, SubmissionError, TrackError,
};

use crate::lifecycle::{ImmutableTransactionError, TxStage};

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transaction assembly or verification error.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Canonical form error.
    #[error("canonical form error: {0}")]
    Canonical(#[from] CanonicalError),

    /// No fee quote within the retry budget.
    #[error(transparent)]
    Quote(#[from] QuoteUnavailableError),

    /// Submission failure.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Status tracking failure.
    #[error(transparent)]
    Track(#[from] TrackError),

    /// Mutation after signing.
    #[error(transparent)]
    Immutable(#[from] ImmutableTransactionError),

    /// Direct gateway failure (data fetch, network info).
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The last-reference lookup exhausted its retry budget.
    #[error("last reference lookup failed after {attempts} attempts: {source}")]
    LastTxLookup {
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    /// The transaction is scheduled for later and refuses to go out yet.
    #[error("transaction is scheduled for {scheduled_at} and it is only {now}")]
    NotYetDue { scheduled_at: i64, now: i64 },

    /// The operation does not apply at the transaction's current stage.
    #[error("cannot {op} a transaction in the {stage:?} stage")]
    InvalidState { op: &'static str, stage: TxStage },
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
