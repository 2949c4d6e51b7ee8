//! # Permaweave Net
//!
//! The network-facing half of the Permaweave client: the gateway
//! collaborator contract, retry/backoff discipline, fee estimation, and
//! the confirmation lifecycle.
//!
//! Nothing here speaks HTTP. The gateway is a trait ([`Gateway`]); real
//! transports implement it, and [`gateway::memory::MemoryGateway`]
//! provides a scriptable in-process node for tests.
//!
//! ## Retry discipline
//!
//! Gateway calls are retried with capped exponential backoff, but only
//! when the failure is transient ([`GatewayError::is_transient`]).
//! Validation rejections fail fast.

pub mod confirm;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod retry;

pub use confirm::{
    cancel_pair, BatchOutcome, CancelHandle, CancelToken, ConfirmationRecord, ConfirmationTracker,
    TrackerConfig, TxStatus,
};
pub use error::{
    GatewayError, NotFoundError, QuoteUnavailableError, SubmissionError, TrackError,
};
pub use fees::{apply_markup, FeeConfig, FeeEstimator};
pub use gateway::{ChunkUpload, Gateway, GatewayStatus, NetworkInfo};
pub use retry::{with_retry, RetryPolicy};
