//! # Permaweave
//!
//! A client-side engine for a permanent content-addressed ledger:
//! construct, sign, chunk, price, submit, and track transactions bound
//! for an external network gateway.
//!
//! The client never participates in consensus or storage. It produces
//! byte-exact, network-verifiable artifacts — signed transaction
//! documents and proven chunks — and watches them through confirmation.
//!
//! ## Quick tour
//!
//! ```rust,ignore
//! use permaweave::{Client, ClientConfig, Transaction};
//!
//! let client = Client::new(keystore, gateway, ClientConfig::default());
//!
//! let mut draft = client.data_transaction(payload);
//! draft.add_tag("Content-Type", "text/plain");
//!
//! let signed = client.sign(draft).await?;
//! client.submit(&signed).await?;
//!
//! let record = client
//!     .await_confirmation(&signed.id(), &CancelToken::never())
//!     .await?;
//! ```
//!
//! The building blocks live in [`permaweave_core`] (pure computation)
//! and [`permaweave_net`] (gateway contract, fees, tracking); this crate
//! re-exports the common surface.

pub mod client;
pub mod error;
pub mod lifecycle;

pub use client::{Client, ClientConfig};
pub use error::{ClientError, Result};
pub use lifecycle::{ImmutableTransactionError, Transaction, TxStage};

// The surface most callers need, re-exported from the component crates.
pub use permaweave_core::{
    Address, CanonicalTransaction, ChunkTree, ChunkerConfig, DraftTransaction, KeyComponents,
    Keystore, LastTx, Owner, SignedTransaction, Tag, TxId, TxSignature,
};
pub use permaweave_net::{
    cancel_pair, BatchOutcome, CancelHandle, CancelToken, ConfirmationRecord, ConfirmationTracker,
    FeeConfig, FeeEstimator, Gateway, NetworkInfo, RetryPolicy, TrackerConfig, TxStatus,
};
