//! # Permaweave Core
//!
//! Pure primitives for the Permaweave client: transaction assembly,
//! deep hashing, chunk trees, and RSA-PSS signing.
//!
//! This crate contains no I/O and no networking. It is pure computation
//! over cryptographic data structures; everything it produces is
//! byte-exact and deterministic (signatures excepted — PSS is salted).
//!
//! ## Key Types
//!
//! - [`DraftTransaction`] / [`SignedTransaction`] - the mutable draft and
//!   its frozen, signed form
//! - [`Keystore`] - RSA signing identity (owner + address)
//! - [`ChunkTree`] - Merkle commitment over a payload's chunks
//! - [`CanonicalTransaction`] - the gateway-facing JSON document
//!
//! ## Signing
//!
//! The signed message is the deep hash of the canonical field list; see
//! [`deep_hash`]. The transaction id is the SHA-256 digest of the
//! signature bytes.

pub mod canonical;
pub mod chunks;
pub mod crypto;
pub mod deep_hash;
pub mod error;
pub mod keystore;
pub mod tag;
pub mod transaction;

#[cfg(test)]
mod test_util;

pub use canonical::{CanonicalTag, CanonicalTransaction};
pub use chunks::{
    verify_proof, Chunk, ChunkData, ChunkTree, ChunkerConfig, Proof, ProofStep, Side,
    MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
pub use crypto::{b64_decode, b64_encode, Address, LastTx, Owner, Sha256Hash, TxId, TxSignature};
pub use deep_hash::{deep_hash, DeepHashItem};
pub use error::{
    CanonicalError, ChunkIndexError, EncodingError, KeyLoadError, SigningError, TagError,
    TransactionError,
};
pub use keystore::{verify_signature, KeyComponents, Keystore, DEFAULT_KEY_BITS};
pub use tag::{validate_tags, Tag, MAX_NAME_LEN, MAX_TAG_COUNT, MAX_VALUE_LEN};
pub use transaction::{DraftTransaction, SignedTransaction};
