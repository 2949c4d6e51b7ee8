//! Error types for Permaweave core operations.

use thiserror::Error;

/// Errors decoding base64url wire fields.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },
}

/// Errors constructing a keystore from key material.
///
/// Key material problems are never retryable; the source record itself
/// is wrong.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// A required component was absent or empty in the source record.
    #[error("key material is missing component `{field}`")]
    MissingComponent { field: &'static str },

    /// The components do not form a consistent RSA key.
    #[error("invalid key components: {0}")]
    InvalidComponents(String),
}

/// Errors producing or checking a signature.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The underlying RSA operation failed.
    #[error("rsa signing failed: {0}")]
    Rsa(String),

    /// The owner bytes do not form a usable public key.
    #[error("invalid owner public key: {0}")]
    InvalidOwner(String),

    /// The signature does not verify against the message.
    #[error("signature verification failed")]
    Verification,
}

/// Errors accessing chunks of a payload.
#[derive(Debug, Error)]
pub enum ChunkIndexError {
    #[error("chunk index {index} out of range: payload has {count} chunks")]
    OutOfRange { index: usize, count: usize },

    /// The transaction carries no payload bytes to chunk (for example a
    /// record reconstructed from its canonical form).
    #[error("payload bytes are not available for chunking")]
    NotPrepared,
}

/// Errors validating a transaction's tag set.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("too many tags: {count} exceeds the limit of {max}")]
    TooMany { count: usize, max: usize },

    #[error("tag name is {len} bytes, limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("tag value is {len} bytes, limit is {max}")]
    ValueTooLong { len: usize, max: usize },
}

/// Errors assembling, signing, or verifying a transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("tag validation failed: {0}")]
    Tags(#[from] TagError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The keystore identity does not match the draft's owner field.
    #[error("keystore owner does not match transaction owner")]
    OwnerMismatch,

    /// The signature does not verify against the recomputed deep hash.
    #[error("transaction signature is invalid")]
    SignatureInvalid,

    /// The id field is not the digest of the signature.
    #[error("transaction id does not match its signature digest")]
    IdMismatch,

    /// Recomputing the chunk tree produced a different root than the
    /// signed data_root (chunking configuration drift).
    #[error("recomputed data root does not match the signed data root")]
    DataRootMismatch,

    #[error("chunk access failed: {0}")]
    Chunks(#[from] ChunkIndexError),
}

/// Errors parsing or emitting the canonical transaction document.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{field}` is not valid base64url: {source}")]
    Field {
        field: &'static str,
        source: EncodingError,
    },

    #[error("field `{field}` is not a decimal integer")]
    Number { field: &'static str },
}
