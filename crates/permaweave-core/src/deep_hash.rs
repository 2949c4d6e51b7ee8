//! Canonical recursive digest over nested blob/list structures.
//!
//! The deep hash is the pre-signature message digest: the transaction's
//! signable fields are arranged into a nested list-of-blobs value and
//! folded into a single SHA-256 digest. The nesting must mirror the
//! field order exactly; reordering or omitting a field changes the digest
//! and invalidates the signature.
//!
//! Encoding (v1 policy):
//! - blob: `H(b"blob" || ascii-decimal(byte_len) || H(bytes))`
//! - list: fold from `H(b"list" || ascii-decimal(item_count))`, each step
//!   `H(acc || deep_hash(item))`
//!
//! The tag constants live here and nowhere else, so a future network
//! revision of the encoding is a single swap.

use sha2::{Digest, Sha256};

use crate::crypto::Sha256Hash;

/// Tag prefix for byte-string values.
pub const BLOB_TAG: &[u8] = b"blob";

/// Tag prefix for list values.
pub const LIST_TAG: &[u8] = b"list";

/// A value in the deep-hash tree: either raw bytes or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepHashItem {
    Blob(Vec<u8>),
    List(Vec<DeepHashItem>),
}

impl DeepHashItem {
    /// Create a blob item from bytes.
    pub fn blob(bytes: impl AsRef<[u8]>) -> Self {
        Self::Blob(bytes.as_ref().to_vec())
    }

    /// Create a list item.
    pub fn list(items: Vec<DeepHashItem>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<u8>> for DeepHashItem {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

/// Compute the deep hash of a value.
pub fn deep_hash(item: &DeepHashItem) -> Sha256Hash {
    match item {
        DeepHashItem::Blob(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(BLOB_TAG);
            hasher.update(bytes.len().to_string().as_bytes());
            hasher.update(Sha256Hash::hash(bytes).as_bytes());
            Sha256Hash(hasher.finalize().into())
        }
        DeepHashItem::List(items) => {
            let mut tag = Vec::with_capacity(LIST_TAG.len() + 20);
            tag.extend_from_slice(LIST_TAG);
            tag.extend_from_slice(items.len().to_string().as_bytes());
            let mut acc = Sha256Hash::hash(&tag);
            for item in items {
                let mut hasher = Sha256::new();
                hasher.update(acc.as_bytes());
                hasher.update(deep_hash(item).as_bytes());
                acc = Sha256Hash(hasher.finalize().into());
            }
            acc
        }
    }
}
