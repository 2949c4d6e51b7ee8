//! Hashing and wire-identity primitives.
//!
//! Every digest in the system is SHA-256. Every binary field travels as
//! base64url without padding; the helpers here are the single encode/decode
//! path so the alphabet cannot drift between modules.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::EncodingError;

/// Encode bytes as base64url without padding.
pub fn b64_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

/// Decode base64url (no padding) into bytes.
pub fn b64_decode(s: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(URL_SAFE_NO_PAD.decode(s)?)
}

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 digest of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Convert to base64url string.
    pub fn to_b64(&self) -> String {
        b64_encode(self.0)
    }

    /// Parse from a base64url string.
    pub fn from_b64(s: &str) -> Result<Self, EncodingError> {
        let bytes = b64_decode(s)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| EncodingError::Length {
            expected: 32,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The zero hash (empty-tree sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// The public identity of a signer: the RSA modulus, big-endian.
///
/// 512 bytes for a 4096-bit key. The owner field of every transaction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner(Vec<u8>);

impl Owner {
    /// Create from big-endian modulus bytes.
    pub fn from_modulus(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw modulus bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to base64url string.
    pub fn to_b64(&self) -> String {
        b64_encode(&self.0)
    }

    /// Parse from a base64url string.
    pub fn from_b64(s: &str) -> Result<Self, EncodingError> {
        Ok(Self(b64_decode(s)?))
    }

    /// Derive the address: SHA-256 of the modulus bytes.
    ///
    /// A pure function of the owner; two equal owners always share an
    /// address.
    pub fn derive_address(&self) -> Address {
        Address(*Sha256Hash::hash(&self.0).as_bytes())
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = self.to_b64();
        write!(f, "Owner({}..., {} bytes)", &b64[..b64.len().min(16)], self.0.len())
    }
}

/// A 32-byte wallet address: SHA-256 of the owner modulus, base64url on
/// the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to base64url string.
    pub fn to_b64(&self) -> String {
        b64_encode(self.0)
    }

    /// Parse from a base64url string.
    pub fn from_b64(s: &str) -> Result<Self, EncodingError> {
        let bytes = b64_decode(s)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| EncodingError::Length {
            expected: 32,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_b64()[..16])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b64())
    }
}

/// A 32-byte transaction identifier: SHA-256 of the signature bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to base64url string (the canonical id form).
    pub fn to_b64(&self) -> String {
        b64_encode(self.0)
    }

    /// Parse from a base64url string.
    pub fn from_b64(s: &str) -> Result<Self, EncodingError> {
        let bytes = b64_decode(s)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| EncodingError::Length {
            expected: 32,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_b64()[..16])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b64())
    }
}

/// An RSA-PSS signature. 512 bytes for a 4096-bit key.
///
/// PSS is probabilistic: two signatures over the same message differ,
/// but both verify.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature(Vec<u8>);

impl TxSignature {
    /// Create from raw signature bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to base64url string.
    pub fn to_b64(&self) -> String {
        b64_encode(&self.0)
    }

    /// Parse from a base64url string.
    pub fn from_b64(s: &str) -> Result<Self, EncodingError> {
        Ok(Self(b64_decode(s)?))
    }

    /// Derive the transaction id: SHA-256 of the signature bytes.
    pub fn tx_id(&self) -> TxId {
        TxId(*Sha256Hash::hash(&self.0).as_bytes())
    }
}

impl fmt::Debug for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = self.to_b64();
        write!(f, "TxSignature({}...)", &b64[..b64.len().min(16)])
    }
}

/// The anti-replay pointer to the signer's previous transaction.
///
/// Empty for an identity with no history; otherwise opaque bytes handed
/// back by the gateway (usually a prior transaction id).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTx(Vec<u8>);

impl LastTx {
    /// The empty reference (fresh identity).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if this identity has no prior transaction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to base64url string (empty string for the empty reference).
    pub fn to_b64(&self) -> String {
        b64_encode(&self.0)
    }

    /// Parse from a base64url string.
    pub fn from_b64(s: &str) -> Result<Self, EncodingError> {
        Ok(Self(b64_decode(s)?))
    }
}

impl From<TxId> for LastTx {
    fn from(id: TxId) -> Self {
        Self(id.as_bytes().to_vec())
    }
}

impl fmt::Debug for LastTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "LastTx(empty)")
        } else {
            let b64 = self.to_b64();
            write!(f, "LastTx({})", &b64[..b64.len().min(16)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_deterministic() {
        let data = b"test data";
        let h1 = Sha256Hash::hash(data);
        let h2 = Sha256Hash::hash(data);
        assert_eq!(h1, h2);

        let h3 = Sha256Hash::hash(b"different data");
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_sha256_hash_b64_roundtrip() {
        let h = Sha256Hash::from_bytes([0x42; 32]);
        let recovered = Sha256Hash::from_b64(&h.to_b64()).unwrap();
        assert_eq!(h, recovered);
    }

    #[test]
    fn test_sha256_hash_b64_rejects_wrong_length() {
        let short = b64_encode([0u8; 16]);
        assert!(matches!(
            Sha256Hash::from_b64(&short),
            Err(EncodingError::Length { expected: 32, got: 16 })
        ));
    }

    #[test]
    fn test_address_is_pure_function_of_owner() {
        let owner = Owner::from_modulus(vec![0xab; 512]);
        let a1 = owner.derive_address();
        let a2 = owner.derive_address();
        assert_eq!(a1, a2);

        let other = Owner::from_modulus(vec![0xac; 512]);
        assert_ne!(a1, other.derive_address());
    }

    #[test]
    fn test_tx_id_from_signature() {
        let sig = TxSignature::from_bytes(vec![0x01; 512]);
        let id = sig.tx_id();
        assert_eq!(id.as_bytes(), Sha256Hash::hash(sig.as_bytes()).as_bytes());
    }

    #[test]
    fn test_last_tx_empty_roundtrip() {
        let empty = LastTx::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.to_b64(), "");
        assert_eq!(LastTx::from_b64("").unwrap(), empty);
    }

    #[test]
    fn test_b64_no_padding() {
        // 1-byte input would produce padding in plain base64
        let encoded = b64_encode([0xff]);
        assert!(!encoded.contains('='));
        assert_eq!(b64_decode(&encoded).unwrap(), vec![0xff]);
    }
}
