//! RSA keystore: signing identity and PSS signatures.
//!
//! A keystore owns a 4096-bit RSA keypair. The public modulus is the
//! transaction "owner"; its SHA-256 digest is the wallet address. Key
//! material arrives as opaque big-endian components from an external
//! loader; the on-disk format is not this crate's concern.

use rsa::rand_core::CryptoRngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::crypto::{Address, Owner, TxSignature};
use crate::error::{KeyLoadError, SigningError};

/// Default key strength for generated keys.
pub const DEFAULT_KEY_BITS: usize = 4096;

/// The public exponent used across the network.
pub const PUBLIC_EXPONENT: u64 = 65537;

/// Opaque RSA key components, big-endian, as handed over by an external
/// key-material loader.
#[derive(Clone)]
pub struct KeyComponents {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
    pub private_exponent: Vec<u8>,
    pub prime_p: Vec<u8>,
    pub prime_q: Vec<u8>,
}

impl fmt::Debug for KeyComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private material.
        write!(f, "KeyComponents({} byte modulus)", self.modulus.len())
    }
}

/// A signing identity: private key plus the derived owner and address.
///
/// Owner and address are computed once at construction and never change.
#[derive(Clone)]
pub struct Keystore {
    key: RsaPrivateKey,
    owner: Owner,
    address: Address,
}

impl Keystore {
    /// Build a keystore from loaded key components.
    pub fn from_components(components: &KeyComponents) -> Result<Self, KeyLoadError> {
        for (field, bytes) in [
            ("modulus", &components.modulus),
            ("public_exponent", &components.public_exponent),
            ("private_exponent", &components.private_exponent),
            ("prime_p", &components.prime_p),
            ("prime_q", &components.prime_q),
        ] {
            if bytes.is_empty() {
                return Err(KeyLoadError::MissingComponent { field });
            }
        }

        let mut key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&components.modulus),
            BigUint::from_bytes_be(&components.public_exponent),
            BigUint::from_bytes_be(&components.private_exponent),
            vec![
                BigUint::from_bytes_be(&components.prime_p),
                BigUint::from_bytes_be(&components.prime_q),
            ],
        )
        .map_err(|e| KeyLoadError::InvalidComponents(e.to_string()))?;
        key.precompute()
            .map_err(|e| KeyLoadError::InvalidComponents(e.to_string()))?;

        Ok(Self::from_key(key))
    }

    /// Generate a fresh keypair.
    pub fn generate(bits: usize) -> Result<Self, KeyLoadError> {
        Self::generate_with_rng(&mut rand::thread_rng(), bits)
    }

    /// Generate with a caller-supplied RNG (deterministic in tests).
    pub fn generate_with_rng<R: CryptoRngCore>(rng: &mut R, bits: usize) -> Result<Self, KeyLoadError> {
        let key = RsaPrivateKey::new(rng, bits)
            .map_err(|e| KeyLoadError::InvalidComponents(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: RsaPrivateKey) -> Self {
        let owner = Owner::from_modulus(key.n().to_bytes_be());
        let address = owner.derive_address();
        Self { key, owner, address }
    }

    /// Load one keystore per key-material source, preserving input order.
    ///
    /// A bad source fails its own slot; it never aborts the batch and is
    /// never silently dropped.
    pub fn load_many(
        sources: impl IntoIterator<Item = KeyComponents>,
    ) -> Vec<Result<Keystore, KeyLoadError>> {
        sources
            .into_iter()
            .map(|components| Keystore::from_components(&components))
            .collect()
    }

    /// The public identity (RSA modulus).
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// The wallet address derived from the owner.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Sign a message: RSA-PSS over SHA-256(message), salt length equal
    /// to the digest length.
    ///
    /// Signature bytes differ between calls (PSS salt); verification is
    /// deterministic.
    pub fn sign(&self, message: &[u8]) -> Result<TxSignature, SigningError> {
        let digest = Sha256::digest(message);
        let signature = self
            .key
            .sign_with_rng(&mut rand::thread_rng(), Pss::new::<Sha256>(), &digest)
            .map_err(|e| SigningError::Rsa(e.to_string()))?;
        Ok(TxSignature::from_bytes(signature))
    }

    /// Export the key components (for fixtures and external persistence).
    pub fn components(&self) -> KeyComponents {
        let primes = self.key.primes();
        KeyComponents {
            modulus: self.key.n().to_bytes_be(),
            public_exponent: self.key.e().to_bytes_be(),
            private_exponent: self.key.d().to_bytes_be(),
            prime_p: primes[0].to_bytes_be(),
            prime_q: primes[1].to_bytes_be(),
        }
    }
}

impl fmt::Debug for Keystore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keystore({:?})", self.address)
    }
}

/// Verify an RSA-PSS signature against an owner's public identity.
///
/// Owners carry only the modulus on the wire; the network-wide public
/// exponent is assumed.
pub fn verify_signature(
    owner: &Owner,
    message: &[u8],
    signature: &TxSignature,
) -> Result<(), SigningError> {
    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(owner.as_bytes()),
        BigUint::from(PUBLIC_EXPONENT),
    )
    .map_err(|e| SigningError::InvalidOwner(e.to_string()))?;
    let digest = Sha256::digest(message);
    key.verify(Pss::new::<Sha256>(), &digest, signature.as_bytes())
        .map_err(|_| SigningError::Verification)
}
