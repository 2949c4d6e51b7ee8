//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. RSA key generation is the
//! expensive part of any fixture, so one deterministic keystore is shared
//! per process; fixtures that need distinct identities pay for their own
//! generation.

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::SeedableRng;

use permaweave::{Client, ClientConfig};
use permaweave_core::{
    ChunkerConfig, DraftTransaction, Keystore, LastTx, SignedTransaction, MAX_CHUNK_SIZE,
};
use permaweave_net::gateway::memory::MemoryGateway;

/// The process-wide deterministic test keystore (2048-bit: same code
/// paths as 4096, far cheaper to generate).
pub fn shared_keystore() -> &'static Keystore {
    static KEY: OnceLock<Keystore> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x7e57);
        Keystore::generate_with_rng(&mut rng, 2048).expect("test keygen")
    })
}

/// A test fixture with a keystore and a scriptable memory gateway.
pub struct TestFixture {
    pub keystore: Keystore,
    pub gateway: MemoryGateway,
}

impl TestFixture {
    /// Create a fixture over the shared keystore.
    pub fn new() -> Self {
        Self {
            keystore: shared_keystore().clone(),
            gateway: MemoryGateway::new(),
        }
    }

    /// Create a fixture with its own deterministic identity.
    ///
    /// Generates a fresh RSA key; noticeably slower than [`Self::new`].
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            keystore: Keystore::generate_with_rng(&mut rng, 2048).expect("test keygen"),
            gateway: MemoryGateway::new(),
        }
    }

    /// A client over this fixture's keystore and gateway. The fixture
    /// keeps its own gateway handle, so test hooks stay reachable.
    pub fn client(&self, config: ClientConfig) -> Client<MemoryGateway> {
        Client::new(self.keystore.clone(), self.gateway.clone(), config)
    }

    /// A draft data transaction for this identity.
    pub fn make_draft(&self, payload: &[u8]) -> DraftTransaction {
        DraftTransaction::with_data(self.keystore.owner().clone(), payload.to_vec())
    }

    /// Sign a payload locally: empty last reference, fixed reward, no
    /// network involved.
    pub fn make_signed(&self, payload: &[u8]) -> SignedTransaction {
        let draft = self.make_draft(payload);
        let chunks = draft.prepare_chunks(&ChunkerConfig::default());
        draft
            .sign(&self.keystore, LastTx::empty(), 1_000, &chunks, MAX_CHUNK_SIZE)
            .expect("fixture signing")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple fixtures with distinct identities for multi-party
/// tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_seed(0x9000 + i as u64))
        .collect()
}
