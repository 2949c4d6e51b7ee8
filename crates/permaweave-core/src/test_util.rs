//! Shared test helpers.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::OnceLock;

use crate::keystore::Keystore;

/// One shared deterministic 2048-bit keystore per test binary.
///
/// Generation is the slow part; signing with it is cheap. 2048 bits keeps
/// the suite fast while exercising the same code paths as 4096.
pub(crate) fn test_keystore() -> &'static Keystore {
    static KEY: OnceLock<Keystore> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        Keystore::generate_with_rng(&mut rng, 2048).expect("test keygen")
    })
}
