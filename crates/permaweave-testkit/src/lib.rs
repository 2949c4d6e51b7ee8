//! # Permaweave Testkit
//!
//! Testing utilities for the Permaweave client.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a shared deterministic keystore and scriptable memory
//!   gateway for fast test setup
//! - **Generators**: proptest strategies for property-based testing
//! - **Vectors**: pinned transaction inputs with structural verification
//!   of the whole signing pipeline
//!
//! ## Fixtures
//!
//! ```rust
//! use permaweave_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let tx = fixture.make_signed(b"hello");
//! tx.verify().unwrap();
//! ```
//!
//! ## Vectors
//!
//! ```rust
//! use permaweave_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use permaweave_testkit::generators::{signed_from_params, TxParams};
//!
//! proptest! {
//!     #[test]
//!     fn verifies(params: TxParams) {
//!         prop_assert!(signed_from_params(&params).verify().is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, shared_keystore, TestFixture};
pub use generators::{signed_from_params, TxParams};
pub use vectors::{all_vectors, sign_vector, verify_all_vectors, Vector};
