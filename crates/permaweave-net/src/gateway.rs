//! Gateway collaborator contract.
//!
//! The gateway is the external network edge: it quotes prices, anchors
//! last references, accepts transaction documents and proven chunks, and
//! answers status queries. The HTTP stack itself lives outside this
//! crate; implementations plug in behind the [`Gateway`] trait.
//!
//! Implementations must be thread-safe (Send + Sync).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use permaweave_core::chunks::Proof;
use permaweave_core::{Address, CanonicalTransaction, LastTx, Sha256Hash, TxId};

use crate::error::GatewayError;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// A proven chunk upload: the bytes, where they sit, and the inclusion
/// proof tying them to the declared data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkUpload {
    pub data_root: Sha256Hash,
    pub data_size: u64,
    /// Absolute offset of the chunk's first byte within the payload.
    pub offset: u64,
    pub data: Bytes,
    pub proof: Proof,
}

/// What the network currently knows about a transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    /// Accepted but not yet in a confirmed block.
    Pending,
    /// In the ledger, with the given number of confirming blocks.
    Confirmed { confirmations: u64 },
    /// Never seen (or dropped).
    NotFound,
}

/// A snapshot of the network's view of itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub height: u64,
    pub peers: u64,
}

/// The network gateway collaborator.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Quote the price (in base units) for storing `data_size` bytes.
    async fn price(&self, data_size: u64) -> Result<u128>;

    /// The anti-replay reference for an address's next transaction.
    async fn last_transaction(&self, address: &Address) -> Result<LastTx>;

    /// Submit a signed transaction document.
    async fn submit_transaction(&self, form: &CanonicalTransaction) -> Result<()>;

    /// Upload one proven chunk of a previously submitted transaction.
    async fn submit_chunk(&self, upload: &ChunkUpload) -> Result<()>;

    /// Current status of a transaction id.
    async fn status(&self, id: &TxId) -> Result<GatewayStatus>;

    /// Fetch the stored payload of a transaction.
    async fn data(&self, id: &TxId) -> Result<Bytes>;

    /// Network self-description.
    async fn network_info(&self) -> Result<NetworkInfo>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for std::sync::Arc<G> {
    async fn price(&self, data_size: u64) -> Result<u128> {
        (**self).price(data_size).await
    }

    async fn last_transaction(&self, address: &Address) -> Result<LastTx> {
        (**self).last_transaction(address).await
    }

    async fn submit_transaction(&self, form: &CanonicalTransaction) -> Result<()> {
        (**self).submit_transaction(form).await
    }

    async fn submit_chunk(&self, upload: &ChunkUpload) -> Result<()> {
        (**self).submit_chunk(upload).await
    }

    async fn status(&self, id: &TxId) -> Result<GatewayStatus> {
        (**self).status(id).await
    }

    async fn data(&self, id: &TxId) -> Result<Bytes> {
        (**self).data(id).await
    }

    async fn network_info(&self) -> Result<NetworkInfo> {
        (**self).network_info().await
    }
}

/// A scriptable in-memory gateway for tests.
///
/// Behaves like a well-formed network node: it validates chunk proofs,
/// tracks last references per address, and serves stored data back. Test
/// hooks inject faults, rejections, and confirmation schedules.
pub mod memory {
    use super::*;
    use permaweave_core::{b64_decode, verify_proof};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// An endpoint of the gateway, for fault injection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Endpoint {
        Price,
        LastTx,
        Submit,
        Chunk,
        Status,
        Data,
        Info,
    }

    #[derive(Debug, Clone, Copy)]
    struct StatusScript {
        /// Polls answered `Pending` before flipping to `Confirmed`.
        pending_polls: u64,
        confirmations: u64,
    }

    #[derive(Default)]
    struct State {
        price_per_byte: u128,
        base_price: u128,
        height: u64,
        peers: u64,
        last_tx: HashMap<Address, LastTx>,
        txs: HashMap<TxId, CanonicalTransaction>,
        order: Vec<TxId>,
        chunks: HashMap<Sha256Hash, Vec<ChunkUpload>>,
        status: HashMap<TxId, StatusScript>,
        rejections: HashMap<TxId, String>,
        faults: HashMap<Endpoint, u32>,
    }

    /// In-memory gateway implementation.
    #[derive(Clone)]
    pub struct MemoryGateway {
        state: Arc<Mutex<State>>,
    }

    impl MemoryGateway {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    price_per_byte: 10,
                    base_price: 1_000,
                    height: 1_000_000,
                    peers: 16,
                    ..State::default()
                })),
            }
        }

        /// Set the price model: `base + per_byte * size`.
        pub async fn set_price(&self, per_byte: u128, base: u128) {
            let mut state = self.state.lock().await;
            state.price_per_byte = per_byte;
            state.base_price = base;
        }

        /// Seed the last reference for an address.
        pub async fn set_last_tx(&self, address: Address, last: LastTx) {
            self.state.lock().await.last_tx.insert(address, last);
        }

        /// Make the next `count` calls to `endpoint` fail transiently.
        pub async fn fail_next(&self, endpoint: Endpoint, count: u32) {
            self.state.lock().await.faults.insert(endpoint, count);
        }

        /// Reject submission of a specific transaction id.
        pub async fn reject_id(&self, id: TxId, reason: &str) {
            self.state.lock().await.rejections.insert(id, reason.to_string());
        }

        /// Confirm a transaction after `polls` further status queries.
        pub async fn confirm_after(&self, id: TxId, polls: u64, confirmations: u64) {
            self.state.lock().await.status.insert(
                id,
                StatusScript {
                    pending_polls: polls,
                    confirmations,
                },
            );
        }

        /// Drop a transaction entirely, as if it fell out of the mempool.
        pub async fn drop_transaction(&self, id: &TxId) {
            let mut state = self.state.lock().await;
            state.txs.remove(id);
            state.status.remove(id);
        }

        /// Ids accepted so far, in submission order.
        pub async fn submitted_ids(&self) -> Vec<TxId> {
            self.state.lock().await.order.clone()
        }

        /// The stored document for an accepted transaction.
        pub async fn stored_transaction(&self, id: &TxId) -> Option<CanonicalTransaction> {
            self.state.lock().await.txs.get(id).cloned()
        }

        /// Number of chunks stored under a data root.
        pub async fn chunk_count(&self, root: &Sha256Hash) -> usize {
            self.state
                .lock()
                .await
                .chunks
                .get(root)
                .map_or(0, Vec::len)
        }

        pub async fn set_network_info(&self, height: u64, peers: u64) {
            let mut state = self.state.lock().await;
            state.height = height;
            state.peers = peers;
        }

        fn check_fault(state: &mut State, endpoint: Endpoint) -> Result<()> {
            if let Some(remaining) = state.faults.get_mut(&endpoint) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(GatewayError::Unavailable("injected fault".into()));
                }
            }
            Ok(())
        }
    }

    impl Default for MemoryGateway {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Gateway for MemoryGateway {
        async fn price(&self, data_size: u64) -> Result<u128> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::Price)?;
            Ok(state.base_price + state.price_per_byte * data_size as u128)
        }

        async fn last_transaction(&self, address: &Address) -> Result<LastTx> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::LastTx)?;
            Ok(state
                .last_tx
                .get(address)
                .cloned()
                .unwrap_or_else(LastTx::empty))
        }

        async fn submit_transaction(&self, form: &CanonicalTransaction) -> Result<()> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::Submit)?;

            let id = form
                .parsed_id()
                .map_err(|e| GatewayError::Malformed(e.to_string()))?;
            if let Some(reason) = state.rejections.get(&id) {
                return Err(GatewayError::Rejected(reason.clone()));
            }

            // Accepted: becomes the owner's new last reference.
            let owner = form
                .parsed_owner()
                .map_err(|e| GatewayError::Malformed(e.to_string()))?;
            state.last_tx.insert(owner.derive_address(), LastTx::from(id));

            state.txs.insert(id, form.clone());
            state.order.push(id);
            state.status.entry(id).or_insert(StatusScript {
                pending_polls: u64::MAX,
                confirmations: 2,
            });
            Ok(())
        }

        async fn submit_chunk(&self, upload: &ChunkUpload) -> Result<()> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::Chunk)?;

            let digest = Sha256Hash::hash(&upload.data);
            let max_offset = upload.offset + upload.data.len() as u64;
            if !verify_proof(
                &upload.data_root,
                upload.data_size,
                &digest,
                max_offset,
                &upload.proof,
            ) {
                return Err(GatewayError::Rejected("invalid chunk proof".into()));
            }

            state
                .chunks
                .entry(upload.data_root)
                .or_default()
                .push(upload.clone());
            Ok(())
        }

        async fn status(&self, id: &TxId) -> Result<GatewayStatus> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::Status)?;

            match state.status.get_mut(id) {
                None => Ok(GatewayStatus::NotFound),
                Some(script) => {
                    if script.pending_polls > 0 {
                        script.pending_polls -= 1;
                        Ok(GatewayStatus::Pending)
                    } else {
                        Ok(GatewayStatus::Confirmed {
                            confirmations: script.confirmations,
                        })
                    }
                }
            }
        }

        async fn data(&self, id: &TxId) -> Result<Bytes> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::Data)?;

            let form = state.txs.get(id).ok_or(GatewayError::NotFound)?;
            if !form.data.is_empty() {
                let bytes = b64_decode(&form.data)
                    .map_err(|e| GatewayError::Malformed(e.to_string()))?;
                return Ok(Bytes::from(bytes));
            }
            if form.data_root.is_empty() {
                return Ok(Bytes::new());
            }

            let root = Sha256Hash::from_b64(&form.data_root)
                .map_err(|e| GatewayError::Malformed(e.to_string()))?;
            let mut uploads = state
                .chunks
                .get(&root)
                .ok_or(GatewayError::NotFound)?
                .clone();
            uploads.sort_by_key(|u| u.offset);

            let mut payload = Vec::new();
            for upload in &uploads {
                payload.extend_from_slice(&upload.data);
            }
            Ok(Bytes::from(payload))
        }

        async fn network_info(&self) -> Result<NetworkInfo> {
            let mut state = self.state.lock().await;
            Self::check_fault(&mut state, Endpoint::Info)?;
            Ok(NetworkInfo {
                height: state.height,
                peers: state.peers,
            })
        }
    }
}
