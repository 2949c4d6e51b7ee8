//! The Client: unified API over keystore and gateway.
//!
//! The client wires the pure core (assembly, chunking, signing) to the
//! network collaborators (fee quotes, last references, submission,
//! status). All configuration is explicit and threaded in at
//! construction; there are no process-wide defaults.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use permaweave_core::{
    Address, ChunkerConfig, DraftTransaction, Keystore, Owner, SignedTransaction,
    TransactionError, TxId, MAX_CHUNK_SIZE,
};
use permaweave_net::{
    with_retry, BatchOutcome, CancelToken, ChunkUpload, ConfirmationRecord, ConfirmationTracker,
    FeeConfig, FeeEstimator, Gateway, NetworkInfo, RetryPolicy, SubmissionError, TrackError,
    TrackerConfig,
};

use crate::error::{ClientError, Result};
use crate::lifecycle::{Transaction, TxStage};

/// Configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Payloads at or below this many bytes travel inline in the
    /// canonical form; larger payloads upload as proven chunks.
    pub inline_threshold: usize,
    /// Chunking behavior.
    pub chunker: ChunkerConfig,
    /// Fee estimation behavior.
    pub fees: FeeConfig,
    /// Retry budget for gateway calls.
    pub retry: RetryPolicy,
    /// Confirmation polling behavior.
    pub tracker: TrackerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            inline_threshold: MAX_CHUNK_SIZE,
            chunker: ChunkerConfig::default(),
            fees: FeeConfig::default(),
            retry: RetryPolicy::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

/// The unified Permaweave client.
///
/// Provides:
/// - Draft construction for data and transfer transactions
/// - Signing (last-reference fetch + fee estimation + deep hash + PSS)
/// - Submission, including chunked payload upload
/// - Confirmation tracking and batch submission
pub struct Client<G: Gateway> {
    keystore: Arc<Keystore>,
    gateway: Arc<G>,
    config: ClientConfig,
    fees: FeeEstimator<Arc<G>>,
    tracker: ConfirmationTracker<Arc<G>>,
}

impl<G: Gateway> Client<G> {
    /// Create a client over a keystore and gateway.
    pub fn new(keystore: Keystore, gateway: G, config: ClientConfig) -> Self {
        let gateway = Arc::new(gateway);
        let fees = FeeEstimator::new(
            Arc::clone(&gateway),
            config.fees.clone(),
            config.retry.clone(),
        );
        let tracker = ConfirmationTracker::new(
            Arc::clone(&gateway),
            config.tracker.clone(),
            config.retry.clone(),
        );
        Self {
            keystore: Arc::new(keystore),
            gateway,
            config,
            fees,
            tracker,
        }
    }

    /// The signing identity.
    pub fn owner(&self) -> &Owner {
        self.keystore.owner()
    }

    /// The wallet address.
    pub fn address(&self) -> &Address {
        self.keystore.address()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Draft construction
    // ─────────────────────────────────────────────────────────────────────

    /// Start a data transaction for this identity.
    pub fn data_transaction(&self, data: impl Into<Bytes>) -> DraftTransaction {
        DraftTransaction::with_data(self.keystore.owner().clone(), data)
    }

    /// Start a value transfer for this identity.
    pub fn transfer_transaction(&self, target: Address, quantity: u128) -> DraftTransaction {
        DraftTransaction::transfer(self.keystore.owner().clone(), target, quantity)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sign / submit
    // ─────────────────────────────────────────────────────────────────────

    /// Sign a draft: chunk the payload, price it (unless the draft
    /// carries an explicit reward), fetch the last reference, and freeze.
    pub async fn sign(&self, draft: DraftTransaction) -> Result<SignedTransaction> {
        // Chunking runs before fee estimation: the reward covers the
        // final byte accounting.
        let chunks = draft.prepare_chunks(&self.config.chunker);

        let reward = match draft.reward() {
            Some(explicit) => explicit,
            None => self.fees.estimate(chunks.data_size()).await?,
        };

        let last_tx = with_retry(&self.config.retry, || {
            self.gateway.last_transaction(self.keystore.address())
        })
        .await
        .map_err(|(attempts, source)| ClientError::LastTxLookup { attempts, source })?;

        let signed = draft.sign(
            &self.keystore,
            last_tx,
            reward,
            &chunks,
            self.config.inline_threshold,
        )?;
        info!(
            id = %signed.id(),
            data_size = signed.data_size(),
            reward,
            inline = signed.is_inline(),
            "transaction signed"
        );
        Ok(signed)
    }

    /// Submit a signed transaction, uploading its chunks if the payload
    /// does not travel inline.
    ///
    /// Refuses a transaction whose client-local schedule is not due yet.
    pub async fn submit(&self, tx: &SignedTransaction) -> Result<()> {
        if let Some(scheduled_at) = tx.scheduled_at() {
            let now = unix_now();
            if scheduled_at > now {
                return Err(ClientError::NotYetDue { scheduled_at, now });
            }
        }

        self.tracker.submit_form(&tx.to_canonical_form()).await?;
        info!(id = %tx.id(), "transaction accepted by gateway");

        if !tx.is_inline() && tx.data_size() > 0 {
            self.upload_chunks(tx).await?;
        }
        Ok(())
    }

    async fn upload_chunks(&self, tx: &SignedTransaction) -> Result<()> {
        let chunks = tx.chunks(&self.config.chunker)?;
        for index in 0..chunks.chunk_count() {
            let chunk = chunks.get_chunk(index).map_err(TransactionError::from)?;
            let upload = ChunkUpload {
                data_root: chunk.data_root,
                data_size: chunk.data_size,
                offset: chunk.offset,
                data: chunk.bytes,
                proof: chunk.proof,
            };
            with_retry(&self.config.retry, || self.gateway.submit_chunk(&upload))
                .await
                .map_err(|(_, source)| SubmissionError::ChunkUpload { index, source })?;
            debug!(id = %tx.id(), index, "chunk uploaded");
        }
        Ok(())
    }

    /// Submit a set of signed transactions independently, preserving
    /// order. See [`ConfirmationTracker::submit_batch`].
    pub async fn submit_batch(&self, transactions: &[SignedTransaction]) -> Vec<BatchOutcome> {
        self.tracker.submit_batch(transactions).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle-tracked operations
    // ─────────────────────────────────────────────────────────────────────

    /// Sign a tracked transaction in place. A no-op past the draft stage
    /// (signing is idempotent).
    pub async fn sign_tx(&self, tx: &mut Transaction) -> Result<()> {
        let Some(draft) = tx.draft_cloned() else {
            return Ok(());
        };
        let signed = self.sign(draft).await?;
        tx.set_signed(signed);
        Ok(())
    }

    /// Submit a tracked transaction. Legal only in the `Signed` stage.
    pub async fn submit_tx(&self, tx: &mut Transaction) -> Result<()> {
        if tx.stage() != TxStage::Signed {
            return Err(ClientError::InvalidState {
                op: "submit",
                stage: tx.stage(),
            });
        }
        let signed = tx.as_signed().expect("signed in Signed stage").clone();
        match self.submit(&signed).await {
            Ok(()) => {
                tx.mark_submitted();
                Ok(())
            }
            Err(ClientError::Submission(SubmissionError::Rejected { reason })) => {
                tx.mark_failed(reason.clone());
                Err(SubmissionError::Rejected { reason }.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll once and fold the result into the tracked stage.
    ///
    /// A submitted transaction the network no longer knows is marked
    /// failed rather than erroring: it was seen once, then dropped.
    pub async fn refresh_tx(&self, tx: &mut Transaction) -> Result<ConfirmationRecord> {
        let (id, stage) = self.submitted_id(tx, "refresh")?;
        match self.tracker.poll_status(&id).await {
            Ok(record) => {
                tx.apply_record(&record);
                Ok(record)
            }
            Err(TrackError::NotFound(e))
                if matches!(stage, TxStage::Submitted | TxStage::Pending) =>
            {
                tx.mark_failed(e.to_string());
                Ok(ConfirmationRecord {
                    id,
                    status: permaweave_net::TxStatus::Failed,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for a tracked transaction to confirm (or fail, or time out),
    /// folding the outcome into its stage.
    pub async fn await_tx(
        &self,
        tx: &mut Transaction,
        cancel: &CancelToken,
    ) -> Result<ConfirmationRecord> {
        let (id, _) = self.submitted_id(tx, "await")?;
        let record = self.tracker.await_confirmation(&id, cancel).await?;
        tx.apply_record(&record);
        Ok(record)
    }

    fn submitted_id(&self, tx: &Transaction, op: &'static str) -> Result<(TxId, TxStage)> {
        let stage = tx.stage();
        match (tx.id(), stage) {
            (Some(id), TxStage::Submitted | TxStage::Pending | TxStage::Confirmed) => {
                Ok((id, stage))
            }
            _ => Err(ClientError::InvalidState { op, stage }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Network queries
    // ─────────────────────────────────────────────────────────────────────

    /// One status query for an arbitrary id.
    pub async fn poll_status(&self, id: &TxId) -> Result<ConfirmationRecord> {
        Ok(self.tracker.poll_status(id).await?)
    }

    /// Wait for an arbitrary id to confirm.
    pub async fn await_confirmation(
        &self,
        id: &TxId,
        cancel: &CancelToken,
    ) -> Result<ConfirmationRecord> {
        Ok(self.tracker.await_confirmation(id, cancel).await?)
    }

    /// Fetch a transaction's stored payload back from the network.
    pub async fn get_data(&self, id: &TxId) -> Result<Bytes> {
        let data = with_retry(&self.config.retry, || self.gateway.data(id))
            .await
            .map_err(|(_, source)| ClientError::Gateway(source))?;
        Ok(data)
    }

    /// The network's self-description.
    pub async fn network_info(&self) -> Result<NetworkInfo> {
        let info = with_retry(&self.config.retry, || self.gateway.network_info())
            .await
            .map_err(|(_, source)| ClientError::Gateway(source))?;
        Ok(info)
    }
}

/// Current unix time in seconds.
fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs() as i64
}
