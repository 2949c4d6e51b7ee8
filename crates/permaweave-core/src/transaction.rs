//! Transaction assembly and signing.
//!
//! A transaction is mutable only while it is a [`DraftTransaction`].
//! [`DraftTransaction::sign`] is the one-way transition to a
//! [`SignedTransaction`], whose canonical fields are frozen by the type
//! system; changing any of them invalidates the signature.
//!
//! The signed message is the deep hash of the field list
//! `[owner, target, quantity, reward, last_tx, tags, data_size,
//! data_root]`, and the transaction id is the SHA-256 digest of the
//! signature bytes.

use bytes::Bytes;
use std::collections::BTreeMap;

use crate::chunks::{ChunkTree, ChunkerConfig};
use crate::crypto::{Address, LastTx, Owner, Sha256Hash, TxId, TxSignature};
use crate::deep_hash::{deep_hash, DeepHashItem};
use crate::error::{ChunkIndexError, TransactionError};
use crate::keystore::{verify_signature, Keystore};
use crate::tag::{tags_to_deep_hash_item, validate_tags, Tag};

/// A transaction under construction. Everything is still mutable.
#[derive(Debug, Clone)]
pub struct DraftTransaction {
    owner: Owner,
    target: Option<Address>,
    quantity: u128,
    reward: Option<u128>,
    tags: Vec<Tag>,
    data: Bytes,
    metadata: BTreeMap<String, String>,
    scheduled_at: Option<i64>,
}

impl DraftTransaction {
    /// Start an empty draft for the given identity.
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            target: None,
            quantity: 0,
            reward: None,
            tags: Vec::new(),
            data: Bytes::new(),
            metadata: BTreeMap::new(),
            scheduled_at: None,
        }
    }

    /// A draft carrying a data payload.
    pub fn with_data(owner: Owner, data: impl Into<Bytes>) -> Self {
        let mut draft = Self::new(owner);
        draft.data = data.into();
        draft
    }

    /// A value transfer draft (no payload).
    pub fn transfer(owner: Owner, target: Address, quantity: u128) -> Self {
        let mut draft = Self::new(owner);
        draft.target = Some(target);
        draft.quantity = quantity;
        draft
    }

    /// Append a tag. Insertion order is preserved and signed.
    pub fn add_tag(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Attach client-local annotations. Never transmitted, never signed.
    pub fn add_metadata(&mut self, entries: BTreeMap<String, String>) -> &mut Self {
        self.metadata.extend(entries);
        self
    }

    /// Gate submission until the given unix timestamp (client-local).
    pub fn schedule_at(&mut self, unix_seconds: i64) -> &mut Self {
        self.scheduled_at = Some(unix_seconds);
        self
    }

    /// Set the recipient.
    pub fn set_target(&mut self, target: Address) -> &mut Self {
        self.target = Some(target);
        self
    }

    /// Set the transferred amount, in base units.
    pub fn set_quantity(&mut self, quantity: u128) -> &mut Self {
        self.quantity = quantity;
        self
    }

    /// Supply an explicit reward, skipping fee estimation.
    pub fn set_reward(&mut self, reward: u128) -> &mut Self {
        self.reward = Some(reward);
        self
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn target(&self) -> Option<&Address> {
        self.target.as_ref()
    }

    pub fn quantity(&self) -> u128 {
        self.quantity
    }

    /// The explicit reward override, if any.
    pub fn reward(&self) -> Option<u128> {
        self.reward
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn scheduled_at(&self) -> Option<i64> {
        self.scheduled_at
    }

    /// Chunk the payload. Must run before fee estimation for chunked
    /// transactions: the reward covers the final byte accounting.
    pub fn prepare_chunks(&self, config: &ChunkerConfig) -> ChunkTree {
        ChunkTree::build(self.data.clone(), config)
    }

    /// Sign the draft and freeze it.
    ///
    /// `chunks` must be the tree built over this draft's payload (see
    /// [`Self::prepare_chunks`]); its root becomes the signed data root.
    /// Payloads at or below `inline_threshold` bytes additionally travel
    /// inline in the canonical form.
    pub fn sign(
        self,
        keystore: &Keystore,
        last_tx: LastTx,
        reward: u128,
        chunks: &ChunkTree,
        inline_threshold: usize,
    ) -> Result<SignedTransaction, TransactionError> {
        validate_tags(&self.tags)?;
        if keystore.owner() != &self.owner {
            return Err(TransactionError::OwnerMismatch);
        }

        let data_size = self.data.len() as u64;
        debug_assert_eq!(data_size, chunks.data_size());
        let data_root = (!chunks.is_empty()).then(|| chunks.root());

        let message = signable_item(
            &self.owner,
            self.target.as_ref(),
            self.quantity,
            reward,
            &last_tx,
            &self.tags,
            data_size,
            data_root.as_ref(),
        );
        let digest = deep_hash(&message);
        let signature = keystore.sign(digest.as_bytes())?;
        let id = signature.tx_id();

        Ok(SignedTransaction {
            id,
            owner: self.owner,
            target: self.target,
            quantity: self.quantity,
            reward,
            last_tx,
            tags: self.tags,
            data: Some(self.data.clone()),
            data_root,
            data_size,
            inline: self.data.len() <= inline_threshold,
            signature,
            metadata: self.metadata,
            scheduled_at: self.scheduled_at,
        })
    }
}

/// A signed, frozen transaction.
///
/// Canonical fields are immutable from here on; the only way to "change"
/// one is to build and sign a new draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub(crate) id: TxId,
    pub(crate) owner: Owner,
    pub(crate) target: Option<Address>,
    pub(crate) quantity: u128,
    pub(crate) reward: u128,
    pub(crate) last_tx: LastTx,
    pub(crate) tags: Vec<Tag>,
    /// Full payload bytes, if available locally. `None` for a record
    /// reconstructed from a chunked canonical form.
    pub(crate) data: Option<Bytes>,
    pub(crate) data_root: Option<Sha256Hash>,
    pub(crate) data_size: u64,
    /// Whether the payload travels inline in the canonical form.
    pub(crate) inline: bool,
    pub(crate) signature: TxSignature,
    // Client-local, unsigned, untransmitted.
    pub(crate) metadata: BTreeMap<String, String>,
    pub(crate) scheduled_at: Option<i64>,
}

impl SignedTransaction {
    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn target(&self) -> Option<&Address> {
        self.target.as_ref()
    }

    pub fn quantity(&self) -> u128 {
        self.quantity
    }

    pub fn reward(&self) -> u128 {
        self.reward
    }

    pub fn last_tx(&self) -> &LastTx {
        &self.last_tx
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Local payload bytes, if this record still has them.
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn data_root(&self) -> Option<&Sha256Hash> {
        self.data_root.as_ref()
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// True if the payload travels inside the canonical form.
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn scheduled_at(&self) -> Option<i64> {
        self.scheduled_at
    }

    /// Rebuild the chunk tree for uploading this transaction's payload.
    ///
    /// Fails if the payload bytes are not held locally, or if the
    /// recomputed root disagrees with the signed data root (which means
    /// the chunking configuration differs from signing time).
    pub fn chunks(&self, config: &ChunkerConfig) -> Result<ChunkTree, TransactionError> {
        let data = self.data.as_ref().ok_or(ChunkIndexError::NotPrepared)?;
        let tree = ChunkTree::build(data.clone(), config);
        if self.data_root != (!tree.is_empty()).then(|| tree.root()) {
            return Err(TransactionError::DataRootMismatch);
        }
        Ok(tree)
    }

    /// The deep-hash value this transaction's signature covers.
    pub fn signable_item(&self) -> DeepHashItem {
        signable_item(
            &self.owner,
            self.target.as_ref(),
            self.quantity,
            self.reward,
            &self.last_tx,
            &self.tags,
            self.data_size,
            self.data_root.as_ref(),
        )
    }

    /// Verify the signature against the recomputed deep hash, and the id
    /// against the signature digest.
    pub fn verify(&self) -> Result<(), TransactionError> {
        let digest = deep_hash(&self.signable_item());
        verify_signature(&self.owner, digest.as_bytes(), &self.signature)
            .map_err(|_| TransactionError::SignatureInvalid)?;
        if self.signature.tx_id() != self.id {
            return Err(TransactionError::IdMismatch);
        }
        Ok(())
    }
}

/// The canonical signable field list. Field order is the protocol;
/// any change here is a network-breaking change.
#[allow(clippy::too_many_arguments)]
fn signable_item(
    owner: &Owner,
    target: Option<&Address>,
    quantity: u128,
    reward: u128,
    last_tx: &LastTx,
    tags: &[Tag],
    data_size: u64,
    data_root: Option<&Sha256Hash>,
) -> DeepHashItem {
    DeepHashItem::list(vec![
        DeepHashItem::blob(owner.as_bytes()),
        DeepHashItem::blob(target.map(|t| t.as_bytes().as_slice()).unwrap_or(&[])),
        DeepHashItem::blob(quantity.to_string().as_bytes()),
        DeepHashItem::blob(reward.to_string().as_bytes()),
        DeepHashItem::blob(last_tx.as_bytes()),
        tags_to_deep_hash_item(tags),
        DeepHashItem::blob(data_size.to_string().as_bytes()),
        DeepHashItem::blob(data_root.map(|r| r.as_bytes().as_slice()).unwrap_or(&[])),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::MAX_CHUNK_SIZE;
    use crate::error::TagError;
    use crate::test_util::test_keystore;

    fn signed_with_data(data: &[u8]) -> SignedTransaction {
        let ks = test_keystore();
        let draft = DraftTransaction::with_data(ks.owner().clone(), data.to_vec());
        let chunks = draft.prepare_chunks(&ChunkerConfig::default());
        draft
            .sign(ks, LastTx::empty(), 1000, &chunks, MAX_CHUNK_SIZE)
            .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let tx = signed_with_data(b"This is test data.");
        tx.verify().expect("fresh signature verifies");
        assert_eq!(tx.data_size(), 18);
        assert!(tx.is_inline());
        assert_eq!(tx.id(), tx.signature().tx_id());
    }

    #[test]
    fn test_small_payload_single_chunk_inline() {
        let ks = test_keystore();
        let draft = DraftTransaction::with_data(ks.owner().clone(), b"This is test data.".to_vec());
        let chunks = draft.prepare_chunks(&ChunkerConfig::default());
        assert_eq!(chunks.chunk_count(), 1);

        let tx = draft
            .sign(ks, LastTx::empty(), 1000, &chunks, MAX_CHUNK_SIZE)
            .unwrap();
        assert!(tx.is_inline());
        assert_eq!(tx.data_size(), 18);
        assert_eq!(tx.data_root(), Some(&chunks.root()));
    }

    #[test]
    fn test_large_payload_not_inline() {
        let data: Vec<u8> = (0..MAX_CHUNK_SIZE + 1).map(|i| (i % 251) as u8).collect();
        let tx = signed_with_data(&data);
        assert!(!tx.is_inline());
        assert!(tx.data_root().is_some());
        tx.verify().unwrap();
    }

    #[test]
    fn test_transfer_has_no_data_root() {
        let ks = test_keystore();
        let target = Address::from_bytes([0x11; 32]);
        let draft = DraftTransaction::transfer(ks.owner().clone(), target, 5_000_000);
        let chunks = draft.prepare_chunks(&ChunkerConfig::default());

        let tx = draft
            .sign(ks, LastTx::empty(), 1000, &chunks, MAX_CHUNK_SIZE)
            .unwrap();
        assert_eq!(tx.data_size(), 0);
        assert_eq!(tx.data_root(), None);
        assert_eq!(tx.quantity(), 5_000_000);
        tx.verify().unwrap();
    }

    #[test]
    fn test_owner_mismatch_rejected() {
        let ks = test_keystore();
        let draft = DraftTransaction::new(Owner::from_modulus(vec![0xab; 256]));
        let chunks = draft.prepare_chunks(&ChunkerConfig::default());
        assert!(matches!(
            draft.sign(ks, LastTx::empty(), 1, &chunks, MAX_CHUNK_SIZE),
            Err(TransactionError::OwnerMismatch)
        ));
    }

    #[test]
    fn test_tag_limits_enforced_at_sign() {
        let ks = test_keystore();
        let mut draft = DraftTransaction::new(ks.owner().clone());
        draft.add_tag("k", vec![0u8; crate::tag::MAX_VALUE_LEN + 1]);
        let chunks = draft.prepare_chunks(&ChunkerConfig::default());
        assert!(matches!(
            draft.sign(ks, LastTx::empty(), 1, &chunks, MAX_CHUNK_SIZE),
            Err(TransactionError::Tags(TagError::ValueTooLong { .. }))
        ));
    }

    #[test]
    fn test_tags_are_signed_in_order() {
        let ks = test_keystore();
        let mut d1 = DraftTransaction::new(ks.owner().clone());
        d1.add_tag("a", "1").add_tag("b", "2");
        let mut d2 = DraftTransaction::new(ks.owner().clone());
        d2.add_tag("b", "2").add_tag("a", "1");

        let c1 = d1.prepare_chunks(&ChunkerConfig::default());
        let t1 = d1.sign(ks, LastTx::empty(), 1, &c1, MAX_CHUNK_SIZE).unwrap();
        let c2 = d2.prepare_chunks(&ChunkerConfig::default());
        let t2 = d2.sign(ks, LastTx::empty(), 1, &c2, MAX_CHUNK_SIZE).unwrap();

        assert_ne!(
            deep_hash(&t1.signable_item()),
            deep_hash(&t2.signable_item())
        );
    }

    #[test]
    fn test_metadata_not_part_of_signed_message() {
        let ks = test_keystore();
        let mut with_meta = DraftTransaction::with_data(ks.owner().clone(), b"same".to_vec());
        with_meta.add_metadata(BTreeMap::from([("note".into(), "local only".into())]));
        with_meta.schedule_at(1_900_000_000);
        let plain = DraftTransaction::with_data(ks.owner().clone(), b"same".to_vec());

        let cm = with_meta.prepare_chunks(&ChunkerConfig::default());
        let tm = with_meta
            .sign(ks, LastTx::empty(), 7, &cm, MAX_CHUNK_SIZE)
            .unwrap();
        let cp = plain.prepare_chunks(&ChunkerConfig::default());
        let tp = plain.sign(ks, LastTx::empty(), 7, &cp, MAX_CHUNK_SIZE).unwrap();

        assert_eq!(
            deep_hash(&tm.signable_item()),
            deep_hash(&tp.signable_item())
        );
    }

    #[test]
    fn test_chunks_rebuild_matches_signed_root() {
        let data: Vec<u8> = (0..600_000).map(|i| (i % 241) as u8).collect();
        let tx = signed_with_data(&data);
        let tree = tx.chunks(&ChunkerConfig::default()).unwrap();
        assert_eq!(Some(&tree.root()), tx.data_root());
    }

    #[test]
    fn test_chunks_config_drift_detected() {
        let data: Vec<u8> = (0..600_000).map(|i| (i % 241) as u8).collect();
        let tx = signed_with_data(&data);
        let smaller = ChunkerConfig {
            max_chunk_size: 64 * 1024,
            min_chunk_size: 8 * 1024,
            parallel: false,
        };
        assert!(matches!(
            tx.chunks(&smaller),
            Err(TransactionError::DataRootMismatch)
        ));
    }
}
