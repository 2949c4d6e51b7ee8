//! Payload chunking and Merkle data roots.
//!
//! Large payloads are split into bounded chunks and committed to as a
//! binary Merkle tree over the chunk digests. The tree root (the "data
//! root") stands in for the payload in the signed transaction; each chunk
//! carries an inclusion proof so the network can verify it independently,
//! without the sibling chunks' bytes.
//!
//! The tree is deterministic: the same payload and configuration always
//! produce the same root.

use bytes::Bytes;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::Sha256Hash;
use crate::error::ChunkIndexError;

/// Maximum chunk size: 256 KiB.
pub const MAX_CHUNK_SIZE: usize = 256 * 1024;

/// Minimum size for any chunk that has a neighbor: 32 KiB.
///
/// A payload smaller than this still forms a single valid chunk.
pub const MIN_CHUNK_SIZE: usize = 32 * 1024;

/// Width of an offset marker ("note") in tree hashing, in bytes.
pub const NOTE_SIZE: usize = 32;

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    /// Hash chunk digests on the rayon pool. Output is byte-identical to
    /// the sequential path.
    pub parallel: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: MAX_CHUNK_SIZE,
            min_chunk_size: MIN_CHUNK_SIZE,
            parallel: false,
        }
    }
}

/// A contiguous byte range of the payload with its content digest.
///
/// Offsets are absolute within the payload; `max_offset` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub digest: Sha256Hash,
    pub min_offset: u64,
    pub max_offset: u64,
}

/// Which side of its parent a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// One level of an inclusion proof: the sibling node's id, its maximum
/// offset, and which side it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Sha256Hash,
    pub sibling_max_offset: u64,
    pub side: Side,
}

/// An inclusion proof: sibling steps ordered leaf to root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Proof {
    pub steps: Vec<ProofStep>,
}

/// Bytes per encoded proof step: sibling id, sibling note, side marker.
const PROOF_STEP_LEN: usize = 32 + NOTE_SIZE + 1;

impl Proof {
    /// Number of tree levels the proof climbs.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Encode for the wire: per step, sibling id (32) || sibling note (32)
    /// || side marker (1; 0 = left, 1 = right).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.steps.len() * PROOF_STEP_LEN);
        for step in &self.steps {
            buf.extend_from_slice(step.sibling.as_bytes());
            buf.extend_from_slice(&note(step.sibling_max_offset));
            buf.push(match step.side {
                Side::Left => 0,
                Side::Right => 1,
            });
        }
        buf
    }

    /// Decode from the wire encoding. Returns `None` on malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % PROOF_STEP_LEN != 0 {
            return None;
        }
        let mut steps = Vec::with_capacity(bytes.len() / PROOF_STEP_LEN);
        for raw in bytes.chunks_exact(PROOF_STEP_LEN) {
            let sibling = Sha256Hash::from_bytes(raw[..32].try_into().ok()?);
            let sibling_max_offset = read_note(&raw[32..32 + NOTE_SIZE])?;
            let side = match raw[PROOF_STEP_LEN - 1] {
                0 => Side::Left,
                1 => Side::Right,
                _ => return None,
            };
            steps.push(ProofStep {
                sibling,
                sibling_max_offset,
                side,
            });
        }
        Some(Self { steps })
    }
}

/// A single chunk with everything needed to upload and verify it.
#[derive(Debug, Clone)]
pub struct ChunkData {
    pub bytes: Bytes,
    pub data_root: Sha256Hash,
    /// Absolute byte offset of the chunk's first byte.
    pub offset: u64,
    pub data_size: u64,
    pub proof: Proof,
}

/// The chunked form of a payload: chunks, per-chunk proofs, and the
/// Merkle root committing to all of them.
#[derive(Debug, Clone)]
pub struct ChunkTree {
    payload: Bytes,
    chunks: Vec<Chunk>,
    proofs: Vec<Proof>,
    root: Sha256Hash,
}

impl ChunkTree {
    /// Split a payload into chunks and build the Merkle tree over them.
    ///
    /// An empty payload yields zero chunks and the zero-root sentinel.
    pub fn build(payload: impl Into<Bytes>, config: &ChunkerConfig) -> Self {
        let payload = payload.into();
        let ranges = split_ranges(payload.len(), config);

        let digests: Vec<Sha256Hash> = if config.parallel {
            ranges
                .par_iter()
                .map(|&(start, end)| Sha256Hash::hash(&payload[start..end]))
                .collect()
        } else {
            ranges
                .iter()
                .map(|&(start, end)| Sha256Hash::hash(&payload[start..end]))
                .collect()
        };

        let chunks: Vec<Chunk> = ranges
            .iter()
            .zip(&digests)
            .map(|(&(start, end), &digest)| Chunk {
                digest,
                min_offset: start as u64,
                max_offset: end as u64,
            })
            .collect();

        let (root, proofs) = build_tree(&chunks);

        Self {
            payload,
            chunks,
            proofs,
            root,
        }
    }

    /// The data root committing to every chunk.
    pub fn root(&self) -> Sha256Hash {
        self.root
    }

    /// Total payload size in bytes.
    pub fn data_size(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The chunk descriptors, in payload order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Random access to a chunk with its bytes and inclusion proof.
    pub fn get_chunk(&self, index: usize) -> Result<ChunkData, ChunkIndexError> {
        let chunk = self.chunks.get(index).ok_or(ChunkIndexError::OutOfRange {
            index,
            count: self.chunks.len(),
        })?;
        Ok(ChunkData {
            bytes: self
                .payload
                .slice(chunk.min_offset as usize..chunk.max_offset as usize),
            data_root: self.root,
            offset: chunk.min_offset,
            data_size: self.data_size(),
            proof: self.proofs[index].clone(),
        })
    }
}

/// Compute chunk boundaries.
///
/// Greedy split at the maximum size; if the trailing chunk would fall
/// below the minimum and has a left neighbor, the last two chunks are
/// re-split into near-equal halves.
fn split_ranges(len: usize, config: &ChunkerConfig) -> Vec<(usize, usize)> {
    if len == 0 {
        return Vec::new();
    }
    let max = config.max_chunk_size.max(1);

    let mut ranges = Vec::with_capacity(len / max + 1);
    let mut start = 0;
    while len - start > max {
        ranges.push((start, start + max));
        start += max;
    }

    let rest = len - start;
    if rest < config.min_chunk_size && !ranges.is_empty() {
        let (prev_start, _) = ranges.pop().expect("non-empty");
        let total = len - prev_start;
        let half = total.div_ceil(2);
        ranges.push((prev_start, prev_start + half));
        ranges.push((prev_start + half, len));
    } else {
        ranges.push((start, len));
    }
    ranges
}

/// A 32-byte big-endian offset marker.
fn note(offset: u64) -> [u8; NOTE_SIZE] {
    let mut buf = [0u8; NOTE_SIZE];
    buf[NOTE_SIZE - 8..].copy_from_slice(&offset.to_be_bytes());
    buf
}

fn read_note(bytes: &[u8]) -> Option<u64> {
    if bytes.len() != NOTE_SIZE || bytes[..NOTE_SIZE - 8].iter().any(|&b| b != 0) {
        return None;
    }
    Some(u64::from_be_bytes(bytes[NOTE_SIZE - 8..].try_into().ok()?))
}

/// Leaf node id: `H(chunk_digest || note(max_offset))`.
fn leaf_id(digest: &Sha256Hash, max_offset: u64) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(digest.as_bytes());
    hasher.update(note(max_offset));
    Sha256Hash(hasher.finalize().into())
}

/// Branch node id:
/// `H(left_id || note(left_max) || right_id || note(right_max))`.
fn branch_id(left: &Sha256Hash, left_max: u64, right: &Sha256Hash, right_max: u64) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(note(left_max));
    hasher.update(right.as_bytes());
    hasher.update(note(right_max));
    Sha256Hash(hasher.finalize().into())
}

struct Node {
    id: Sha256Hash,
    max_offset: u64,
    /// Leaf indices covered by this subtree (contiguous).
    lo: usize,
    hi: usize,
}

/// Build the tree bottom-up, pairing adjacent nodes; an odd node is
/// promoted unchanged. Returns the root and one proof per leaf.
fn build_tree(chunks: &[Chunk]) -> (Sha256Hash, Vec<Proof>) {
    if chunks.is_empty() {
        return (Sha256Hash::ZERO, Vec::new());
    }

    let mut proofs: Vec<Proof> = vec![Proof::default(); chunks.len()];
    let mut level: Vec<Node> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| Node {
            id: leaf_id(&chunk.digest, chunk.max_offset),
            max_offset: chunk.max_offset,
            lo: i,
            hi: i + 1,
        })
        .collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => {
                    for proof in &mut proofs[left.lo..left.hi] {
                        proof.steps.push(ProofStep {
                            sibling: right.id,
                            sibling_max_offset: right.max_offset,
                            side: Side::Right,
                        });
                    }
                    for proof in &mut proofs[right.lo..right.hi] {
                        proof.steps.push(ProofStep {
                            sibling: left.id,
                            sibling_max_offset: left.max_offset,
                            side: Side::Left,
                        });
                    }
                    next.push(Node {
                        id: branch_id(&left.id, left.max_offset, &right.id, right.max_offset),
                        max_offset: right.max_offset,
                        lo: left.lo,
                        hi: right.hi,
                    });
                }
                None => next.push(left),
            }
        }
        level = next;
    }

    (level[0].id, proofs)
}

/// Verify that `(chunk_digest, chunk_max_offset)` is a member of the tree
/// with the given root and total size, using only the proof.
pub fn verify_proof(
    root: &Sha256Hash,
    data_size: u64,
    chunk_digest: &Sha256Hash,
    chunk_max_offset: u64,
    proof: &Proof,
) -> bool {
    let mut id = leaf_id(chunk_digest, chunk_max_offset);
    let mut max_offset = chunk_max_offset;
    for step in &proof.steps {
        match step.side {
            Side::Right => {
                id = branch_id(&id, max_offset, &step.sibling, step.sibling_max_offset);
                max_offset = step.sibling_max_offset;
            }
            Side::Left => {
                id = branch_id(&step.sibling, step.sibling_max_offset, &id, max_offset);
            }
        }
    }
    id == *root && max_offset == data_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_empty_payload() {
        let tree = ChunkTree::build(Vec::new(), &ChunkerConfig::default());
        assert!(tree.is_empty());
        assert_eq!(tree.chunk_count(), 0);
        assert_eq!(tree.root(), Sha256Hash::ZERO);
        assert_eq!(tree.data_size(), 0);
    }

    #[test]
    fn test_single_small_chunk() {
        let tree = ChunkTree::build(b"This is test data.".to_vec(), &ChunkerConfig::default());
        assert_eq!(tree.chunk_count(), 1);
        assert_eq!(tree.data_size(), 18);

        let chunk = tree.get_chunk(0).unwrap();
        assert_eq!(chunk.bytes.as_ref(), b"This is test data.");
        assert_eq!(chunk.offset, 0);
        assert_eq!(chunk.proof.depth(), 0);
        assert!(verify_proof(
            &tree.root(),
            18,
            &Sha256Hash::hash(&chunk.bytes),
            18,
            &chunk.proof
        ));
    }

    #[test]
    fn test_out_of_range_index() {
        let tree = ChunkTree::build(b"abc".to_vec(), &ChunkerConfig::default());
        assert!(matches!(
            tree.get_chunk(1),
            Err(ChunkIndexError::OutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_deterministic_root() {
        let payload = patterned(700_000);
        let config = ChunkerConfig::default();
        let t1 = ChunkTree::build(payload.clone(), &config);
        let t2 = ChunkTree::build(payload, &config);
        assert_eq!(t1.root(), t2.root());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let payload = patterned(1_300_000);
        let sequential = ChunkTree::build(payload.clone(), &ChunkerConfig::default());
        let parallel = ChunkTree::build(
            payload,
            &ChunkerConfig {
                parallel: true,
                ..ChunkerConfig::default()
            },
        );
        assert_eq!(sequential.root(), parallel.root());
        assert_eq!(sequential.chunk_count(), parallel.chunk_count());
    }

    #[test]
    fn test_five_mib_payload() {
        let payload = patterned(5 * 1024 * 1024);
        let tree = ChunkTree::build(payload, &ChunkerConfig::default());

        // 5 MiB divides evenly into 20 chunks of 256 KiB.
        assert_eq!(tree.chunk_count(), 20);
        for chunk in tree.chunks() {
            assert_eq!((chunk.max_offset - chunk.min_offset) as usize, MAX_CHUNK_SIZE);
        }

        // ceil(log2(20)) = 5 levels of pairing.
        for index in 0..20 {
            let chunk = tree.get_chunk(index).unwrap();
            assert_eq!(chunk.proof.depth(), 5);
            assert!(verify_proof(
                &tree.root(),
                tree.data_size(),
                &Sha256Hash::hash(&chunk.bytes),
                chunk.offset + chunk.bytes.len() as u64,
                &chunk.proof
            ));
        }
    }

    #[test]
    fn test_trailing_chunk_rebalanced() {
        // One full chunk plus a remainder just under the minimum.
        let len = MAX_CHUNK_SIZE + MIN_CHUNK_SIZE - 1;
        let tree = ChunkTree::build(patterned(len), &ChunkerConfig::default());

        assert_eq!(tree.chunk_count(), 2);
        let sizes: Vec<u64> = tree
            .chunks()
            .iter()
            .map(|c| c.max_offset - c.min_offset)
            .collect();
        assert!(sizes.iter().all(|&s| s as usize >= MIN_CHUNK_SIZE));
        assert_eq!(sizes.iter().sum::<u64>(), len as u64);
        // Near-equal halves.
        assert!(sizes[0].abs_diff(sizes[1]) <= 1);
    }

    #[test]
    fn test_payload_below_minimum_is_one_chunk() {
        let tree = ChunkTree::build(patterned(100), &ChunkerConfig::default());
        assert_eq!(tree.chunk_count(), 1);
    }

    #[test]
    fn test_tampered_proof_fails() {
        let payload = patterned(600_000);
        let tree = ChunkTree::build(payload, &ChunkerConfig::default());
        let chunk = tree.get_chunk(1).unwrap();

        let mut bad = chunk.proof.clone();
        bad.steps[0].sibling = Sha256Hash::from_bytes([0xde; 32]);
        assert!(!verify_proof(
            &tree.root(),
            tree.data_size(),
            &Sha256Hash::hash(&chunk.bytes),
            chunk.offset + chunk.bytes.len() as u64,
            &bad
        ));
    }

    #[test]
    fn test_proof_bytes_roundtrip() {
        let tree = ChunkTree::build(patterned(900_000), &ChunkerConfig::default());
        let chunk = tree.get_chunk(2).unwrap();
        let encoded = chunk.proof.to_bytes();
        let decoded = Proof::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, chunk.proof);
    }

    #[test]
    fn test_proof_bytes_rejects_malformed() {
        assert!(Proof::from_bytes(&[0u8; 7]).is_none());
        let mut step = [0u8; 65];
        step[64] = 9; // invalid side marker
        assert!(Proof::from_bytes(&step).is_none());
    }

    proptest! {
        #[test]
        fn test_every_chunk_verifies(len in 0usize..20_000) {
            // Small limits keep the case count fast while exercising the
            // same pairing and rebalance paths.
            let config = ChunkerConfig {
                max_chunk_size: 1024,
                min_chunk_size: 128,
                parallel: false,
            };
            let tree = ChunkTree::build(patterned(len), &config);

            let mut total = 0u64;
            for index in 0..tree.chunk_count() {
                let chunk = tree.get_chunk(index).unwrap();
                total += chunk.bytes.len() as u64;
                prop_assert!(verify_proof(
                    &tree.root(),
                    tree.data_size(),
                    &Sha256Hash::hash(&chunk.bytes),
                    chunk.offset + chunk.bytes.len() as u64,
                    &chunk.proof
                ));
            }
            prop_assert_eq!(total, len as u64);
        }

        #[test]
        fn test_root_deterministic_prop(len in 0usize..10_000) {
            let config = ChunkerConfig {
                max_chunk_size: 512,
                min_chunk_size: 64,
                parallel: false,
            };
            let payload = patterned(len);
            let t1 = ChunkTree::build(payload.clone(), &config);
            let t2 = ChunkTree::build(payload, &config);
            prop_assert_eq!(t1.root(), t2.root());
        }
    }
}
