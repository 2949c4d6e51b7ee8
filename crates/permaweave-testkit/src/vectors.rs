//! Deterministic vectors for cross-checking the signing pipeline.
//!
//! Each vector pins a full set of transaction inputs. Outputs are
//! regenerated at run time and cross-checked structurally: the signed
//! message must be stable, the id must be the signature digest, the
//! canonical form must round-trip, and every chunk proof must verify.
//! PSS signatures are salted, so raw signature bytes are deliberately
//! not compared.

use permaweave_core::{
    deep_hash, verify_proof, Address, ChunkerConfig, DraftTransaction, LastTx, Sha256Hash,
    SignedTransaction, Tag, TxId, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};

use crate::fixtures::shared_keystore;

/// A pinned set of transaction inputs.
#[derive(Debug, Clone)]
pub struct Vector {
    pub name: &'static str,
    pub description: &'static str,
    pub payload: Vec<u8>,
    pub tags: Vec<Tag>,
    pub target: Option<Address>,
    pub quantity: u128,
    pub reward: u128,
    pub last_tx: LastTx,
}

fn patterned(len: usize, step: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * step + 7) % 251) as u8).collect()
}

/// All pinned vectors.
pub fn all_vectors() -> Vec<Vector> {
    vec![
        Vector {
            name: "transfer_only",
            description: "Pure value transfer: no payload, no data root",
            payload: Vec::new(),
            tags: Vec::new(),
            target: Some(Address::from_bytes([0x11; 32])),
            quantity: 1_000_000_000_000,
            reward: 65_595_508,
            last_tx: LastTx::empty(),
        },
        Vector {
            name: "tiny_inline",
            description: "18-byte payload, single chunk, inline data",
            payload: b"This is test data.".to_vec(),
            tags: vec![Tag::new("Content-Type", "text/plain")],
            target: None,
            quantity: 0,
            reward: 1_332,
            last_tx: LastTx::from(TxId::from_bytes([0x42; 32])),
        },
        Vector {
            name: "exactly_one_chunk",
            description: "Payload exactly at the chunk bound",
            payload: patterned(MAX_CHUNK_SIZE, 3),
            tags: Vec::new(),
            target: None,
            quantity: 0,
            reward: 2_621_440,
            last_tx: LastTx::empty(),
        },
        Vector {
            name: "rebalanced_tail",
            description: "Trailing chunk under the minimum forces a rebalance",
            payload: patterned(MAX_CHUNK_SIZE + MIN_CHUNK_SIZE - 1, 5),
            tags: vec![Tag::new("App-Name", "permaweave")],
            target: None,
            quantity: 0,
            reward: 2_949_110,
            last_tx: LastTx::empty(),
        },
        Vector {
            name: "twenty_chunks",
            description: "5 MiB payload: twenty full chunks, proof depth five",
            payload: patterned(5 * 1024 * 1024, 1),
            tags: Vec::new(),
            target: None,
            quantity: 0,
            reward: 52_428_800,
            last_tx: LastTx::from(TxId::from_bytes([0x0f; 32])),
        },
        Vector {
            name: "many_tags",
            description: "Tag ordering exercised at width",
            payload: b"tagged".to_vec(),
            tags: (0..32)
                .map(|i| Tag::new(format!("key-{i:02}"), format!("value-{i:02}")))
                .collect(),
            target: None,
            quantity: 0,
            reward: 1_060,
            last_tx: LastTx::empty(),
        },
        Vector {
            name: "binary_tags",
            description: "Tags are raw bytes, not text",
            payload: b"binary".to_vec(),
            tags: vec![Tag::new(vec![0x00, 0xff, 0x7f], vec![0xde, 0xad, 0xbe, 0xef])],
            target: Some(Address::from_bytes([0xa5; 32])),
            quantity: 7,
            reward: 1_060,
            last_tx: LastTx::empty(),
        },
    ]
}

/// Sign a vector's inputs with the shared test keystore.
pub fn sign_vector(vector: &Vector) -> SignedTransaction {
    let keystore = shared_keystore();
    let mut draft =
        DraftTransaction::with_data(keystore.owner().clone(), vector.payload.clone());
    for tag in &vector.tags {
        draft.add_tag(tag.name.clone(), tag.value.clone());
    }
    if let Some(target) = vector.target {
        draft.set_target(target);
    }
    draft.set_quantity(vector.quantity);

    let chunks = draft.prepare_chunks(&ChunkerConfig::default());
    draft
        .sign(
            keystore,
            vector.last_tx.clone(),
            vector.reward,
            &chunks,
            MAX_CHUNK_SIZE,
        )
        .expect("vector signs")
}

/// Run every structural check over every vector. Returns the list of
/// failures (empty means all good).
pub fn verify_all_vectors() -> Vec<String> {
    let mut failures = Vec::new();
    for vector in all_vectors() {
        if let Err(detail) = check_vector(&vector) {
            failures.push(format!("{}: {detail}", vector.name));
        }
    }
    failures
}

fn check_vector(vector: &Vector) -> Result<(), String> {
    let tx = sign_vector(vector);

    // The signed message is a pure function of the inputs.
    let again = sign_vector(vector);
    let digest = deep_hash(&tx.signable_item());
    if digest != deep_hash(&again.signable_item()) {
        return Err("signed message is not deterministic".into());
    }

    // Id derivation and signature.
    if tx.id() != tx.signature().tx_id() {
        return Err("id is not the signature digest".into());
    }
    tx.verify().map_err(|e| format!("verification failed: {e}"))?;

    // Canonical form round-trips exactly and still verifies.
    let form = tx.to_canonical_form();
    let rebuilt = SignedTransaction::from_canonical_form(&form)
        .map_err(|e| format!("canonical parse failed: {e}"))?;
    if rebuilt.to_canonical_form() != form {
        return Err("canonical form does not round-trip".into());
    }
    rebuilt
        .verify()
        .map_err(|e| format!("round-tripped verification failed: {e}"))?;

    // Chunk tree: stable root, verifying proofs, exact coverage.
    let config = ChunkerConfig::default();
    let tree = tx
        .chunks(&config)
        .map_err(|e| format!("chunk rebuild failed: {e}"))?;
    if vector.payload.is_empty() {
        if tree.chunk_count() != 0 {
            return Err("empty payload produced chunks".into());
        }
    } else {
        let mut covered = 0u64;
        for index in 0..tree.chunk_count() {
            let chunk = tree
                .get_chunk(index)
                .map_err(|e| format!("get_chunk({index}): {e}"))?;
            covered += chunk.bytes.len() as u64;
            let ok = verify_proof(
                &tree.root(),
                tree.data_size(),
                &Sha256Hash::hash(&chunk.bytes),
                chunk.offset + chunk.bytes.len() as u64,
                &chunk.proof,
            );
            if !ok {
                return Err(format!("chunk {index} proof does not verify"));
            }
        }
        if covered != vector.payload.len() as u64 {
            return Err("chunks do not cover the payload exactly".into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_vectors_pass() {
        let failures = verify_all_vectors();
        assert!(failures.is_empty(), "vector failures: {failures:?}");
    }

    #[test]
    fn test_vector_names_unique() {
        let vectors = all_vectors();
        let names: HashSet<&str> = vectors.iter().map(|v| v.name).collect();
        assert_eq!(names.len(), vectors.len());
    }

    #[test]
    fn test_twenty_chunk_vector_shape() {
        let vector = all_vectors()
            .into_iter()
            .find(|v| v.name == "twenty_chunks")
            .unwrap();
        let tx = sign_vector(&vector);
        let tree = tx.chunks(&ChunkerConfig::default()).unwrap();
        assert_eq!(tree.chunk_count(), 20);
        assert_eq!(tree.get_chunk(0).unwrap().proof.depth(), 5);
    }
}
