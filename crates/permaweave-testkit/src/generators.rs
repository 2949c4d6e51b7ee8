//! Proptest generators for property-based testing.

use proptest::prelude::*;

use permaweave_core::{
    Address, ChunkerConfig, DraftTransaction, LastTx, SignedTransaction, Tag, TxId,
    MAX_CHUNK_SIZE,
};

use crate::fixtures::shared_keystore;

/// Generate payload bytes of up to the given length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a single tag within network limits.
pub fn tag() -> impl Strategy<Value = Tag> {
    (
        prop::collection::vec(any::<u8>(), 1..=32),
        prop::collection::vec(any::<u8>(), 0..=64),
    )
        .prop_map(|(name, value)| Tag::new(name, value))
}

/// Generate an ordered tag set.
pub fn tags(max_count: usize) -> impl Strategy<Value = Vec<Tag>> {
    prop::collection::vec(tag(), 0..=max_count)
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

/// Generate a last reference: empty or a previous transaction id.
pub fn last_tx() -> impl Strategy<Value = LastTx> {
    prop_oneof![
        Just(LastTx::empty()),
        any::<[u8; 32]>().prop_map(|b| LastTx::from(TxId::from_bytes(b))),
    ]
}

/// Generate a transfer amount.
pub fn quantity() -> impl Strategy<Value = u128> {
    0u128..=1_000_000_000_000
}

/// Parameters for generating a signed transaction.
#[derive(Debug, Clone)]
pub struct TxParams {
    pub payload: Vec<u8>,
    pub tags: Vec<Tag>,
    pub target: Option<Address>,
    pub quantity: u128,
    pub reward: u128,
    pub last_tx: LastTx,
}

impl Arbitrary for TxParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            payload(2_000),
            tags(8),
            prop::option::of(address()),
            quantity(),
            1u128..=1_000_000_000,
            last_tx(),
        )
            .prop_map(|(payload, tags, target, quantity, reward, last_tx)| TxParams {
                payload,
                tags,
                target,
                quantity,
                reward,
                last_tx,
            })
            .boxed()
    }
}

/// Sign a transaction from parameters with the shared test keystore.
pub fn signed_from_params(params: &TxParams) -> SignedTransaction {
    let keystore = shared_keystore();
    let mut draft = DraftTransaction::with_data(keystore.owner().clone(), params.payload.clone());
    for tag in &params.tags {
        draft.add_tag(tag.name.clone(), tag.value.clone());
    }
    if let Some(target) = params.target {
        draft.set_target(target);
    }
    draft.set_quantity(params.quantity);

    let chunks = draft.prepare_chunks(&ChunkerConfig::default());
    draft
        .sign(
            keystore,
            params.last_tx.clone(),
            params.reward,
            &chunks,
            MAX_CHUNK_SIZE,
        )
        .expect("generated transaction signs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use permaweave_core::{deep_hash, SignedTransaction};

    proptest! {
        #[test]
        fn test_generated_transactions_verify(params: TxParams) {
            let tx = signed_from_params(&params);
            prop_assert!(tx.verify().is_ok());
        }

        #[test]
        fn test_signed_message_deterministic_per_params(params: TxParams) {
            // PSS signatures differ; the signed message must not.
            let t1 = signed_from_params(&params);
            let t2 = signed_from_params(&params);
            prop_assert_eq!(
                deep_hash(&t1.signable_item()),
                deep_hash(&t2.signable_item())
            );
        }

        #[test]
        fn test_canonical_roundtrip(params: TxParams) {
            let tx = signed_from_params(&params);
            let form = tx.to_canonical_form();
            let rebuilt = SignedTransaction::from_canonical_form(&form).unwrap();
            prop_assert_eq!(rebuilt.to_canonical_form(), form);
            prop_assert!(rebuilt.verify().is_ok());
        }
    }
}
