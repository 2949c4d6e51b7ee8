//! The canonical transaction document.
//!
//! A string-keyed JSON form in which every binary field is base64url
//! (no padding) and every amount is a decimal string. This is what the
//! gateway accepts; it must round-trip losslessly, empty optionals
//! included.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crypto::{b64_decode, b64_encode, Address, LastTx, Owner, Sha256Hash, TxId, TxSignature};
use crate::error::{CanonicalError, EncodingError};
use crate::tag::Tag;
use crate::transaction::SignedTransaction;

/// One tag in canonical form: base64url name and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTag {
    pub name: String,
    pub value: String,
}

/// The canonical wire document for a signed transaction.
///
/// Absent optionals (`target`, `data`, `data_root`) serialize as empty
/// strings; nothing is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub id: String,
    pub last_tx: String,
    pub owner: String,
    pub target: String,
    pub quantity: String,
    pub data: String,
    pub data_root: String,
    pub data_size: String,
    pub reward: String,
    pub signature: String,
    pub tags: Vec<CanonicalTag>,
}

impl CanonicalTransaction {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, CanonicalError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CanonicalError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode the id field.
    pub fn parsed_id(&self) -> Result<TxId, CanonicalError> {
        TxId::from_b64(&self.id).map_err(|source| CanonicalError::Field { field: "id", source })
    }

    /// Decode the owner field.
    pub fn parsed_owner(&self) -> Result<Owner, CanonicalError> {
        Owner::from_b64(&self.owner)
            .map_err(|source| CanonicalError::Field { field: "owner", source })
    }
}

fn field<T>(
    name: &'static str,
    result: Result<T, EncodingError>,
) -> Result<T, CanonicalError> {
    result.map_err(|source| CanonicalError::Field { field: name, source })
}

fn number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, CanonicalError> {
    value.parse().map_err(|_| CanonicalError::Number { field: name })
}

impl SignedTransaction {
    /// Emit the canonical wire document for this transaction.
    ///
    /// The payload is included only for inline transactions; chunked
    /// payloads travel separately as proven chunks.
    pub fn to_canonical_form(&self) -> CanonicalTransaction {
        CanonicalTransaction {
            id: self.id.to_b64(),
            last_tx: self.last_tx.to_b64(),
            owner: self.owner.to_b64(),
            target: self.target.as_ref().map(Address::to_b64).unwrap_or_default(),
            quantity: self.quantity.to_string(),
            data: match (&self.data, self.inline) {
                (Some(data), true) => b64_encode(data),
                _ => String::new(),
            },
            data_root: self
                .data_root
                .as_ref()
                .map(Sha256Hash::to_b64)
                .unwrap_or_default(),
            data_size: self.data_size.to_string(),
            reward: self.reward.to_string(),
            signature: self.signature.to_b64(),
            tags: self
                .tags
                .iter()
                .map(|tag| CanonicalTag {
                    name: b64_encode(&tag.name),
                    value: b64_encode(&tag.value),
                })
                .collect(),
        }
    }

    /// Reconstruct a signed transaction from its canonical document.
    ///
    /// Client-local fields (metadata, schedule) are not part of the
    /// canonical form and come back empty. The signature is parsed, not
    /// checked; call [`SignedTransaction::verify`] to check it.
    pub fn from_canonical_form(form: &CanonicalTransaction) -> Result<Self, CanonicalError> {
        let data = if form.data.is_empty() {
            None
        } else {
            Some(bytes::Bytes::from(field("data", b64_decode(&form.data))?))
        };
        let data_root = if form.data_root.is_empty() {
            None
        } else {
            Some(field("data_root", Sha256Hash::from_b64(&form.data_root))?)
        };
        let target = if form.target.is_empty() {
            None
        } else {
            Some(field("target", Address::from_b64(&form.target))?)
        };

        Ok(Self {
            id: field("id", TxId::from_b64(&form.id))?,
            last_tx: field("last_tx", LastTx::from_b64(&form.last_tx))?,
            owner: field("owner", Owner::from_b64(&form.owner))?,
            target,
            quantity: number("quantity", &form.quantity)?,
            reward: number("reward", &form.reward)?,
            tags: form
                .tags
                .iter()
                .map(|tag| {
                    Ok(Tag::new(
                        field("tags.name", b64_decode(&tag.name))?,
                        field("tags.value", b64_decode(&tag.value))?,
                    ))
                })
                .collect::<Result<Vec<_>, CanonicalError>>()?,
            inline: data.is_some(),
            data,
            data_root,
            data_size: number("data_size", &form.data_size)?,
            signature: field("signature", TxSignature::from_b64(&form.signature))?,
            metadata: BTreeMap::new(),
            scheduled_at: None,
        })
    }
}
