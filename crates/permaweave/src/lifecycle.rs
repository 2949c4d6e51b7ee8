//! Runtime transaction lifecycle.
//!
//! The core crate freezes transactions at the type level: a
//! [`DraftTransaction`] becomes a [`SignedTransaction`] and nothing about
//! the signed form can be mutated. This module layers the runtime state
//! machine on top for callers that carry one handle through the whole
//! life of a transaction:
//!
//! ```text
//! Draft -> Signed -> Submitted -> { Pending -> Confirmed | Failed }
//! ```
//!
//! Mutating operations are only legal on a draft; afterwards they fail
//! with [`ImmutableTransactionError`].

use std::collections::BTreeMap;
use thiserror::Error;

use permaweave_core::{DraftTransaction, SignedTransaction, TxId};
use permaweave_net::{ConfirmationRecord, TxStatus};

/// Where a tracked transaction is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    Draft,
    Signed,
    Submitted,
    Pending,
    Confirmed,
    Failed,
}

/// A mutation was attempted after the canonical fields were frozen.
///
/// Programmer misuse; never retryable.
#[derive(Debug, Error)]
#[error("transaction is {stage:?}; {op} is only valid on a draft")]
pub struct ImmutableTransactionError {
    pub stage: TxStage,
    pub op: &'static str,
}

/// A transaction tracked through its lifecycle.
///
/// Invariants: `draft` is present exactly in the `Draft` stage; `signed`
/// is present from `Signed` onward.
#[derive(Debug, Clone)]
pub struct Transaction {
    stage: TxStage,
    draft: Option<DraftTransaction>,
    signed: Option<SignedTransaction>,
    confirmations: u64,
    failure: Option<String>,
}

impl Transaction {
    /// Track a draft from the beginning.
    pub fn from_draft(draft: DraftTransaction) -> Self {
        Self {
            stage: TxStage::Draft,
            draft: Some(draft),
            signed: None,
            confirmations: 0,
            failure: None,
        }
    }

    /// Track an already-signed transaction.
    pub fn from_signed(signed: SignedTransaction) -> Self {
        Self {
            stage: TxStage::Signed,
            draft: None,
            signed: Some(signed),
            confirmations: 0,
            failure: None,
        }
    }

    pub fn stage(&self) -> TxStage {
        self.stage
    }

    /// The id, once signed.
    pub fn id(&self) -> Option<TxId> {
        self.signed.as_ref().map(SignedTransaction::id)
    }

    pub fn as_draft(&self) -> Option<&DraftTransaction> {
        self.draft.as_ref()
    }

    pub fn as_signed(&self) -> Option<&SignedTransaction> {
        self.signed.as_ref()
    }

    /// Confirming blocks, once confirmed.
    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    /// The failure reason, if the transaction failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Append a tag. Only legal on a draft.
    pub fn add_tag(
        &mut self,
        name: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), ImmutableTransactionError> {
        self.draft_mut("add_tag")?.add_tag(name, value);
        Ok(())
    }

    /// Merge client-local metadata. Only legal on a draft.
    pub fn add_metadata(
        &mut self,
        entries: BTreeMap<String, String>,
    ) -> Result<(), ImmutableTransactionError> {
        self.draft_mut("add_metadata")?.add_metadata(entries);
        Ok(())
    }

    /// Gate submission until a unix timestamp. Only legal on a draft.
    pub fn schedule_at(&mut self, unix_seconds: i64) -> Result<(), ImmutableTransactionError> {
        self.draft_mut("schedule_at")?.schedule_at(unix_seconds);
        Ok(())
    }

    fn draft_mut(
        &mut self,
        op: &'static str,
    ) -> Result<&mut DraftTransaction, ImmutableTransactionError> {
        let stage = self.stage;
        self.draft
            .as_mut()
            .ok_or(ImmutableTransactionError { stage, op })
    }

    /// A clone of the draft, for signing. `None` past the draft stage.
    pub(crate) fn draft_cloned(&self) -> Option<DraftTransaction> {
        self.draft.clone()
    }

    /// Transition Draft -> Signed.
    pub(crate) fn set_signed(&mut self, signed: SignedTransaction) {
        self.draft = None;
        self.signed = Some(signed);
        self.stage = TxStage::Signed;
    }

    /// Transition Signed -> Submitted.
    pub(crate) fn mark_submitted(&mut self) {
        self.stage = TxStage::Submitted;
    }

    /// Record a terminal failure.
    pub(crate) fn mark_failed(&mut self, reason: impl Into<String>) {
        self.stage = TxStage::Failed;
        self.failure = Some(reason.into());
    }

    /// Fold a fresh status snapshot into the stage.
    pub(crate) fn apply_record(&mut self, record: &ConfirmationRecord) {
        match record.status {
            TxStatus::Pending => self.stage = TxStage::Pending,
            TxStatus::Confirmed { confirmations } => {
                self.stage = TxStage::Confirmed;
                self.confirmations = confirmations;
            }
            TxStatus::Failed => {
                self.stage = TxStage::Failed;
                self.failure
                    .get_or_insert_with(|| "dropped before confirmation".to_string());
            }
        }
    }
}
