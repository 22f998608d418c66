//! 📦 Common data structures — the building blocks of remapx.
//!
//! Everything that moves through a transfer run is defined here: the
//! documents we read off a scroll cursor, the per-document failures a bulk
//! write can hand back, and the batch that collects those failures until
//! the ledger takes ownership of them.
//!
//! These structs don't ask questions. They carry the data. They are the
//! postal workers of this codebase. Please tip your postal workers. 🦆

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// 🎯 One document, exactly as the cluster handed it to us.
///
/// Deserialized straight out of a scroll hit or a get-document response.
/// The `_source` body stays a [`RawValue`] — we never reparse it on the way
/// from source index to target index, we just forward the bytes. Immutable
/// once read; the repair pipeline re-fetches and parses its own copy when
/// it actually needs to mutate a body.
#[derive(Debug, Clone, Deserialize)]
pub struct Doc {
    /// 📡 The index this document was read from.
    #[serde(rename = "_index")]
    pub index: String,

    /// The document type tag. Old clusters send it, new clusters don't,
    /// so it's optional and we pass it along untouched either way.
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,

    /// The document's identity.
    #[serde(rename = "_id")]
    pub id: String,

    /// 📦 The raw document payload. Valid JSON until it isn't, and then
    /// it's the cluster's problem, because the cluster produced it.
    #[serde(rename = "_source")]
    pub source: Box<RawValue>,
}

/// The structural cause of a write rejection: an error-type tag plus an
/// unstructured reason string that the classifier pattern-matches later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    /// Error-type tag, e.g. `illegal_argument_exception`. Named `kind`
    /// here because `type` is spoken for in Rust.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-text reason. Opaque. Pattern-matched, never trusted.
    pub reason: String,
}

/// 💀 One document that a bulk write refused.
///
/// This is the retained subset of the cluster's bulk-error item — enough to
/// find the document again (index + id + type) and enough to classify what
/// went wrong (the cause). Full bodies are deliberately not kept; the
/// repair pipeline re-fetches from the source index when it needs one.
#[derive(Debug, Clone, Serialize)]
pub struct TransferFailure {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    pub error: ErrorCause,
}

/// 📦 The ordered failures of one transfer run.
///
/// Append-only while the run is going; once the run ends the ledger takes
/// ownership and writes the sole durable copy. Serializes transparently as
/// a JSON array, which is exactly the ledger file format.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FailureBatch {
    pub failures: Vec<TransferFailure>,
}

impl FailureBatch {
    pub fn push(&mut self, failure: TransferFailure) {
        self.failures.push(failure);
    }

    pub fn extend(&mut self, failures: impl IntoIterator<Item = TransferFailure>) {
        self.failures.extend(failures);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransferFailure> {
        self.failures.iter()
    }
}
