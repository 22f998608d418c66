//! 📦 Bulk wire format — NDJSON out, per-item verdicts in.
//!
//! The bulk API has rules. Two lines per document: action metadata, then
//! document source. Newline-delimited. The trailing newline on the whole
//! body matters — it MATTERS. Every quirk is accounted for here so nothing
//! else in the crate has to know them.
//!
//! The response side is the interesting half: a 200 from `/_bulk` says
//! nothing about individual documents. Each item carries its own status,
//! and the rejected ones carry an error object whose `caused_by` (when
//! present) names the structural cause. That is the raw material the
//! repair pipeline classifies later, so we keep it intact.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::common::{Doc, ErrorCause, TransferFailure};

/// The tally of one bulk request: how many landed, and exactly which
/// documents didn't (with their causes).
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub success: u64,
    pub failures: Vec<TransferFailure>,
}

/// 🏗️ Render the NDJSON payload for one bulk request.
///
/// Per document: `{"index":{"_index":...,"_id":...}}` then the raw
/// `_source` bytes, untouched — the whole point of carrying [`RawValue`]
/// around. Trailing newline included; the bulk API rejects bodies without
/// it and the error message will not tell you why.
pub(crate) fn render_bulk_payload(target_index: &str, docs: &[Doc]) -> Result<String> {
    // action line + source line + 2 newlines per doc; sources dominate
    let estimated: usize = docs
        .iter()
        .map(|doc| doc.source.get().len() + target_index.len() + doc.id.len() + 64)
        .sum();
    let mut payload = String::with_capacity(estimated);

    for doc in docs {
        let mut action = serde_json::Map::new();
        action.insert("_index".to_string(), target_index.into());
        action.insert("_id".to_string(), doc.id.clone().into());
        if let Some(ref doc_type) = doc.doc_type {
            action.insert("_type".to_string(), doc_type.clone().into());
        }
        let action_line = serde_json::to_string(&json!({"index": action}))
            .context("💀 failed to serialize bulk action metadata — JSON describing JSON failed to become JSON")?;

        payload.push_str(&action_line);
        payload.push('\n');
        payload.push_str(doc.source.get());
        payload.push('\n');
    }

    Ok(payload)
}

// ===== Response shape =====

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    // We only ever issue "index" actions, but old clusters have been seen
    // echoing "create" for them.
    #[serde(alias = "create")]
    index: BulkItemDetail,
}

#[derive(Debug, Deserialize)]
struct BulkItemDetail {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_type", default)]
    doc_type: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
struct BulkItemError {
    #[serde(rename = "type")]
    kind: String,
    reason: String,
    #[serde(default)]
    caused_by: Option<ErrorCause>,
}

impl BulkItemError {
    /// The structural cause: `caused_by` when the cluster provides one
    /// (that's where the `mapper [...]` reason lives), the outer error
    /// otherwise.
    fn cause(self) -> ErrorCause {
        self.caused_by.unwrap_or(ErrorCause {
            kind: self.kind,
            reason: self.reason,
        })
    }
}

/// 🔍 Turn a bulk response body into successes and structured failures.
///
/// An item is a failure when it carries an error object or a non-2xx
/// status. Failures are data, not errors — the engine keeps going.
pub(crate) fn parse_bulk_response(body: &str) -> Result<BulkOutcome> {
    let response: BulkResponse = serde_json::from_str(body)
        .with_context(|| format!("💀 the bulk response was not the shape we know: {body}"))?;

    let mut outcome = BulkOutcome::default();
    for item in response.items {
        let detail = item.index;
        let rejected = detail.error.is_some() || detail.status >= 300;
        if rejected {
            let cause = detail.error.map(BulkItemError::cause).unwrap_or(ErrorCause {
                kind: format!("http_{}", detail.status),
                reason: format!("bulk item returned status {}", detail.status),
            });
            outcome.failures.push(TransferFailure {
                index: detail.index,
                id: detail.id,
                doc_type: detail.doc_type,
                error: cause,
            });
        } else {
            outcome.success += 1;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn doc(id: &str, source: &str) -> Doc {
        serde_json::from_str(&format!(
            r#"{{"_index": "src", "_type": "record", "_id": "{id}", "_source": {source}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn the_one_where_the_payload_is_two_lines_per_doc_plus_the_sacred_trailing_newline() {
        let docs = vec![doc("1", r#"{"a":1}"#), doc("2", r#"{"b":2}"#)];
        let payload = render_bulk_payload("target", &docs).unwrap();

        assert!(payload.ends_with('\n'), "the trailing newline MATTERS");
        let lines: Vec<&str> = payload.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 4);

        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "target");
        assert_eq!(action["index"]["_id"], "1");
        assert_eq!(action["index"]["_type"], "record");
        // 📦 source line passes through byte-for-byte
        assert_eq!(lines[1], r#"{"a":1}"#);
        assert_eq!(lines[3], r#"{"b":2}"#);
    }

    #[test]
    fn the_one_where_every_item_landed() {
        let body = r#"{
            "took": 3, "errors": false,
            "items": [
                {"index": {"_index": "t", "_type": "record", "_id": "1", "status": 201}},
                {"index": {"_index": "t", "_type": "record", "_id": "2", "status": 200}}
            ]
        }"#;
        let outcome = parse_bulk_response(body).unwrap();
        assert_eq!(outcome.success, 2);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn the_one_where_one_item_is_rejected_and_caused_by_wins() {
        let body = r#"{
            "took": 9, "errors": true,
            "items": [
                {"index": {"_index": "t", "_id": "1", "status": 201}},
                {"index": {"_index": "t", "_id": "2", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse",
                    "caused_by": {
                        "type": "illegal_argument_exception",
                        "reason": "mapper [meta.bad_field] of different type"
                    }
                }}}
            ]
        }"#;
        let outcome = parse_bulk_response(body).unwrap();
        assert_eq!(outcome.success, 1);
        assert_eq!(outcome.failures.len(), 1);

        let failure = &outcome.failures[0];
        assert_eq!(failure.id, "2");
        // caused_by is where the structural cause lives
        assert_eq!(failure.error.kind, "illegal_argument_exception");
        assert_eq!(
            failure.error.reason,
            "mapper [meta.bad_field] of different type"
        );
    }

    #[test]
    fn the_one_where_there_is_no_caused_by_and_the_outer_error_steps_up() {
        let body = r#"{
            "errors": true,
            "items": [
                {"index": {"_index": "t", "_id": "9", "status": 429, "error": {
                    "type": "es_rejected_execution_exception",
                    "reason": "thread pool queue is full"
                }}}
            ]
        }"#;
        let outcome = parse_bulk_response(body).unwrap();
        assert_eq!(outcome.failures[0].error.kind, "es_rejected_execution_exception");
    }

    #[test]
    fn the_one_where_successes_plus_failures_equals_the_batch() {
        let body = r#"{
            "errors": true,
            "items": [
                {"index": {"_index": "t", "_id": "1", "status": 201}},
                {"index": {"_index": "t", "_id": "2", "status": 400, "error": {"type": "x", "reason": "y"}}},
                {"index": {"_index": "t", "_id": "3", "status": 201}}
            ]
        }"#;
        let outcome = parse_bulk_response(body).unwrap();
        assert_eq!(outcome.success + outcome.failures.len() as u64, 3);
    }
}
