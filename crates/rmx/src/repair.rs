//! 🩹 The repair pipeline — semi-automatic surgery on failed documents.
//!
//! A transfer leaves behind a [`FailureBatch`]; this module works through
//! it one document at a time. Per failure the orchestrator walks a fixed
//! gauntlet of gates, and falling off at any gate is the *Skipped* outcome,
//! not an error:
//!
//! 1. strategy lookup by error-type tag (unknown tag → skip, with a note),
//! 2. the operator's type-level gate ("fix this class of error at all?"),
//! 3. classification of the reason text (no pattern → this document's
//!    repair fails, the run continues),
//! 4. the operator's field-level gate ("delete this specific field?"),
//! 5. the repair itself: re-fetch the source document, strip the field,
//!    write the fixed body to the target under the same id.
//!
//! Repairing one document never touches another; there is no
//! cross-document transaction and no run-level failure mode in here.

pub mod classify;
pub mod memo;
pub mod strategies;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::cluster::EsClient;
use crate::common::{FailureBatch, TransferFailure};
use crate::repair::memo::DecisionMemo;
use crate::repair::strategies::{RepairStrategy, StrategyRegistry, strip_bad_field};

/// Where a failure's repair attempt ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Fixed and rewritten to the target.
    Repaired,
    /// Declined at a gate or unknown error type — deliberate no-op.
    Skipped,
}

/// 📊 The tally of one repair pass over a failure batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub repaired: u64,
    pub skipped: u64,
    /// Documents whose repair attempt itself errored (classification
    /// failure, fetch failure, write failure). Logged, counted, and left
    /// for the operator — never run-aborting.
    pub failed: u64,
}

/// 🩹 Drives the per-failure state machine. Owns the registry and the
/// decision memo; borrows the clients per call because source and target
/// may live on different servers.
pub struct RepairOrchestrator {
    registry: StrategyRegistry,
    memo: DecisionMemo,
}

impl std::fmt::Debug for RepairOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairOrchestrator")
            .field("registry", &self.registry)
            .field("memo", &self.memo)
            .finish()
    }
}

impl RepairOrchestrator {
    pub fn new(registry: StrategyRegistry, memo: DecisionMemo) -> Self {
        Self { registry, memo }
    }

    /// An orchestrator with every gate pre-answered yes — for the
    /// force-migrate path, where the operator already read the ledger and
    /// typed the error out by hand.
    pub fn assume_yes() -> Self {
        Self::new(
            StrategyRegistry::default(),
            DecisionMemo::new(true, Box::new(crate::confirm::AutoYes)),
        )
    }

    /// 🔄 Work through a whole failure batch.
    ///
    /// Per-document errors are downgraded to log lines plus a `failed`
    /// count — the contract is that a repair pass always reaches the end
    /// of the batch.
    pub async fn repair_all(
        &mut self,
        source: &EsClient,
        target: &EsClient,
        from_index: &str,
        to_index: &str,
        failures: &FailureBatch,
    ) -> RepairSummary {
        let mut summary = RepairSummary::default();
        for failure in failures.iter() {
            match self
                .repair_one(source, target, from_index, to_index, failure)
                .await
            {
                Ok(RepairOutcome::Repaired) => summary.repaired += 1,
                Ok(RepairOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    warn!("⚠️ could not repair record '{}': {err:#}", failure.id);
                    summary.failed += 1;
                }
            }
        }
        info!(
            "🩹 repair pass done: {} repaired, {} skipped, {} failed",
            summary.repaired, summary.skipped, summary.failed
        );
        summary
    }

    /// One failure through the gauntlet.
    pub async fn repair_one(
        &mut self,
        source: &EsClient,
        target: &EsClient,
        from_index: &str,
        to_index: &str,
        failure: &TransferFailure,
    ) -> Result<RepairOutcome> {
        // Gate 1: do we even have a playbook for this error class?
        let Some(strategy) = self.registry.lookup(&failure.error.kind) else {
            info!(
                "🤷 I don't know how to handle '{}', skipping record '{}'",
                failure.error.kind, failure.id
            );
            return Ok(RepairOutcome::Skipped);
        };

        // Gate 2: operator approval for the error class.
        if !self.memo.should_attempt_type(&failure.error.kind, &failure.id) {
            return Ok(RepairOutcome::Skipped);
        }

        match strategy {
            RepairStrategy::StripBadField => {
                self.strip_and_retry(source, target, from_index, to_index, failure)
                    .await
            }
        }
    }

    async fn strip_and_retry(
        &mut self,
        source: &EsClient,
        target: &EsClient,
        from_index: &str,
        to_index: &str,
        failure: &TransferFailure,
    ) -> Result<RepairOutcome> {
        // Gate 3: classification. An unparseable reason is fatal for this
        // document only — the caller downgrades it to a warning.
        let field = classify::extract_bad_field(&failure.error.reason)
            .with_context(|| format!("classifying the failure of record '{}'", failure.id))?
            .to_string();

        // Gate 4: operator approval for this specific field.
        if !self.memo.should_fix_field(&field) {
            return Ok(RepairOutcome::Skipped);
        }

        // The failure record only carries identifiers; the pristine body
        // comes from the source index.
        let original = source.get_doc(from_index, &failure.id).await?;
        let mut body: Value = serde_json::from_str(original.source.get())
            .with_context(|| format!("parsing the source body of record '{}'", failure.id))?;

        strip_bad_field(&mut body, &field);

        target
            .put_doc(to_index, &failure.id, original.doc_type.as_deref(), &body)
            .await?;

        info!("✅ fixed record '{}' (removed around '{field}')", failure.id);
        Ok(RepairOutcome::Repaired)
    }
}
