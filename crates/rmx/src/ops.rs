//! 🎬 Operator-level operations — what one CLI command amounts to.
//!
//! The modules below this one are single-purpose (move documents, repair
//! documents, write a ledger); this one strings them together into the
//! flows an operator actually runs. The remap dance in particular is a
//! multi-phase, confirm-gated sequence where every phase leaves the
//! cluster in a state you can reason about — that choreography lives
//! here and nowhere else.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};

use crate::cluster::EsClient;
use crate::common::{ErrorCause, TransferFailure};
use crate::confirm::Confirm;
use crate::ledger;
use crate::mappings::merge_index_bodies;
use crate::progress::render_summary;
use crate::repair::{RepairOrchestrator, RepairOutcome};
use crate::transfer::{TransferEngine, TransferOptions, TransferReport};

/// 🔧 Knobs for a plain index copy.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub batch: usize,
    /// Where the failure ledger goes if the run leaves failures behind.
    pub errors_file: PathBuf,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            batch: 500,
            errors_file: PathBuf::from("errors.json"),
        }
    }
}

/// An operator gate: continue on yes, abort the whole flow on no.
fn gate(confirm: &mut dyn Confirm, question: &str) -> Result<()> {
    if confirm.confirm(question) {
        Ok(())
    } else {
        bail!("aborted by the operator")
    }
}

/// 📋 Copy every document from one index into another.
///
/// Failures are summarized, written to the ledger file, and — when a
/// repair orchestrator is handed in (`--autofix`) — fed through the
/// repair pipeline. The copy itself never stops for a rejected document.
pub async fn copy_index(
    source: &EsClient,
    target: &EsClient,
    from_index: &str,
    to_index: &str,
    options: &CopyOptions,
    repair: Option<&mut RepairOrchestrator>,
) -> Result<TransferReport> {
    let engine = TransferEngine::new(
        source,
        target,
        TransferOptions {
            batch_size: options.batch,
            ..TransferOptions::default()
        },
    );
    let report = engine.run(from_index, to_index).await?;
    println!("{}", render_summary(&report));

    if !report.failures.is_empty() {
        ledger::persist(&report.failures, &options.errors_file).await?;
        if let Some(orchestrator) = repair {
            orchestrator
                .repair_all(source, target, from_index, to_index, &report.failures)
                .await;
        }
    }
    Ok(report)
}

/// 🕺 The remap dance: rebuild an index under a new mapping, in place,
/// through a temporary index.
///
/// Phases, each behind an operator gate:
///
/// 1. (re)create `remapping_tmp_<index>` with the new mapping and the
///    original's aliases,
/// 2. reindex the original into the tmp index (the first point the new
///    mapping can reject documents — failures go to a ledger and the
///    operator decides whether to push on),
/// 3. delete and recreate the original with the new mapping and aliases,
/// 4. reindex the tmp index back into the original,
/// 5. delete the tmp index.
///
/// Aborting between phases 3 and 4 leaves the data safe in the tmp index;
/// the dance is resumable by hand, never atomic. With `repair` handed in,
/// each reindex leg runs the repair pipeline over its failures — the
/// orchestrator's decision memo carries across both legs, so a field
/// acknowledged in leg one is not re-asked in leg two.
pub async fn remap(
    client: &EsClient,
    index: &str,
    mapping_body: &Value,
    confirm: &mut dyn Confirm,
    mut repair: Option<&mut RepairOrchestrator>,
) -> Result<()> {
    let tmp_index = format!("remapping_tmp_{index}");
    let aliases = client.get_aliases(index).await?;

    info!("🏗️ (re)creating temporary index (mapping and aliases), named '{tmp_index}'");
    client.delete_index(&tmp_index, true).await?;
    client.create_index(&tmp_index, Some(mapping_body)).await?;
    for alias in &aliases {
        client.put_alias(&tmp_index, alias).await?;
    }

    info!(
        "created temporary index, will start dumping the data from the old one, \
         this might take some time (~40 docs/sec)"
    );
    gate(confirm, "Do you want to continue?")?;
    remap_leg(client, index, &tmp_index, confirm, repair.as_deref_mut()).await?;

    info!("populated temporary index, will recreate the original index (this will remove its contents)");
    gate(confirm, "Do you want to continue?")?;
    client.delete_index(index, false).await?;
    client.create_index(index, Some(mapping_body)).await?;
    for alias in &aliases {
        client.put_alias(index, alias).await?;
    }

    info!("recreated original index (mapping and aliases), will repopulate with the data from the temporary one");
    gate(confirm, "Do you want to continue?")?;
    remap_leg(client, &tmp_index, index, confirm, repair.as_deref_mut()).await?;

    info!("original index repopulated, will clean up the temporary index");
    gate(confirm, "Do you want to continue?")?;
    client.delete_index(&tmp_index, false).await?;
    info!("✅ done");
    Ok(())
}

/// One reindex leg of the dance: transfer, summarize, ledger the
/// failures, optionally repair them, and let the operator decide whether
/// a leg with failures is worth continuing past.
async fn remap_leg(
    client: &EsClient,
    from_index: &str,
    to_index: &str,
    confirm: &mut dyn Confirm,
    repair: Option<&mut RepairOrchestrator>,
) -> Result<()> {
    let errors_file = PathBuf::from(format!("reindex_{to_index}_errors.json"));
    let engine = TransferEngine::new(client, client, TransferOptions::default());
    let report = engine.run(from_index, to_index).await?;
    println!("{}", render_summary(&report));

    if !report.failures.is_empty() {
        ledger::persist(&report.failures, &errors_file).await?;
        if let Some(orchestrator) = repair {
            orchestrator
                .repair_all(client, client, from_index, to_index, &report.failures)
                .await;
        }
        gate(
            confirm,
            &format!(
                "Got {} errors, saved in the file \"{}\", want to continue?",
                report.failures.len(),
                errors_file.display()
            ),
        )?;
    }
    Ok(())
}

/// 🏗️ Create an index from zero or more mapping files, merged left to
/// right. Overwritten keys are warned about, not refused — the operator
/// asked for exactly this merge order.
pub async fn create_index_from_mappings(
    client: &EsClient,
    name: &str,
    mapping_files: &[PathBuf],
) -> Result<()> {
    if mapping_files.is_empty() {
        return client.create_index(name, None).await;
    }

    let mut bodies = Vec::with_capacity(mapping_files.len());
    for path in mapping_files {
        bodies.push(read_mapping_file(path).await?);
    }
    let (merged, overwritten) = merge_index_bodies(&bodies);
    for path in &overwritten {
        warn!("⚠️ '{path}' was overwritten by a later mapping file");
    }
    client.create_index(name, Some(&merged)).await
}

async fn read_mapping_file(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("💀 could not read mapping file '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("💀 mapping file '{}' is not valid JSON", path.display()))
}

/// 🔧 Push a single failed document through the repair pipeline, with
/// every gate pre-answered yes. This is the "I read the ledger, I know
/// what I'm doing" command: the operator supplies the error type and
/// reason verbatim from a ledger entry.
pub async fn force_migrate_record(
    source: &EsClient,
    target: &EsClient,
    from_index: &str,
    to_index: &str,
    id: &str,
    error_type: &str,
    error_reason: &str,
) -> Result<RepairOutcome> {
    let failure = TransferFailure {
        index: to_index.to_string(),
        id: id.to_string(),
        doc_type: None,
        error: ErrorCause {
            kind: error_type.to_string(),
            reason: error_reason.to_string(),
        },
    };
    let mut orchestrator = RepairOrchestrator::assume_yes();
    orchestrator
        .repair_one(source, target, from_index, to_index, &failure)
        .await
}
