//! 🧾 The failure ledger — the durable trail of what didn't make it.
//!
//! When a transfer ends with failures, the batch is written once, as a
//! JSON array, to a file the operator chose (or `errors.json` by default).
//! It is advisory: a human reads it, greps it, maybe feeds single entries
//! back through `force-migrate`. Nothing in this tool replays it
//! automatically, and nothing ever mutates it after the write.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::common::FailureBatch;

/// 💾 Write the failure batch to `path`, overwriting whatever was there.
///
/// Entries are the retained subset of the cluster's bulk-error items —
/// index/id pairs plus the cause, never full document bodies. Returns the
/// number of entries written. Callers skip this entirely for clean runs;
/// an empty ledger file would only invite a 3am "why is errors.json
/// empty, did it crash?" page.
pub async fn persist(failures: &FailureBatch, path: &Path) -> Result<usize> {
    let json = serde_json::to_string(failures)
        .context("💀 failed to serialize the failure batch — this should be unreachable")?;
    tokio::fs::write(path, json).await.with_context(|| {
        format!(
            "💀 The ledger file '{}' could not be written. The failures happened, \
             we just can't prove it on disk. Check the path and the permissions.",
            path.display()
        )
    })?;
    info!(
        "🧾 wrote {} failed doc(s) to '{}' (in case you want to process them later)",
        failures.len(),
        path.display()
    );
    Ok(failures.len())
}
