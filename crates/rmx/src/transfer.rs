//! 🚚 The batch transfer engine — source index in, target index out.
//!
//! One scroll cursor on the read side, bounded bulk writes on the write
//! side, and a hard rule in between: a rejected document is a *data point*,
//! never a reason to stop. The engine's whole contract is that a
//! multi-thousand-document transfer survives its worst documents and hands
//! you the exact list of them afterwards.
//!
//! The only fatal failure is not getting a scroll cursor at all — no
//! cursor, no run. Everything downstream of the cursor degrades
//! per-document into the [`FailureBatch`].

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cluster::EsClient;
use crate::common::FailureBatch;
use crate::progress::TransferProgress;

/// 🔧 Transfer knobs. Defaults mirror what the operators actually ran:
/// pages of 500, a five-minute scroll keep-alive, 30 seconds of patience
/// per bulk request.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Max documents per scroll page and per bulk write (the N of the
    /// "bounded batches" contract).
    pub batch_size: usize,
    /// Scroll cursor keep-alive, cluster duration syntax ("5m").
    pub scroll_keepalive: String,
    /// Server-side timeout parameter for each bulk write.
    pub request_timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            batch_size: 500,
            scroll_keepalive: "5m".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// 📋 What one transfer run amounted to. The failures in here are the
/// input to both the ledger and the repair pipeline.
#[derive(Debug)]
pub struct TransferReport {
    /// Documents read from the source and attempted against the target —
    /// successes and failures both count.
    pub total_docs: u64,
    pub failures: FailureBatch,
    pub elapsed: Duration,
}

impl TransferReport {
    /// Throughput, guarded against the zero-docs-in-zero-seconds run.
    pub fn docs_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 && self.total_docs > 0 {
            self.total_docs as f64 / secs
        } else {
            0.0
        }
    }
}

/// 🚚 The engine itself. Source and target may be the same client (same
/// server) or two different ones (cross-server copy) — the engine doesn't
/// care, it reads from one and writes to the other.
#[derive(Debug)]
pub struct TransferEngine<'a> {
    source: &'a EsClient,
    target: &'a EsClient,
    options: TransferOptions,
}

impl<'a> TransferEngine<'a> {
    pub fn new(source: &'a EsClient, target: &'a EsClient, options: TransferOptions) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    /// 🔄 Stream every document of `from_index` into `to_index`.
    ///
    /// Documents are written in scroll-cursor order, page by page; within a
    /// page the bulk write is one request, so per-item verdicts come back
    /// in submission order too. Rejections land in the report's failure
    /// batch and the loop keeps going — the remaining documents of the
    /// page were already in the same request, and subsequent pages are
    /// unaffected.
    pub async fn run(&self, from_index: &str, to_index: &str) -> Result<TransferReport> {
        info!("🚚 transferring '{from_index}' → '{to_index}' in batches of {}", self.options.batch_size);
        let start = Instant::now();

        // Fatal by contract: no cursor, no run.
        let mut scroll = self
            .source
            .scroll(
                from_index,
                self.options.batch_size,
                &self.options.scroll_keepalive,
            )
            .await
            .with_context(|| {
                format!("💀 could not open a scroll cursor over '{from_index}' — nothing was transferred")
            })?;

        let mut progress = TransferProgress::new(format!("{from_index} → {to_index}"));
        let mut total_docs: u64 = 0;
        let mut failures = FailureBatch::default();

        while let Some(page) = scroll.next_page().await? {
            // A page is at most batch_size docs, but chunk defensively in
            // case the cluster over-delivers — the bound is a promise we
            // make to the target, not one the source makes to us.
            for chunk in page.chunks(self.options.batch_size) {
                total_docs += chunk.len() as u64;
                let outcome = self
                    .target
                    .bulk(to_index, chunk, self.options.request_timeout)
                    .await
                    .with_context(|| {
                        format!("💀 a bulk write to '{to_index}' failed at the transport level")
                    })?;

                debug!(
                    "📦 bulk write: {} ok, {} rejected",
                    outcome.success,
                    outcome.failures.len()
                );
                progress.update(chunk.len() as u64, outcome.failures.len() as u64);
                failures.extend(outcome.failures);
            }
        }

        // Cursor cleanup is best-effort; the transfer is already done.
        scroll.clear().await?;
        progress.finish();

        let elapsed = start.elapsed();
        let report = TransferReport {
            total_docs,
            failures,
            elapsed,
        };
        info!(
            "✅ transferred {} docs in {:.1}s ({:.0} docs/s), {} failed",
            report.total_docs,
            elapsed.as_secs_f64(),
            report.docs_per_sec(),
            report.failures.len()
        );
        Ok(report)
    }
}
