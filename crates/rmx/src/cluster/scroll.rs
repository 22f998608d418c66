//! 📜 The scroll cursor — paginated reads over a server-held pointer.
//!
//! A scroll is a promise the cluster makes: "keep asking and I'll keep the
//! result set frozen for you, as long as you come back within the
//! keep-alive window." The keep-alive is refreshed on every request, so a
//! generous window ("5m" by default) tolerates the occasional slow bulk
//! write between pages without the cursor evaporating underneath us.

use anyhow::Result;
use serde::Deserialize;
use tracing::{trace, warn};

use crate::cluster::EsClient;
use crate::common::Doc;

/// One page of a scroll response — the cursor id plus the hits.
#[derive(Debug, Deserialize)]
pub(crate) struct ScrollPage {
    #[serde(rename = "_scroll_id", default)]
    pub(crate) scroll_id: Option<String>,
    pub(crate) hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HitsEnvelope {
    pub(crate) hits: Vec<Doc>,
}

/// A live scroll over one index. Vends pages until the result set runs
/// dry, then keeps returning `None`, fused-iterator style.
#[derive(Debug)]
pub struct Scroll<'a> {
    client: &'a EsClient,
    keep_alive: String,
    scroll_id: Option<String>,
    /// The page the open request already returned, waiting for the first
    /// `next_page` call.
    buffered: Option<Vec<Doc>>,
    exhausted: bool,
}

impl<'a> Scroll<'a> {
    pub(crate) fn opened(client: &'a EsClient, keep_alive: String, first: ScrollPage) -> Self {
        Self {
            client,
            keep_alive,
            scroll_id: first.scroll_id,
            buffered: Some(first.hits.hits),
            exhausted: false,
        }
    }

    /// 📄 The next page of documents, or `None` once the cursor is drained.
    ///
    /// An empty page means exhaustion — the cluster holds the cursor open a
    /// while longer, but there is nothing left behind it.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Doc>>> {
        if let Some(first) = self.buffered.take() {
            if first.is_empty() {
                // Zero-document index: the open call already told us.
                self.exhausted = true;
                return Ok(None);
            }
            return Ok(Some(first));
        }

        if self.exhausted {
            return Ok(None);
        }
        let Some(ref scroll_id) = self.scroll_id else {
            // No cursor id on a non-empty first page would be a cluster
            // bug; treat it as a one-page result set.
            self.exhausted = true;
            return Ok(None);
        };

        let page = self.client.scroll_next(scroll_id, &self.keep_alive).await?;
        if let Some(id) = page.scroll_id {
            // clusters may rotate the id between pages
            self.scroll_id = Some(id);
        }

        let docs = page.hits.hits;
        trace!("📖 scroll page delivered {} docs", docs.len());
        if docs.is_empty() {
            self.exhausted = true;
            Ok(None)
        } else {
            Ok(Some(docs))
        }
    }

    /// 🗑️ Release the server-side cursor. Best-effort by contract: a
    /// cursor we fail to clear just ages out of the keep-alive window, so
    /// callers log and move on rather than failing a finished transfer.
    pub async fn clear(self) -> Result<()> {
        if let Some(ref scroll_id) = self.scroll_id {
            if let Err(err) = self.client.scroll_clear(scroll_id).await {
                warn!("⚠️ could not clear the scroll cursor (it will expire on its own): {err}");
            }
        }
        Ok(())
    }
}
