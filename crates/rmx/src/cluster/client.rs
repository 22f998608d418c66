//! 🔌 `EsClient` — the reqwest-backed cluster client.
//!
//! One HTTP client, reused across requests, with the auth dance applied
//! uniformly: api_key beats basic auth, this is not a democracy. Timeouts
//! are generous on purpose — scroll pages and bulk writes of chunky
//! documents can legitimately take tens of seconds, and a paranoid 5s
//! timeout mid-transfer is how you orphan a scroll cursor.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::cluster::bulk::{self, BulkOutcome};
use crate::cluster::scroll::{Scroll, ScrollPage};
use crate::common::Doc;

/// 🔧 Connection settings for one cluster.
///
/// Auth is tri-modal: username+password, api_key, or "I hope anonymous
/// works" (on a production cluster, it won't).
#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    /// 📡 Cluster URL. Include scheme + port. Yes, all of it.
    /// No, `localhost` alone is not enough. Yes, I know it worked in dev.
    /// Defaults to localhost so a `[connection]` section that only sets
    /// credentials still parses.
    #[serde(default = "default_cluster_url")]
    pub url: String,
    /// 🔒 Username for basic auth. Optional, like flossing.
    #[serde(default)]
    pub username: Option<String>,
    /// 🔒 Password. If this is in plaintext in your config file, consider
    /// an environment variable instead (`RMX_CONNECTION__PASSWORD` works).
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key auth — preferred over basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_cluster_url() -> String {
    "http://localhost:9200".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: default_cluster_url(),
            username: None,
            password: None,
            api_key: None,
        }
    }
}

impl ClusterConfig {
    /// Anonymous config for a bare URL — the common case when the operator
    /// passes `-c http://somewhere:9200` or a full index URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// 📡 The cluster client. Cheap to clone the config, expensive to lose the
/// connection pool — build one per server and pass it around by reference.
#[derive(Debug)]
pub struct EsClient {
    http: reqwest::Client,
    config: ClusterConfig,
}

impl EsClient {
    /// 🚀 Build the HTTP client. 10 second connect timeout because if the
    /// cluster can't handshake in 10 seconds it's not having a good day.
    /// 60 second request timeout because scroll pages and bulk bodies can
    /// be meaty and we're not monsters.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .context(
                "💀 The HTTP client refused to be born. Probably a missing TLS cert \
                 or a cursed system OpenSSL. Either way: tragic.",
            )?;
        Ok(Self { http, config })
    }

    /// The server URL this client talks to, as configured.
    pub fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    // trim_end_matches('/') — the "/" hygiene you didn't know you needed.
    // Without it: `https://host//my-index`. One slash of difference,
    // infinite suffering of difference.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path)
    }

    // 🔒 Auth priority: api_key wins over basic auth, everywhere, always.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("ApiKey {api_key}"))
        } else if let Some(ref username) = self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }

    /// Check the status, then parse the body. Failing loudly here — with
    /// the response body in the error — beats a bare "expected value at
    /// line 1" three layers up.
    async fn expect_json<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("💀 reading the response body for {what} failed mid-flight"))?;
        if !status.is_success() {
            bail!("💀 {what} failed with status {status}: {body}");
        }
        serde_json::from_str(&body)
            .with_context(|| format!("💀 {what} returned a body we could not parse: {body}"))
    }

    /// 📡 Connectivity ping — "Hello? Is this thing on?" Fails loudly here
    /// rather than quietly 50,000 documents into a transfer.
    pub async fn ping(&self) -> Result<()> {
        let response = self
            .authorize(self.http.get(self.base_url()))
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 Could not reach the cluster at '{}'. We knocked. Nobody answered. \
                     Check the URL, check the network, check that the thing is running.",
                    self.base_url()
                )
            })?;
        let status = response.status();
        if !status.is_success() {
            bail!(
                "💀 The cluster at '{}' answered the ping with {status}. \
                 It is alive but unhappy — probably an auth problem.",
                self.base_url()
            );
        }
        Ok(())
    }

    // ===== Index lifecycle =====

    /// Does the index exist? HEAD request, 200 = yes, 404 = no, anything
    /// else = the cluster is being difficult and we say so.
    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .authorize(self.http.head(self.url(name)))
            .send()
            .await
            .with_context(|| format!("💀 existence check for index '{name}' never got an answer"))?;
        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            other => bail!("💀 existence check for index '{name}' came back with status {other}"),
        }
    }

    /// 🏗️ Create an index, optionally with a body (mappings, settings,
    /// aliases). Failures here are fatal by design: every remap phase
    /// depends on the index actually existing afterwards.
    pub async fn create_index(&self, name: &str, body: Option<&Value>) -> Result<()> {
        debug!("🏗️ creating index '{name}'");
        let mut request = self.authorize(self.http.put(self.url(name)));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("💀 create request for index '{name}' never arrived"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("💀 creating index '{name}' failed with status {status}: {body}");
        }
        Ok(())
    }

    /// 🗑️ Delete an index. With `ignore_missing`, a 404 (or the 400 some
    /// old clusters return for the same situation) is a quiet success —
    /// that's the "clear out the tmp index if a previous run left one
    /// behind" mode.
    pub async fn delete_index(&self, name: &str, ignore_missing: bool) -> Result<()> {
        debug!("🗑️ deleting index '{name}' (ignore_missing: {ignore_missing})");
        let response = self
            .authorize(self.http.delete(self.url(name)))
            .send()
            .await
            .with_context(|| format!("💀 delete request for index '{name}' never arrived"))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if ignore_missing && matches!(status.as_u16(), 400 | 404) {
            trace!("🗑️ index '{name}' was already gone — the best kind of delete");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        bail!("💀 deleting index '{name}' failed with status {status}: {body}");
    }

    /// 📖 Fetch the full index metadata (mappings, settings, aliases) —
    /// the body shape the dump command writes to `<index>-metadata.json`.
    pub async fn get_index(&self, name: &str) -> Result<Value> {
        let response = self
            .authorize(self.http.get(self.url(name)))
            .send()
            .await
            .with_context(|| format!("💀 metadata request for index '{name}' never arrived"))?;
        Self::expect_json(response, &format!("fetching metadata of index '{name}'")).await
    }

    /// 🏷️ The alias names currently pointing at an index. Missing aliases
    /// (or a missing index) resolve to an empty list, matching how the
    /// remap flow treats "no aliases to carry over".
    pub async fn get_aliases(&self, name: &str) -> Result<Vec<String>> {
        let response = self
            .authorize(self.http.get(self.url(&format!("{name}/_alias"))))
            .send()
            .await
            .with_context(|| format!("💀 alias lookup for index '{name}' never arrived"))?;
        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        let body: Value =
            Self::expect_json(response, &format!("fetching aliases of index '{name}'")).await?;
        let aliases = body
            .get(name)
            .and_then(|index| index.get("aliases"))
            .and_then(Value::as_object)
            .map(|aliases| aliases.keys().cloned().collect())
            .unwrap_or_default();
        Ok(aliases)
    }

    /// 🏷️ Point an alias at an index.
    pub async fn put_alias(&self, index: &str, alias: &str) -> Result<()> {
        let response = self
            .authorize(self.http.put(self.url(&format!("{index}/_alias/{alias}"))))
            .send()
            .await
            .with_context(|| format!("💀 alias put '{alias}' → '{index}' never arrived"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("💀 putting alias '{alias}' on index '{index}' failed with status {status}: {body}");
        }
        Ok(())
    }

    // ===== Single documents =====

    /// 📄 Fetch one document by id. Used by the repair pipeline to get a
    /// pristine copy of a failed document from the source index.
    pub async fn get_doc(&self, index: &str, id: &str) -> Result<Doc> {
        let response = self
            .authorize(self.http.get(self.url(&format!("{index}/_doc/{id}"))))
            .send()
            .await
            .with_context(|| format!("💀 fetch of document '{id}' from '{index}' never arrived"))?;
        Self::expect_json(response, &format!("fetching document '{id}' from '{index}'")).await
    }

    /// ✏️ Write one document under an explicit id (and type, for clusters
    /// old enough to care). This is the repair pipeline's retry path — the
    /// fixed body goes to the target under the *same* identity it failed
    /// with, so a later diff between source and target lines up.
    pub async fn put_doc(
        &self,
        index: &str,
        id: &str,
        doc_type: Option<&str>,
        body: &Value,
    ) -> Result<()> {
        let path = match doc_type {
            Some(doc_type) if doc_type != "_doc" => format!("{index}/{doc_type}/{id}"),
            _ => format!("{index}/_doc/{id}"),
        };
        let response = self
            .authorize(self.http.put(self.url(&path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("💀 write of document '{id}' to '{index}' never arrived"))?;
        let status = response.status();
        if !status.is_success() {
            let response_body = response.text().await.unwrap_or_default();
            bail!(
                "💀 writing document '{id}' to index '{index}' failed with status {status}: \
                 {response_body}"
            );
        }
        Ok(())
    }

    // ===== Scroll =====

    /// 📜 Open a server-side scroll cursor over an index.
    ///
    /// This is the one failure in a transfer that is allowed to be fatal:
    /// if the cursor won't open there is no run to salvage. Everything
    /// after this point degrades per-document instead.
    pub async fn scroll(
        &self,
        index: &str,
        page_size: usize,
        keep_alive: &str,
    ) -> Result<Scroll<'_>> {
        let body = json!({
            "size": page_size,
            "query": {"match_all": {}},
            // _doc order: the cheapest sort a scroll can ask for
            "sort": ["_doc"],
        });
        let response = self
            .authorize(
                self.http
                    .post(self.url(&format!("{index}/_search")))
                    .query(&[("scroll", keep_alive)])
                    .json(&body),
            )
            .send()
            .await
            .with_context(|| format!("💀 opening a scroll cursor over '{index}' never arrived"))?;
        let page: ScrollPage =
            Self::expect_json(response, &format!("opening a scroll cursor over '{index}'")).await?;
        Ok(Scroll::opened(self, keep_alive.to_string(), page))
    }

    pub(crate) async fn scroll_next(&self, scroll_id: &str, keep_alive: &str) -> Result<ScrollPage> {
        let body = json!({"scroll": keep_alive, "scroll_id": scroll_id});
        let response = self
            .authorize(self.http.post(self.url("_search/scroll")).json(&body))
            .send()
            .await
            .context("💀 the next scroll page never arrived — cursor may have timed out")?;
        Self::expect_json(response, "fetching the next scroll page").await
    }

    pub(crate) async fn scroll_clear(&self, scroll_id: &str) -> Result<()> {
        let body = json!({"scroll_id": [scroll_id]});
        let response = self
            .authorize(self.http.delete(self.url("_search/scroll")).json(&body))
            .send()
            .await
            .context("💀 clearing the scroll cursor never arrived")?;
        let status = response.status();
        if !status.is_success() {
            bail!("💀 clearing the scroll cursor failed with status {status}");
        }
        Ok(())
    }

    // ===== Bulk =====

    /// 📦 Bulk-write documents into a target index.
    ///
    /// The response is parsed per item: rejected documents come back as
    /// structured failures, they are never an `Err`. Only a transport-level
    /// problem — the request not arriving, or the whole response being
    /// non-2xx — is an error here.
    pub async fn bulk(
        &self,
        target_index: &str,
        docs: &[Doc],
        timeout: Duration,
    ) -> Result<BulkOutcome> {
        if docs.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let payload = bulk::render_bulk_payload(target_index, docs)?;
        trace!(
            "📡 sending {} bytes ({} docs) to /_bulk",
            payload.len(),
            docs.len()
        );
        let response = self
            .authorize(
                self.http
                    .post(self.url("_bulk"))
                    // ⚠️ application/x-ndjson, not application/json — the
                    // cluster will 406 or silently misbehave without it.
                    .header("Content-Type", "application/x-ndjson")
                    .query(&[("timeout", format!("{}s", timeout.as_secs()))])
                    // The query param only bounds the cluster's shard wait;
                    // this bounds the request itself, overriding the
                    // client-wide 60s for bulk specifically.
                    .timeout(timeout)
                    .body(payload),
            )
            .send()
            .await
            .context(
                "💀 The bulk request never made it to the cluster. Check connectivity, \
                 check timeouts, and check your feelings.",
            )?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("💀 reading the bulk response body failed mid-flight")?;
        if !status.is_success() {
            bail!("💀 the bulk request itself was rejected with status {status}: {body}");
        }
        bulk::parse_bulk_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn doc(id: &str) -> Doc {
        serde_json::from_str(&format!(
            r#"{{"_index": "src", "_id": "{id}", "_source": {{"a": 1}}}}"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn the_one_where_a_slow_bulk_hits_the_request_timeout() {
        let server = MockServer::start().await;
        // The cluster answers eventually — far past the budget the caller
        // set. The configured timeout must bound the request client-side,
        // not just ride along as a query parameter.
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"errors": false, "items": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = EsClient::new(ClusterConfig::for_url(server.uri())).unwrap();
        let err = client
            .bulk("dst", &[doc("1")], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("never made it to the cluster"));
    }

    #[tokio::test]
    async fn the_one_where_a_prompt_bulk_fits_comfortably_in_the_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": false,
                "items": [{"index": {"_index": "dst", "_id": "1", "status": 201}}]
            })))
            .mount(&server)
            .await;

        let client = EsClient::new(ClusterConfig::for_url(server.uri())).unwrap();
        let outcome = client
            .bulk("dst", &[doc("1")], Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(outcome.success, 1);
    }
}
