//! 🔧 App configuration — the TOML-and-env-var-to-struct pipeline.
//!
//! Powered by Figment: environment variables (`RMX_*`) as the base layer,
//! an optional TOML file merged on top. Nested keys use a double
//! underscore in the environment (`RMX_CONNECTION__PASSWORD`), which is
//! also the sanctioned way to keep a password out of the config file.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::cluster::ClusterConfig;
use crate::transfer::TransferOptions;

/// 📦 Everything the tool needs to know about itself. Every field has a
/// default, so an empty environment and no file still produce a working
/// config pointed at localhost.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 📡 The cluster to talk to when a command doesn't name one.
    #[serde(default)]
    pub connection: ClusterConfig,
    #[serde(default)]
    pub transfer: TransferSettings,
}

/// 🔧 Transfer knobs in config-file form. Kept separate from
/// [`TransferOptions`] because Figment wants plain deserializable fields,
/// not `Duration`s.
#[derive(Debug, Deserialize, Clone)]
pub struct TransferSettings {
    #[serde(default = "default_batch")]
    pub batch: usize,
    #[serde(default = "default_scroll_keepalive")]
    pub scroll_keepalive: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_batch() -> usize {
    500
}

fn default_scroll_keepalive() -> String {
    "5m".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            batch: default_batch(),
            scroll_keepalive: default_scroll_keepalive(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TransferSettings {
    pub fn to_options(&self) -> TransferOptions {
        TransferOptions {
            batch_size: self.batch,
            scroll_keepalive: self.scroll_keepalive.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// 🚀 Load the config: env vars always, a TOML file only when one was
/// actually provided. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    if let Some(file_name) = config_file_name {
        info!("🔧 loading configuration from '{}'", file_name.display());
    }

    let config = Figment::new().merge(Env::prefixed("RMX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment \
             variables (RMX_*). One of them is lying about its types.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (RMX_*). \
                 No file was provided — this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_test_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("💀 no temp dir, no tests");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("💀 failed to write the test config");
        (dir, path)
    }

    #[test]
    fn the_one_where_nothing_is_configured_and_localhost_it_is() {
        let config: AppConfig = Figment::new()
            .extract()
            .expect("💀 an empty figment should still produce defaults");
        assert_eq!(config.connection.url, "http://localhost:9200");
        assert_eq!(config.transfer.batch, 500);
        assert_eq!(config.transfer.scroll_keepalive, "5m");
    }

    #[test]
    fn the_one_where_the_toml_file_speaks_and_is_heard() {
        let (_dir, path) = write_test_config(
            r#"
            [connection]
            url = "https://search.example.org:9243"
            username = "operator"
            password = "hunter2"

            [transfer]
            batch = 250
            request_timeout_secs = 90
            "#,
        );

        let config = load_config(Some(&path)).expect("💀 a perfectly valid TOML should parse");
        assert_eq!(config.connection.url, "https://search.example.org:9243");
        assert_eq!(config.connection.username.as_deref(), Some("operator"));
        assert_eq!(config.transfer.batch, 250);

        let options = config.transfer.to_options();
        assert_eq!(options.request_timeout, Duration::from_secs(90));
        // unset keys keep their defaults
        assert_eq!(options.scroll_keepalive, "5m");
    }

    #[test]
    fn the_one_where_a_partial_file_leans_on_the_defaults() {
        let (_dir, path) = write_test_config(
            r#"
            [connection]
            url = "http://qa-cluster:9200"
            "#,
        );

        let config = load_config(Some(&path)).expect("💀 partial configs are legal");
        assert_eq!(config.connection.url, "http://qa-cluster:9200");
        assert!(config.connection.api_key.is_none());
        assert_eq!(config.transfer.request_timeout_secs, 30);
    }

    #[test]
    fn the_one_where_connection_sets_only_credentials_and_localhost_steps_in() {
        // A [connection] section without a url must still parse — the url
        // falls back to the same localhost the full Default supplies.
        let (_dir, path) = write_test_config(
            r#"
            [connection]
            username = "operator"
            password = "hunter2"
            "#,
        );

        let config = load_config(Some(&path)).expect("💀 url-less connection sections are legal");
        assert_eq!(config.connection.url, "http://localhost:9200");
        assert_eq!(config.connection.username.as_deref(), Some("operator"));
    }

    #[test]
    fn the_one_where_the_toml_is_garbage_and_the_error_says_where() {
        let (_dir, path) = write_test_config("this is not toml [[[");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration"));
    }
}
