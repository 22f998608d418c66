//! 🗺️ rmx — operator tooling for reindexing, remapping and repairing
//! search cluster indices.
//!
//! The load-bearing pieces:
//!
//! - [`transfer`] — the batch engine that streams one index into another
//!   and treats rejected documents as data, not as reasons to stop,
//! - [`repair`] — the semi-automatic pipeline that classifies those
//!   rejections and fixes the fixable ones, one confirm gate at a time,
//! - [`ledger`] — the durable JSON trail of what stayed broken,
//! - [`ops`] — the command-level flows (copy, the remap dance,
//!   force-migrate) that tie the above together,
//! - [`cluster`] — the reqwest-backed client (scroll cursors, bulk
//!   writes, index lifecycle),
//! - [`dump`] / [`mappings`] — index-to-files and mapping-merge support.

pub mod app_config;
pub mod cluster;
pub mod common;
pub mod confirm;
pub mod dump;
pub mod ledger;
pub mod mappings;
pub mod ops;
pub mod progress;
pub mod repair;
pub mod transfer;

pub use app_config::{AppConfig, load_config};
pub use cluster::{ClusterConfig, EsClient, split_index_url};
pub use common::{Doc, ErrorCause, FailureBatch, TransferFailure};
pub use confirm::{AutoYes, Confirm};
pub use repair::{RepairOrchestrator, RepairOutcome, RepairSummary};
pub use transfer::{TransferEngine, TransferOptions, TransferReport};
