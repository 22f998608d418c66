//! 💾 Dump and load — an index as files on disk.
//!
//! A dump is a directory of `<index>-N.json` files (one scroll hit per
//! line, `batch` docs per file, optionally gzipped to `.json.gz`) plus one
//! `<index>-metadata.json` with the index body (mappings, settings,
//! aliases). A load is the reverse trip: recreate the index from the
//! metadata, then bulk-feed every dump file back in, in numeric order.
//!
//! The format is deliberately boring. NDJSON lines are greppable, head-able
//! and streamable; the metadata file is pretty-printed for human eyes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{info, warn};

use crate::cluster::EsClient;
use crate::common::Doc;
use crate::confirm::Confirm;

const GZ_SUFFIX: &str = ".json.gz";
const PLAIN_SUFFIX: &str = ".json";

/// 🔧 Dump knobs: docs per file, and whether files get gzipped.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub batch: usize,
    pub gzip: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            batch: 1000,
            gzip: false,
        }
    }
}

/// One line of a dump file — the scroll hit, minus scoring noise.
#[derive(Serialize)]
struct DumpLine<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    doc_type: Option<&'a str>,
    #[serde(rename = "_id")]
    id: &'a str,
    #[serde(rename = "_source")]
    source: &'a RawValue,
}

fn dump_file_name(index: &str, file_index: usize, gzip: bool) -> String {
    let suffix = if gzip { GZ_SUFFIX } else { PLAIN_SUFFIX };
    format!("{index}-{file_index}{suffix}")
}

fn metadata_file_name(index: &str) -> String {
    format!("{index}-metadata.json")
}

/// Rolls NDJSON buffers into numbered files, gzipping on the way out when
/// asked. Buffers one file's worth of lines in memory — file size is
/// bounded by the batch, so this stays modest.
#[derive(Debug)]
struct DumpFileRoller {
    out_dir: PathBuf,
    index: String,
    gzip: bool,
    batch: usize,
    file_index: usize,
    docs_in_file: usize,
    buffer: String,
}

impl DumpFileRoller {
    fn new(out_dir: &Path, index: &str, options: &DumpOptions) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
            index: index.to_string(),
            gzip: options.gzip,
            batch: options.batch.max(1),
            file_index: 0,
            docs_in_file: 0,
            buffer: String::new(),
        }
    }

    async fn push_line(&mut self, line: &str) -> Result<()> {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.docs_in_file += 1;
        if self.docs_in_file >= self.batch {
            self.flush().await?;
            self.file_index += 1;
            self.docs_in_file = 0;
        }
        Ok(())
    }

    /// Writes the current buffer to its numbered file. Called on roll and
    /// once at the end — which also guarantees a `<index>-0.json` exists
    /// even for an empty index, because load discovers the dumped index
    /// name from exactly that file.
    async fn flush(&mut self) -> Result<()> {
        let file_name = dump_file_name(&self.index, self.file_index, self.gzip);
        let path = self.out_dir.join(&file_name);
        info!("    creating file {}", path.display());

        let bytes = if self.gzip {
            use std::io::Write;
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(self.buffer.as_bytes())
                .and_then(|_| encoder.finish())
                .context("💀 gzip encoding of a dump file failed, somehow")?
        } else {
            self.buffer.clone().into_bytes()
        };

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("💀 could not write dump file '{}'", path.display()))?;
        self.buffer.clear();
        Ok(())
    }
}

/// 📤 Dump an index: metadata file first, then every document the scroll
/// cursor delivers, `batch` per file. Returns the number of dumped docs.
pub async fn dump_index(
    client: &EsClient,
    index: &str,
    out_dir: &Path,
    options: &DumpOptions,
) -> Result<u64> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("💀 could not create dump dir '{}'", out_dir.display()))?;

    let metadata_path = out_dir.join(metadata_file_name(index));
    info!("dumping index '{index}' info at {}", metadata_path.display());
    let metadata = client.get_index(index).await?;
    let pretty = serde_json::to_string_pretty(&metadata)
        .context("💀 failed to pretty-print the index metadata")?;
    tokio::fs::write(&metadata_path, pretty)
        .await
        .with_context(|| format!("💀 could not write '{}'", metadata_path.display()))?;

    info!("dumping '{index}' in batches of {}", options.batch);
    let mut scroll = client
        .scroll(index, options.batch.max(1), "5m")
        .await
        .with_context(|| format!("💀 could not open a scroll cursor over '{index}' to dump it"))?;

    let mut roller = DumpFileRoller::new(out_dir, index, options);
    let mut dumped: u64 = 0;
    while let Some(page) = scroll.next_page().await? {
        for doc in &page {
            let line = serde_json::to_string(&DumpLine {
                index: &doc.index,
                doc_type: doc.doc_type.as_deref(),
                id: &doc.id,
                source: &doc.source,
            })
            .context("💀 failed to serialize a dump line")?;
            roller.push_line(&line).await?;
            dumped += 1;
        }
    }
    scroll.clear().await?;
    // final partial file — and file 0 for an empty index
    if roller.docs_in_file > 0 || roller.file_index == 0 {
        roller.flush().await?;
    }

    info!("✅ dumped {dumped} documents from '{index}'");
    Ok(dumped)
}

/// Figure out which index a dump dir holds, from its `<name>-0.json` file.
async fn discover_dumped_index_name(dump_dir: &Path) -> Result<String> {
    let mut entries = tokio::fs::read_dir(dump_dir)
        .await
        .with_context(|| format!("💀 could not read dump dir '{}'", dump_dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        for suffix in [GZ_SUFFIX, PLAIN_SUFFIX] {
            if let Some(name) = file_name.strip_suffix(suffix).and_then(|s| s.strip_suffix("-0")) {
                if !name.is_empty() {
                    return Ok(name.to_string());
                }
            }
        }
    }
    bail!(
        "no dump file (<index_name>-0.json) found on dump dir '{}'",
        dump_dir.display()
    )
}

/// Every `<name>-N.json[.gz]` in the dir, sorted by N — numerically, so
/// file 10 loads after file 9, not after file 1.
async fn discover_dump_files(dump_dir: &Path, index: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{index}-");
    let mut numbered: Vec<(usize, PathBuf)> = Vec::new();

    let mut entries = tokio::fs::read_dir(dump_dir)
        .await
        .with_context(|| format!("💀 could not read dump dir '{}'", dump_dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(rest) = file_name.strip_prefix(&prefix) else {
            continue;
        };
        let number = [GZ_SUFFIX, PLAIN_SUFFIX]
            .iter()
            .find_map(|suffix| rest.strip_suffix(suffix))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(number) = number {
            numbered.push((number, entry.path()));
        }
    }

    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

async fn read_dump_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("💀 could not read dump file '{}'", path.display()))?;
    if path.to_string_lossy().ends_with(GZ_SUFFIX) {
        use std::io::Read;
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut content = String::new();
        decoder
            .read_to_string(&mut content)
            .with_context(|| format!("💀 '{}' is not valid gzip after all", path.display()))?;
        Ok(content)
    } else {
        String::from_utf8(bytes)
            .with_context(|| format!("💀 '{}' is not valid UTF-8", path.display()))
    }
}

/// 📥 Load a dump dir into `index`. With `with_create`, the index is first
/// created from the dumped metadata; if it already exists the operator is
/// asked before it gets deleted and recreated (declining aborts the load —
/// pouring a dump into an index with the wrong mapping is how the failure
/// ledger gets its exercise).
///
/// Returns the number of successfully loaded documents.
pub async fn load_index(
    client: &EsClient,
    index: &str,
    dump_dir: &Path,
    with_create: bool,
    confirm: &mut dyn Confirm,
    batch: usize,
) -> Result<u64> {
    info!("loading dump from dir {} into index '{index}'", dump_dir.display());
    let dumped_name = discover_dumped_index_name(dump_dir).await?;

    if with_create {
        let metadata_path = dump_dir.join(metadata_file_name(&dumped_name));
        let metadata: serde_json::Value = serde_json::from_str(
            &tokio::fs::read_to_string(&metadata_path)
                .await
                .with_context(|| format!("💀 could not read '{}'", metadata_path.display()))?,
        )
        .with_context(|| format!("💀 '{}' is not valid JSON", metadata_path.display()))?;
        let body = metadata.get(&dumped_name).cloned().with_context(|| {
            format!("'{}' has no entry for index '{dumped_name}'", metadata_path.display())
        })?;

        if client.index_exists(index).await? {
            if !confirm.confirm(&format!(
                "Index '{index}' already exists, do you want me to recreate it?"
            )) {
                bail!("index '{index}' already exists and the operator declined to recreate it");
            }
            client.delete_index(index, false).await?;
        }
        client.create_index(index, Some(&body)).await?;
    }

    let mut loaded: u64 = 0;
    let mut rejected: u64 = 0;
    for path in discover_dump_files(dump_dir, &dumped_name).await? {
        info!("    loading file {}", path.display());
        let content = read_dump_file(&path).await?;
        let docs = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<Doc>(line).with_context(|| {
                    format!("💀 bad dump line in '{}': {line}", path.display())
                })
            })
            .collect::<Result<Vec<Doc>>>()?;

        for chunk in docs.chunks(batch.max(1)) {
            let outcome = client
                .bulk(index, chunk, std::time::Duration::from_secs(30))
                .await?;
            loaded += outcome.success;
            rejected += outcome.failures.len() as u64;
        }
    }

    if rejected > 0 {
        warn!("⚠️ {rejected} document(s) were rejected while loading");
    }
    info!("✅ loaded {loaded} documents");
    Ok(loaded)
}
