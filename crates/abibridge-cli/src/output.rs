use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use abibridge_core::{names, sha256_hex, EmitOptions};
use anyhow::{Context, Result};
use tracing::debug;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Written,
    Unchanged,
    /// Only in check mode: the file on disk is missing or differs.
    Drift,
}

/// `dacdirectory.abi` -> `Dacdirectory`, `eosio.token.abi` -> `EosioToken`.
pub fn contract_name_for(abi_path: &Path) -> String {
    let stem = abi_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    names::pascal_case(&stem)
}

pub fn generate_file(
    abi_path: &Path,
    contract_name: &str,
    mut opts: EmitOptions,
    embed_source_hash: bool,
) -> Result<String> {
    let bytes =
        std::fs::read(abi_path).with_context(|| format!("read ABI: {}", abi_path.display()))?;
    if embed_source_hash {
        opts.source_sha256 = Some(sha256_hex(&bytes));
    }
    let doc = abibridge_core::schema::parse_document_bytes(&bytes)
        .with_context(|| format!("parse ABI: {}", abi_path.display()))?;
    let graph = abibridge_core::resolve(&doc)
        .with_context(|| format!("resolve ABI: {}", abi_path.display()))?;
    let src = abibridge_core::emit(&graph, contract_name, &opts)
        .with_context(|| format!("emit bindings for {}", abi_path.display()))?;
    debug!(abi = %abi_path.display(), contract = contract_name, "generated bindings");
    Ok(src)
}

/// Writes `src` to `path` unless it already holds exactly that text. In check
/// mode nothing is written.
pub fn sync_output(path: &Path, src: &str, check: bool) -> Result<SyncOutcome> {
    let current = match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("read existing output: {}", path.display()))
        }
    };
    if current.as_deref() == Some(src) {
        return Ok(SyncOutcome::Unchanged);
    }
    if check {
        return Ok(SyncOutcome::Drift);
    }
    write_atomic(path, src.as_bytes())?;
    Ok(SyncOutcome::Written)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let tmp = temp_path_next_to(path);
    std::fs::write(&tmp, contents).with_context(|| format!("write temp: {}", tmp.display()))?;

    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            let _ = std::fs::remove_file(path);
            std::fs::rename(&tmp, path).with_context(|| format!("rename: {}", path.display()))?;
            Ok(())
        }
    }
}

fn temp_path_next_to(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let pid = std::process::id();
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{file_name}.{pid}.{n}.tmp"))
}
