use std::path::{Path, PathBuf};

use abibridge_contracts::{
    ABIBRIDGE_CONFIG_SCHEMA_VERSION, DEFAULT_ABI_INCLUDE_GLOB, DEFAULT_CONFIG_FILE_NAME,
    DEFAULT_RUNTIME_MODULE,
};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    schema_version: String,
    #[serde(default)]
    abi_root: Option<PathBuf>,
    #[serde(default)]
    out_dir: Option<PathBuf>,
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    runtime_module: Option<String>,
    #[serde(default)]
    embed_source_hash: Option<bool>,
}

/// Batch generation settings with every path made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub abi_root: PathBuf,
    /// `None` writes each binding next to its ABI.
    pub out_dir: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub runtime_module: String,
    pub embed_source_hash: bool,
}

impl Config {
    pub fn defaults_at(base: &Path) -> Self {
        Config {
            abi_root: base.to_path_buf(),
            out_dir: None,
            include: vec![DEFAULT_ABI_INCLUDE_GLOB.to_string()],
            exclude: vec!["**/node_modules/**".to_string(), "**/target/**".to_string()],
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            embed_source_hash: true,
        }
    }

    /// Loads `path`, or `abibridge.json` in the current directory when no path
    /// is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let cwd = std::env::current_dir().context("get current dir")?;
        let (path, required) = match path {
            Some(p) => (resolve_abs(&cwd, p), true),
            None => (cwd.join(DEFAULT_CONFIG_FILE_NAME), false),
        };
        if !required && !path.is_file() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::defaults_at(&cwd));
        }

        let bytes =
            std::fs::read(&path).with_context(|| format!("read config: {}", path.display()))?;
        let file: ConfigFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config JSON: {}", path.display()))?;
        if file.schema_version.trim() != ABIBRIDGE_CONFIG_SCHEMA_VERSION {
            anyhow::bail!(
                "config schema_version mismatch: expected {ABIBRIDGE_CONFIG_SCHEMA_VERSION} got {:?}",
                file.schema_version
            );
        }

        let base = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
        let defaults = Config::defaults_at(&base);
        Ok(Config {
            abi_root: file
                .abi_root
                .map(|p| resolve_abs(&base, &p))
                .unwrap_or(defaults.abi_root),
            out_dir: file.out_dir.map(|p| resolve_abs(&base, &p)),
            include: file.include.unwrap_or(defaults.include),
            exclude: if file.exclude.is_empty() {
                defaults.exclude
            } else {
                file.exclude
            },
            runtime_module: file.runtime_module.unwrap_or(defaults.runtime_module),
            embed_source_hash: file.embed_source_hash.unwrap_or(defaults.embed_source_hash),
        })
    }

    /// ABI files under `abi_root` matching `include` and not `exclude`, as
    /// `(slash-separated relative path, absolute path)`, sorted by relative path.
    pub fn discover_abis(&self) -> Result<Vec<(String, PathBuf)>> {
        let include = compile_globset(&self.include).context("compile include globs")?;
        let exclude = compile_globset(&self.exclude).context("compile exclude globs")?;

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.abi_root)
            .follow_links(false)
            .into_iter()
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let abs = entry.into_path();
            let rel = abs.strip_prefix(&self.abi_root).with_context(|| {
                format!(
                    "strip prefix {} from {}",
                    self.abi_root.display(),
                    abs.display()
                )
            })?;
            let rel_text = rel_path_slash(rel)?;
            if !include.is_match(&rel_text) || exclude.is_match(&rel_text) {
                continue;
            }
            found.push((rel_text, abs));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    /// Where the binding for the ABI at `rel` goes: `<stem>.ts`, either next
    /// to the ABI or at the same relative location under `out_dir`.
    pub fn output_path(&self, rel: &str) -> PathBuf {
        let root = self.out_dir.as_ref().unwrap_or(&self.abi_root);
        let mut out = root.to_path_buf();
        for seg in rel.split('/') {
            out.push(seg);
        }
        out.set_extension("ts");
        out
    }
}

fn resolve_abs(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn compile_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        builder.add(Glob::new(g).with_context(|| format!("invalid glob: {g:?}"))?);
    }
    builder.build().context("build globset")
}

fn rel_path_slash(path: &Path) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for comp in path.components() {
        match comp {
            std::path::Component::Normal(s) => {
                parts.push(s.to_str().context("path contains non-utf8 component")?);
            }
            other => anyhow::bail!("unsupported relative path component: {other:?}"),
        }
    }
    Ok(parts.join("/"))
}
