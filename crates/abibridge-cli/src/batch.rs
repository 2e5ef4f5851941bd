use abibridge_contracts::ABIBRIDGE_BATCH_REPORT_SCHEMA_VERSION;
use abibridge_core::EmitOptions;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::output::{contract_name_for, generate_file, sync_output, SyncOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Written,
    Unchanged,
    Drift,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub abi: String,
    pub out: String,
    pub contract_name: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub schema_version: &'static str,
    pub ok: bool,
    pub check: bool,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
}

/// Generates bindings for every ABI the config selects. One bad ABI does not
/// stop the others; failures are counted in the report.
pub fn run_batch(cfg: &Config, check: bool) -> Result<BatchReport> {
    let abis = cfg.discover_abis()?;
    if abis.is_empty() {
        anyhow::bail!("no ABI files matched under {}", cfg.abi_root.display());
    }
    info!(count = abis.len(), check, "generating bindings");

    let mut entries = Vec::with_capacity(abis.len());
    for (rel, abs) in &abis {
        let out_path = cfg.output_path(rel);
        let contract_name = contract_name_for(abs);
        let opts = EmitOptions {
            runtime_module: cfg.runtime_module.clone(),
            source_sha256: None,
        };
        let result = generate_file(abs, &contract_name, opts, cfg.embed_source_hash)
            .and_then(|src| sync_output(&out_path, &src, check));
        let (status, error) = match result {
            Ok(SyncOutcome::Written) => (EntryStatus::Written, None),
            Ok(SyncOutcome::Unchanged) => (EntryStatus::Unchanged, None),
            Ok(SyncOutcome::Drift) => (
                EntryStatus::Drift,
                Some(format!("generated output differs: {}", out_path.display())),
            ),
            Err(err) => {
                warn!(abi = %rel, "generation failed: {err:#}");
                (EntryStatus::Failed, Some(format!("{err:#}")))
            }
        };
        entries.push(BatchEntry {
            abi: rel.clone(),
            out: out_path.display().to_string(),
            contract_name,
            status,
            error,
        });
    }

    let failed = entries
        .iter()
        .filter(|e| matches!(e.status, EntryStatus::Drift | EntryStatus::Failed))
        .count();
    Ok(BatchReport {
        schema_version: ABIBRIDGE_BATCH_REPORT_SCHEMA_VERSION,
        ok: failed == 0,
        check,
        failed,
        entries,
    })
}

pub fn render_text(report: &BatchReport) -> String {
    let mut out = String::new();
    for e in &report.entries {
        let status = match e.status {
            EntryStatus::Written => "wrote",
            EntryStatus::Unchanged => "ok",
            EntryStatus::Drift => "drift",
            EntryStatus::Failed => "FAILED",
        };
        out.push_str(&format!("{status:<7}{} -> {}\n", e.abi, e.out));
        if let Some(err) = &e.error {
            out.push_str(&format!("  -> {err}\n"));
        }
    }
    out
}

pub fn failure_summary(report: &BatchReport) -> Option<String> {
    (report.failed > 0).then(|| format!("{} contract(s) failed to generate", report.failed))
}

pub fn render_json(report: &BatchReport) -> Result<String> {
    let mut text = serde_json::to_string_pretty(report).context("serialize batch report")?;
    text.push('\n');
    Ok(text)
}
