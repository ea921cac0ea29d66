//! `<report>.provenance.json`: which build, settings and target produced a
//! written report.

use anyhow::{Context, Result};
use optigraph::deviation::TargetKind;
use optigraph::enumerate::SearchCfg;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Serialize)]
pub struct Provenance<'a> {
    pub code_rev: String,
    pub version: &'static str,
    pub command: &'static str,
    pub target: TargetKind,
    pub cfg: &'a SearchCfg,
    /// Templates searched or topology lines scored.
    pub units: u64,
    pub best_deviation: Option<f64>,
    /// Command-specific inputs (paths, counts, thread numbers).
    pub inputs: Value,
}

impl<'a> Provenance<'a> {
    pub fn new(command: &'static str, target: TargetKind, cfg: &'a SearchCfg, inputs: Value) -> Self {
        Self {
            code_rev: code_rev(),
            version: optigraph::VERSION,
            command,
            target,
            cfg,
            units: 0,
            best_deviation: None,
            inputs,
        }
    }

    pub fn outcome(mut self, units: u64, best_deviation: Option<f64>) -> Self {
        self.units = units;
        self.best_deviation = best_deviation;
        self
    }
}

pub fn sidecar_path(report: &Path) -> PathBuf {
    report.with_extension("provenance.json")
}

/// Write the sidecar next to `report` and return its path.
pub fn write_sidecar(report: &Path, prov: &Provenance<'_>) -> Result<PathBuf> {
    let path = sidecar_path(report);
    fs::write(&path, serde_json::to_vec_pretty(prov)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// `GIT_COMMIT` if set, else the checkout's HEAD, else `"unknown"`.
pub fn code_rev() -> String {
    std::env::var("GIT_COMMIT")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(git_head)
        .unwrap_or_else(|| "unknown".to_owned())
}

fn git_head() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok().map(|s| s.trim().to_owned())
}
