//! Search configuration: optional JSON file, then command-line overrides.

use anyhow::{Context, Result};
use clap::Args;
use optigraph::enumerate::SearchCfg;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Flags shared by `score` and `search`.
#[derive(Args, Debug, Clone, Default)]
pub struct Tuning {
    /// JSON file with a `SearchCfg`; missing fields keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Wall-clock budget of one optimization, in milliseconds
    #[arg(long)]
    pub max_time_ms: Option<u64>,
    /// Parameter tolerance of the local refinement
    #[arg(long)]
    pub xtol: Option<f64>,
    /// Seed of the global sampling phase
    #[arg(long)]
    pub seed: Option<u64>,
    /// Add unitarity equality constraints
    #[arg(long)]
    pub unitarity: bool,
}

impl Tuning {
    pub fn resolve(&self) -> Result<SearchCfg> {
        let mut cfg = match &self.config {
            Some(path) => load(path)?,
            None => SearchCfg::default(),
        };
        if let Some(ms) = self.max_time_ms {
            cfg.optimizer.max_time_ms = ms;
        }
        if let Some(xtol) = self.xtol {
            cfg.optimizer.xtol = xtol;
        }
        if let Some(seed) = self.seed {
            cfg.optimizer.seed = seed;
        }
        cfg.unitarity |= self.unitarity;
        Ok(cfg)
    }
}

fn load(path: &Path) -> Result<SearchCfg> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_file() {
        let cfg = Tuning::default().resolve().unwrap();
        assert_eq!(cfg, SearchCfg::default());
    }

    #[test]
    fn file_then_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(
            &path,
            r#"{"template_depth": 2, "optimizer": {"max_time_ms": 40, "seed": 3}}"#,
        )
        .unwrap();
        let tuning = Tuning {
            config: Some(path),
            seed: Some(11),
            unitarity: true,
            ..Tuning::default()
        };
        let cfg = tuning.resolve().unwrap();
        assert_eq!(cfg.template_depth, 2);
        assert_eq!(cfg.optimizer.max_time_ms, 40);
        assert_eq!(cfg.optimizer.seed, 11);
        assert!(cfg.unitarity);
        assert_eq!(cfg.optimizer.xtol, SearchCfg::default().optimizer.xtol);
    }

    #[test]
    fn bad_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, "{ not json").unwrap();
        let tuning = Tuning {
            config: Some(path),
            ..Tuning::default()
        };
        let err = format!("{:#}", tuning.resolve().unwrap_err());
        assert!(err.contains("cfg.json"), "{err}");
    }
}
