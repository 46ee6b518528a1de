//! Harness configuration stored in a TOML file (e.g. `fraccalc.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Harness configuration (TOML).
///
/// Missing fields default to the classic checkpoint layout:
/// `./tests_checkpoint<id>.txt`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding checkpoint files.
    pub checkpoint_dir: PathBuf,

    /// Checkpoint file name prefix, followed by the checkpoint id.
    pub file_prefix: String,

    /// Checkpoint file extension (without the dot).
    pub file_extension: String,

    /// Text shown before each line of input.
    pub prompt: String,

    /// When set, every replay also writes a JSON run report to this path.
    pub report_path: Option<PathBuf>,

    /// Tracing filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("."),
            file_prefix: "tests_checkpoint".to_string(),
            file_extension: "txt".to_string(),
            prompt: "Enter: ".to_string(),
            report_path: None,
            log_filter: crate::logging::DEFAULT_FILTER.to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.checkpoint_dir.as_os_str().is_empty() {
            return Err(anyhow!("checkpoint_dir must be non-empty"));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(anyhow!("file_prefix must not contain path separators"));
        }
        if self.file_extension.is_empty() || self.file_extension.contains(['/', '\\', '.']) {
            return Err(anyhow!(
                "file_extension must be non-empty and must not contain '.' or path separators"
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(anyhow!("log_filter must be non-empty"));
        }
        if let Some(report_path) = &self.report_path {
            if report_path.as_os_str().is_empty() {
                return Err(anyhow!("report_path must be non-empty when set"));
            }
        }
        Ok(())
    }

    /// File name for checkpoint `id` (no validation of `id`).
    pub fn checkpoint_file_name(&self, id: &str) -> String {
        format!("{}{}.{}", self.file_prefix, id, self.file_extension)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
