//! JSON run reports.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::scoring::RunReport;

/// Write `report` as pretty JSON with a trailing newline.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
    }
    let contents = serde_json::to_string_pretty(report).context("serialize run report")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
