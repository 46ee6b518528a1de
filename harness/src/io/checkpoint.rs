//! Checkpoint ids, paths and loading.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::protocol::LineCursor;
use crate::error::HarnessError;
use crate::io::config::HarnessConfig;

/// Resolve the file for checkpoint `id`, rejecting ids that would escape
/// `checkpoint_dir`.
pub fn checkpoint_path(config: &HarnessConfig, id: &str) -> Result<PathBuf, HarnessError> {
    validate_checkpoint_id(id)?;
    Ok(config.checkpoint_dir.join(config.checkpoint_file_name(id)))
}

/// Read a checkpoint file into a cursor over its lines.
///
/// A missing file is [`HarnessError::CheckpointNotFound`]; any other read
/// failure (permissions, invalid UTF-8) is [`HarnessError::CheckpointUnreadable`].
pub fn load_checkpoint(path: &Path) -> Result<LineCursor, HarnessError> {
    let contents = fs::read_to_string(path).map_err(|source| {
        let path = path.to_path_buf();
        if source.kind() == ErrorKind::NotFound {
            HarnessError::CheckpointNotFound { path, source }
        } else {
            HarnessError::CheckpointUnreadable { path, source }
        }
    })?;
    let cursor = LineCursor::from_text(&contents);
    debug!(path = %path.display(), lines = cursor.remaining(), "checkpoint loaded");
    Ok(cursor)
}

/// Absolute form of `path` for diagnostics, falling back to `path` itself.
pub fn display_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn validate_checkpoint_id(id: &str) -> Result<(), HarnessError> {
    let invalid = |reason| HarnessError::InvalidCheckpointId {
        id: id.to_string(),
        reason,
    };
    if id.trim().is_empty() {
        return Err(invalid("must be non-empty"));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }
    if id.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    Ok(())
}
