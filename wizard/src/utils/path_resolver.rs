use anyhow::Result;
use std::path::{Path, PathBuf};

pub const LOG_FOLDER_NAME: &str = "wizard-logs";

/// Resolve log folder (absolute path)
///
/// Order:
/// - an explicitly configured folder (created if missing)
/// - an existing `wizard-logs/` in the current directory or one of its ancestors
/// - the per-user data directory (`<data_local_dir>/analytics-wizard/logs`)
/// - `./wizard-logs`
pub fn resolve_log_folder(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
        return Ok(dir.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(found) = find_existing_log_folder(&cwd) {
            return Ok(found);
        }
    }

    let base = dirs::data_local_dir()
        .map(|d| d.join("analytics-wizard").join("logs"))
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(LOG_FOLDER_NAME)
        });
    std::fs::create_dir_all(&base)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
    Ok(base)
}

/// Walk up from `start` looking for an existing log folder.
fn find_existing_log_folder(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    for _ in 0..12 {
        let candidate = dir.join(LOG_FOLDER_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
    None
}
