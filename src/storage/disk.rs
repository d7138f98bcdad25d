use crate::models::JobPosting;
use super::base::StorageError;
use chrono::Utc;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `postings` to `path` as a pretty-printed JSON array, creating
/// parent directories as needed.
pub fn export_json<P: AsRef<Path>>(path: P, postings: &[JobPosting]) -> Result<(), StorageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(postings)?)?;
    info!("Exported {} posting(s) to {}", postings.len(), path.display());
    Ok(())
}

/// Timestamped JSON exports under one directory.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    base_path: PathBuf,
}

impl JsonExporter {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Writes `<label>_<YYYYmmdd_HHMMSS>.json` and returns its path.
    pub fn export(&self, label: &str, postings: &[JobPosting]) -> Result<PathBuf, StorageError> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let label: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = self.base_path.join(format!("{}_{}.json", label, timestamp));
        export_json(&path, postings)?;
        Ok(path)
    }
}
