use crate::error::StoreError;
use crate::models::report::AnalysisReport;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Holds the most recent [`AnalysisReport`] in memory and mirrors it to a
/// JSON file so it survives restarts. Saves replace the file atomically, so
/// readers see either the previous report or the new one.
#[derive(Debug)]
pub struct ReportStore {
    path: PathBuf,
    latest: RwLock<Option<AnalysisReport>>,
}

impl ReportStore {
    /// Open the store, loading a report persisted by an earlier run.
    pub fn open(path: impl Into<PathBuf>) -> Result<ReportStore, StoreError> {
        let path = path.into();
        let latest = read_report(&path)?;
        if let Some(report) = &latest {
            info!(
                "Loaded report {} ({}) from {}",
                report.id,
                report.generated_at.to_rfc3339(),
                path.display()
            );
        }
        Ok(ReportStore {
            path,
            latest: RwLock::new(latest),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, report: &AnalysisReport) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(report)?;
        // Serialize writers so the file and the slot move together.
        let mut slot = self.latest.write().map_err(|_| StoreError::Poisoned)?;
        write_atomic(&self.path, raw.as_bytes())?;
        *slot = Some(report.clone());
        info!("Saved report {} to {}", report.id, self.path.display());
        Ok(())
    }

    pub fn load_latest(&self) -> Result<Option<AnalysisReport>, StoreError> {
        let slot = self.latest.read().map_err(|_| StoreError::Poisoned)?;
        Ok(slot.clone())
    }
}

fn read_report(path: &Path) -> Result<Option<AnalysisReport>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            source,
            path: path.to_path_buf(),
        })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        source,
        path: path.to_path_buf(),
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(io_err)?;
    if let Err(source) = fs::rename(&tmp, path) {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("Could not remove {}: {e}", tmp.display());
        }
        return Err(io_err(source));
    }
    Ok(())
}
