//! Disk-backed table store.
//!
//! Tables are immutable once written: every `write` mints a fresh UUID
//! handle, so snapshots and working copies never alias each other. A
//! `.meta.json` sidecar per blob carries creation time and shape, which is
//! what the age-based cleanup walks.
//!
//! Layout:
//!   {base_path}/{handle}.json        — the table itself
//!   {base_path}/{handle}.meta.json   — creation time, shape, size

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::table::Table;

/// Storage capability consumed by the orchestrator: fresh immutable handle
/// on write, table back on read.
pub trait TableStore: Send + Sync {
    fn write(&self, table: &Table) -> Result<String>;
    fn read(&self, handle: &str) -> Result<Table>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub handle: String,
    pub created_at: DateTime<Utc>,
    pub rows: usize,
    pub columns: usize,
    pub size_bytes: u64,
}

pub struct DiskStore {
    base_path: PathBuf,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;
        info!("Table store opened at {}", path.display());
        Ok(Self {
            base_path: path.to_path_buf(),
        })
    }

    fn data_path(&self, handle: &str) -> PathBuf {
        self.base_path.join(format!("{handle}.json"))
    }

    fn meta_path(&self, handle: &str) -> PathBuf {
        self.base_path.join(format!("{handle}.meta.json"))
    }

    pub fn metadata(&self, handle: &str) -> Option<BlobMetadata> {
        let content = fs::read_to_string(self.meta_path(handle)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Removes a blob and its sidecar. Returns whether anything existed.
    pub fn delete(&self, handle: &str) -> bool {
        let data = fs::remove_file(self.data_path(handle)).is_ok();
        let meta = fs::remove_file(self.meta_path(handle)).is_ok();
        data || meta
    }

    pub fn list_handles(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.base_path) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let handle = name.strip_suffix(".meta.json")?;
                Some(handle.to_string())
            })
            .collect()
    }

    /// Deletes blobs older than `max_age_hours`. Returns how many were
    /// removed. Sidecars that fail to parse are skipped, not deleted.
    pub fn cleanup_old(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut cleaned = 0;
        for handle in self.list_handles() {
            let Some(meta) = self.metadata(&handle) else {
                continue;
            };
            if meta.created_at < cutoff && self.delete(&handle) {
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            info!("Store cleanup removed {cleaned} stale tables");
        }
        cleaned
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.list_handles()
            .iter()
            .filter_map(|h| self.metadata(h))
            .map(|m| m.size_bytes)
            .sum()
    }
}

impl TableStore for DiskStore {
    fn write(&self, table: &Table) -> Result<String> {
        let handle = Uuid::new_v4().to_string();
        let data_path = self.data_path(&handle);

        let blob = serde_json::to_vec(table)?;
        fs::write(&data_path, &blob)?;

        let metadata = BlobMetadata {
            handle: handle.clone(),
            created_at: Utc::now(),
            rows: table.n_rows(),
            columns: table.n_cols(),
            size_bytes: blob.len() as u64,
        };
        fs::write(
            self.meta_path(&handle),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        debug!(
            "Stored table {handle} ({} rows, {} cols, {} bytes)",
            metadata.rows, metadata.columns, metadata.size_bytes
        );
        Ok(handle)
    }

    fn read(&self, handle: &str) -> Result<Table> {
        let path = self.data_path(handle);
        if !path.exists() {
            bail!("no table found for handle {handle}");
        }
        let content = fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }
}
