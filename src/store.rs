use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::ColorMap;
use crate::data::model::Table;
use crate::error::StoreError;

/// Everything needed to show a dataset again in a later session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub table: Table,
    #[serde(default)]
    pub color_map: ColorMap,
    pub source_filename: String,
    pub saved_at: DateTime<Utc>,
}

/// One JSON snapshot file per dataset key, fully rewritten on every save.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot for a dataset key.
    pub fn snapshot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("data_{key}.json"))
    }

    /// Replace the snapshot for `key`, creating the directory if needed.
    pub fn save(&self, key: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.snapshot_path(key);
        let content = serde_json::to_string(snapshot)?;
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(&path, content))
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        log::info!(
            "Saved snapshot '{key}' ({} rows) to {}",
            snapshot.table.len(),
            path.display()
        );
        Ok(())
    }

    /// The saved snapshot for `key`. Missing or unreadable snapshots count
    /// as "nothing saved".
    pub fn load(&self, key: &str) -> Option<Snapshot> {
        let path = self.snapshot_path(key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Cannot read snapshot {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str::<Snapshot>(&text) {
            Ok(mut snapshot) => {
                snapshot.table.rebuild_index();
                Some(snapshot)
            }
            Err(e) => {
                log::warn!("Discarding corrupt snapshot {}: {e}", path.display());
                None
            }
        }
    }

    /// Forget the snapshot for `key`; a missing file is not an error.
    pub fn clear(&self, key: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.snapshot_path(key)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
