//! Snapshot persistence for file-backed tables

use super::{Store, StoreStats, Table, TableSchema};
use crate::core::{DbError, EntityId, Fields, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{Level, event};

const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Table Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub version: u32,
    pub table: Table,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub row_count: usize,
}

impl TableSnapshot {
    pub fn new(table: Table) -> Self {
        let row_count = table.row_count();
        Self {
            version: SNAPSHOT_VERSION,
            table,
            metadata: SnapshotMetadata {
                created_at: Utc::now(),
                row_count,
            },
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Checkpoint after every row write.
    #[default]
    Sync,
    /// Checkpoint only when asked to.
    None,
}

impl std::str::FromStr for DurabilityMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "none" | "manual" => Ok(Self::None),
            other => Err(DbError::Config(format!(
                "durability must be one of: sync, none (got '{}')",
                other
            ))),
        }
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Writes the snapshot to a temp file in the same directory and renames it into place.
    pub fn save(&self, snapshot: &TableSnapshot) -> Result<()> {
        let parent = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| {
            DbError::IoError(format!("Failed to create snapshot directory: {}", e))
        })?;

        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| DbError::Serialization(format!("Failed to serialize snapshot: {}", e)))?;

        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|e| DbError::IoError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| DbError::IoError(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| DbError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| DbError::IoError(format!("Failed to rename snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<TableSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.snapshot_path)
            .map_err(|e| DbError::IoError(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: TableSnapshot = rmp_serde::from_slice(&data).map_err(|e| {
            DbError::Serialization(format!("Failed to deserialize snapshot: {}", e))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DbError::Serialization(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    pub fn delete(&self) -> Result<()> {
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)
                .map_err(|e| DbError::IoError(format!("Failed to delete snapshot: {}", e)))?;
        }
        Ok(())
    }
}

// ============================================================================
// File Store
// ============================================================================

/// A table kept in memory and checkpointed to `<data_dir>/<table>.snapshot`.
pub struct FileStore {
    table: Table,
    snapshots: SnapshotManager,
    durability_mode: DurabilityMode,
}

impl FileStore {
    /// Opens the table's snapshot under `data_dir`, or starts empty if there is none.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        schema: TableSchema,
        durability_mode: DurabilityMode,
    ) -> Result<Self> {
        let snapshot_path = data_dir
            .as_ref()
            .join(format!("{}.snapshot", schema.name()));
        let snapshots = SnapshotManager::new(snapshot_path);

        let table = match snapshots.load()? {
            Some(snapshot) => {
                if snapshot.table.name() != schema.name() {
                    return Err(DbError::Serialization(format!(
                        "Snapshot at {} holds table '{}', expected '{}'",
                        snapshots.path().display(),
                        snapshot.table.name(),
                        schema.name()
                    )));
                }
                event!(
                    Level::DEBUG,
                    table = %schema.name(),
                    rows = snapshot.metadata.row_count,
                    "table snapshot loaded"
                );
                snapshot.table
            }
            None => Table::new(schema),
        };

        Ok(Self {
            table,
            snapshots,
            durability_mode,
        })
    }

    pub fn checkpoint(&self) -> Result<()> {
        self.snapshots.save(&TableSnapshot::new(self.table.clone()))
    }

    pub fn snapshot_path(&self) -> &Path {
        self.snapshots.path()
    }

    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }

    pub fn stats(&self) -> StoreStats {
        self.table.stats()
    }

    /// Applies `op` to the table. In `Sync` mode the change is made on a copy
    /// and only kept once its snapshot is on disk, so a failed checkpoint
    /// leaves the table as it was.
    fn write<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Table) -> Result<()>,
    {
        match self.durability_mode {
            DurabilityMode::None => op(&mut self.table),
            DurabilityMode::Sync => {
                let mut staged = self.table.clone();
                op(&mut staged)?;
                let snapshot = TableSnapshot::new(staged);
                self.snapshots.save(&snapshot)?;
                self.table = snapshot.table;
                Ok(())
            }
        }
    }
}

impl Store for FileStore {
    fn next_id(&mut self) -> Result<EntityId> {
        Ok(self.table.next_id())
    }

    fn insert(&mut self, id: EntityId, fields: Fields) -> Result<()> {
        self.write(|table| table.insert(id, fields))
    }

    fn update(&mut self, id: EntityId, fields: Fields) -> Result<()> {
        self.write(|table| table.update(id, fields))
    }

    fn delete(&mut self, id: EntityId) -> Result<()> {
        self.write(|table| table.delete(id))
    }

    fn find(&self, id: EntityId) -> Result<Option<Fields>> {
        Ok(self.table.get(id).cloned())
    }

    fn read_all(&self) -> Result<Vec<(EntityId, Fields)>> {
        Ok(self.table.scan())
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.table.row_count())
    }
}
