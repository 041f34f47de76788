/// A datastore persisted as one JSON document.
///
/// Writes outside a transaction are saved immediately; writes inside one are
/// saved on commit.
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::memory::{MemoryStore, Tables};
use super::{Datastore, InsertMode, Row, StoreError};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file exists but cannot be read
    /// - [`StoreError::Corrupt`] if it is not a valid store document
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables: Tables = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt(e.to_string()))?
        } else {
            debug!(path = path.display().to_string(); "Store file not found, starting empty");
            Tables::new()
        };
        info!(path = path.display().to_string(); "Opened JSON datastore");
        Ok(Self {
            path,
            inner: MemoryStore::from_tables(tables),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self.inner.tables())
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn autosave(&self) -> Result<(), StoreError> {
        if self.inner.in_transaction() {
            return Ok(());
        }
        self.save()
    }
}

impl Datastore for JsonFileStore {
    fn begin(&mut self, fname: &str) -> Result<(), StoreError> {
        self.inner.begin(fname)
    }

    fn commit(&mut self, fname: &str) -> Result<(), StoreError> {
        self.inner.commit(fname)?;
        self.save()
    }

    fn rollback(&mut self, fname: &str) -> Result<(), StoreError> {
        self.inner.rollback(fname)
    }

    fn select(&self, table: &str, conds: &Row) -> Result<Vec<Row>, StoreError> {
        self.inner.select(table, conds)
    }

    fn insert(&mut self, table: &str, row: Row, mode: InsertMode) -> Result<usize, StoreError> {
        let written = self.inner.insert(table, row, mode)?;
        if written > 0 {
            self.autosave()?;
        }
        Ok(written)
    }

    fn delete(&mut self, table: &str, conds: &Row) -> Result<usize, StoreError> {
        let removed = self.inner.delete(table, conds)?;
        if removed > 0 {
            self.autosave()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::store::row;

    #[test]
    fn test_autocommit_writes_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/store.json");
        {
            let mut s = JsonFileStore::open(&path).unwrap();
            s.insert("update_log", row([("ul_key", "k1")]), InsertMode::Ignore)
                .unwrap();
        }
        let s = JsonFileStore::open(&path).unwrap();
        assert!(s
            .select_row("update_log", &row([("ul_key", "k1")]))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_transaction_saved_on_commit_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut s = JsonFileStore::open(&path).unwrap();
        s.begin("test").unwrap();
        s.insert("t", row([("a", "1")]), InsertMode::Strict).unwrap();
        assert!(!path.exists());
        s.commit("test").unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.select("t", &Row::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }
}
