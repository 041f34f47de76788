/// In-process datastore with snapshot rollback.
use std::collections::BTreeMap;

use log::debug;

use super::{Datastore, InsertMode, Row, StoreError, matches};

pub(crate) type Tables = BTreeMap<String, Vec<Row>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    snapshot: Option<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_tables(tables: Tables) -> Self {
        Self {
            tables,
            snapshot: None,
        }
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.tables
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }
}

impl Datastore for MemoryStore {
    fn begin(&mut self, fname: &str) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::NestedTransaction(fname.to_owned()));
        }
        debug!(fname; "begin transaction");
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self, fname: &str) -> Result<(), StoreError> {
        if self.snapshot.take().is_none() {
            return Err(StoreError::NoTransaction(fname.to_owned()));
        }
        debug!(fname; "commit transaction");
        Ok(())
    }

    fn rollback(&mut self, fname: &str) -> Result<(), StoreError> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::NoTransaction(fname.to_owned()))?;
        debug!(fname; "rollback transaction");
        self.tables = snapshot;
        Ok(())
    }

    fn select(&self, table: &str, conds: &Row) -> Result<Vec<Row>, StoreError> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, conds)).cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&mut self, table: &str, row: Row, mode: InsertMode) -> Result<usize, StoreError> {
        let rows = self.tables.entry(table.to_owned()).or_default();
        if rows.contains(&row) {
            return match mode {
                InsertMode::Ignore => Ok(0),
                InsertMode::Strict => Err(StoreError::Duplicate(table.to_owned())),
            };
        }
        rows.push(row);
        Ok(1)
    }

    fn delete(&mut self, table: &str, conds: &Row) -> Result<usize, StoreError> {
        let Some(rows) = self.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !matches(r, conds));
        Ok(before - rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::row;

    #[test]
    fn test_insert_select_delete() {
        let mut s = MemoryStore::new();
        assert_eq!(s.insert("t", row([("k", "a")]), InsertMode::Strict).unwrap(), 1);
        assert_eq!(s.insert("t", row([("k", "b")]), InsertMode::Strict).unwrap(), 1);
        assert_eq!(s.select("t", &Row::new()).unwrap().len(), 2);
        assert!(s.select_row("t", &row([("k", "b")])).unwrap().is_some());
        assert_eq!(s.delete("t", &row([("k", "a")])).unwrap(), 1);
        assert_eq!(s.select("t", &Row::new()).unwrap().len(), 1);
        assert!(s.select("missing", &Row::new()).unwrap().is_empty());
    }

    #[test]
    fn test_insert_modes() {
        let mut s = MemoryStore::new();
        s.insert("t", row([("k", "a")]), InsertMode::Strict).unwrap();
        assert_eq!(s.insert("t", row([("k", "a")]), InsertMode::Ignore).unwrap(), 0);
        assert!(matches!(
            s.insert("t", row([("k", "a")]), InsertMode::Strict),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let mut s = MemoryStore::new();
        s.insert("t", row([("k", "keep")]), InsertMode::Strict).unwrap();
        s.begin("test").unwrap();
        s.insert("t", row([("k", "drop")]), InsertMode::Strict).unwrap();
        s.rollback("test").unwrap();
        assert_eq!(s.select("t", &Row::new()).unwrap(), [row([("k", "keep")])]);
    }

    #[test]
    fn test_transaction_misuse() {
        let mut s = MemoryStore::new();
        assert!(matches!(s.commit("x"), Err(StoreError::NoTransaction(_))));
        s.begin("x").unwrap();
        assert!(matches!(s.begin("x"), Err(StoreError::NestedTransaction(_))));
        s.commit("x").unwrap();
        assert!(!s.in_transaction());
    }
}
