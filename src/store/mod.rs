/// Datastore collaborators consumed by the lifecycle.
///
/// Scripts see the datastore through the narrow [`Datastore`] trait: begin,
/// commit, rollback, and a generic row surface. The lifecycle itself only
/// touches the completion log used by logged jobs.
use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

pub mod json_file;
pub mod memory;
pub mod replication;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use replication::{NoReplication, ReplicationWaitTimeout, ReplicationWaiter};

/// A row: column name to value.
pub type Row = BTreeMap<String, String>;

/// Build a row from literal pairs.
#[must_use]
pub fn row<const N: usize>(pairs: [(&str, &str); N]) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// How `insert` treats an identical existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Fail with [`StoreError::Duplicate`].
    Strict,
    /// Succeed without inserting.
    Ignore,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No datastore is configured")]
    Unavailable,

    #[error("Datastore I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Datastore file is corrupt: {0}")]
    Corrupt(String),

    #[error("Duplicate row in table '{0}'")]
    Duplicate(String),

    #[error("{0}: no transaction is open")]
    NoTransaction(String),

    #[error("{0}: a transaction is already open")]
    NestedTransaction(String),

    /// The backend refused the write.
    #[error("Write to table '{table}' rejected: {reason}")]
    Rejected { table: String, reason: String },
}

/// A handle to the application's datastore.
///
/// `fname` arguments name the calling operation for diagnostics.
pub trait Datastore {
    /// # Errors
    ///
    /// Backend-specific; nested transactions are refused.
    fn begin(&mut self, fname: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Backend-specific; committing without an open transaction fails.
    fn commit(&mut self, fname: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Backend-specific; rolling back without an open transaction fails.
    fn rollback(&mut self, fname: &str) -> Result<(), StoreError>;

    /// Rows of `table` whose columns equal every entry of `conds`.
    ///
    /// # Errors
    ///
    /// Backend-specific read failures.
    fn select(&self, table: &str, conds: &Row) -> Result<Vec<Row>, StoreError>;

    /// First matching row, if any.
    ///
    /// # Errors
    ///
    /// Backend-specific read failures.
    fn select_row(&self, table: &str, conds: &Row) -> Result<Option<Row>, StoreError> {
        Ok(self.select(table, conds)?.into_iter().next())
    }

    /// Insert `row`; returns the number of rows written.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] in strict mode, or backend write failures.
    fn insert(&mut self, table: &str, row: Row, mode: InsertMode) -> Result<usize, StoreError>;

    /// Delete matching rows; returns how many were removed.
    ///
    /// # Errors
    ///
    /// Backend write failures.
    fn delete(&mut self, table: &str, conds: &Row) -> Result<usize, StoreError>;
}

fn matches(row: &Row, conds: &Row) -> bool {
    conds.iter().all(|(k, v)| row.get(k) == Some(v))
}
