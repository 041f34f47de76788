/// Waiting for secondary replicas after a commit.
use std::time::{Duration, SystemTime};

use thiserror::Error;

/// Replicas did not catch up within the timeout.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Timed out after {timeout:?} waiting for replication")]
pub struct ReplicationWaitTimeout {
    pub timeout: Duration,
}

/// Blocks until replicas have applied writes made since `if_writes_since`.
pub trait ReplicationWaiter {
    /// # Errors
    ///
    /// Returns [`ReplicationWaitTimeout`] if replicas are still behind after
    /// `timeout`.
    fn wait_for_replication(
        &mut self,
        timeout: Duration,
        if_writes_since: Option<SystemTime>,
    ) -> Result<(), ReplicationWaitTimeout>;
}

/// A single-node setup: there is never anything to wait for.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReplication;

impl ReplicationWaiter for NoReplication {
    fn wait_for_replication(
        &mut self,
        _timeout: Duration,
        _if_writes_since: Option<SystemTime>,
    ) -> Result<(), ReplicationWaitTimeout> {
        Ok(())
    }
}
