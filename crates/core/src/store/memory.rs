//! In-memory ticket store
//!
//! Single-process only. Every command is appended to an operation log so tests
//! can assert exactly which reads and writes the protocol performed. The store
//! can be switched offline to simulate an unreachable backend, or made to
//! reject only deletes.

use super::TicketStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A command observed by [`MemoryTicketStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Get { key: String },
    Del { key: String },
}

impl StoreOp {
    /// True for `SET` and `DEL`
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreOp::Get { .. })
    }
}

/// DashMap-backed ticket store for tests and single-process use
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    entries: DashMap<String, String>,
    ops: Mutex<Vec<StoreOp>>,
    offline: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all tickets, sorted by key
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Current ticket for a key without recording an operation
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// All operations performed so far
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().clone()
    }

    /// Only the `SET`/`DEL` operations performed so far
    pub fn mutations(&self) -> Vec<StoreOp> {
        self.ops.lock().iter().filter(|op| op.is_mutation()).cloned().collect()
    }

    /// Forget the recorded operation log
    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    /// Make every subsequent command fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every subsequent `DEL` fail while reads and writes still work
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::store("memory store is offline"));
        }
        Ok(())
    }

    fn record(&self, op: StoreOp) {
        self.ops.lock().push(op);
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_online()?;
        self.record(StoreOp::Set {
            key: key.to_string(),
            value: value.to_string(),
        });
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_online()?;
        self.record(StoreOp::Get {
            key: key.to_string(),
        });
        Ok(self.peek(key))
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.check_online()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::store(format!("delete of {} rejected", key)));
        }
        self.record(StoreOp::Del {
            key: key.to_string(),
        });
        self.entries.remove(key);
        Ok(())
    }
}
