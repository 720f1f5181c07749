//! Persistent ticket store on sled

use super::TicketStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;

/// Ticket store backed by an embedded sled database
///
/// Each mutation is flushed before returning so a ticket written by
/// `schedule` survives a process restart before its invocation fires.
#[derive(Debug, Clone)]
pub struct SledTicketStore {
    db: Db,
}

impl SledTicketStore {
    /// Open or create a ticket database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| Error::store_with(format!("failed to open {}", path.display()), e))?;
        Ok(Self { db })
    }

    /// All tickets, in key order
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            entries.push((decode(&key)?, decode(&value)?));
        }
        Ok(entries)
    }

    /// Number of tickets currently stored
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

fn decode(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::store_with("ticket store holds non-UTF-8 data", e))
}

#[async_trait]
impl TicketStore for SledTicketStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.db.remove(key.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}
