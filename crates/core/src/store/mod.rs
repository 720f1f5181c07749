//! Ticket store abstraction
//!
//! The store holds one ticket per debounce key: the id of the scheduled
//! execution that currently has authority to run. Only three commands are
//! needed, each assumed atomic on its own:
//!
//! | Command       | Semantics                          |
//! |---------------|------------------------------------|
//! | `SET k v`     | unconditional upsert               |
//! | `GET k`       | value or absent                    |
//! | `DEL k`       | remove if present, no error if not |
//!
//! No compare-and-delete is assumed across `GET` + `DEL`.

pub mod memory;
pub mod sled_store;

pub use memory::{MemoryTicketStore, StoreOp};
pub use sled_store::SledTicketStore;

use crate::error::Result;
use async_trait::async_trait;

/// Shared key-value store holding debounce tickets
///
/// Must be reachable from every execution context that admits work.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Upsert `key → value`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value stored at `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`; absent keys are not an error
    async fn del(&self, key: &str) -> Result<()>;
}
