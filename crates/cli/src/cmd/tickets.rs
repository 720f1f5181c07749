//! Inspect and clear debounce tickets

use crate::util;
use anyhow::{Context, Result};
use lull_core::{DebounceKey, TicketStore};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// List every ticket in the store
pub async fn run_list(config: Option<&Path>, db: Option<PathBuf>) -> Result<()> {
    let store = util::open_ticket_db(config, db)?;
    let entries = store.entries().context("Failed to read tickets")?;

    if entries.is_empty() {
        println!("{}", "No pending tickets".dimmed());
        return Ok(());
    }

    println!("{}", "Pending Tickets".bold());
    for (key, id) in &entries {
        println!("  {} → {}", key.cyan(), id.yellow());
    }
    println!("\n{} ticket(s)", entries.len());

    Ok(())
}

/// Show the ticket held for one key
pub async fn run_show(config: Option<&Path>, db: Option<PathBuf>, key: &str) -> Result<()> {
    let store = util::open_ticket_db(config, db)?;

    match store.get(key).await.context("Failed to read ticket")? {
        Some(id) => println!("{} → {}", key.cyan(), id.yellow()),
        None => println!("{} {}", key.cyan(), "(no ticket)".dimmed()),
    }

    Ok(())
}

/// Remove the ticket for one key
pub async fn run_clear(config: Option<&Path>, db: Option<PathBuf>, key: &str) -> Result<()> {
    let store = util::open_ticket_db(config, db)?;

    DebounceKey::parse(key)
        .with_context(|| format!("Key '{}' is not of the form <TaskType>:<key>", key))?;

    let previous = store.get(key).await.context("Failed to read ticket")?;
    store.del(key).await.context("Failed to remove ticket")?;

    match previous {
        Some(id) => println!(
            "{} Cleared {} (was {}); its pending invocation will be skipped",
            "✓".green(),
            key.cyan(),
            id.yellow()
        ),
        None => println!("{} {}", key.cyan(), "(no ticket)".dimmed()),
    }

    Ok(())
}
