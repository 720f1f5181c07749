//! Settings command
//!
//! Shows the parsed settings, where they live, and an example file.

use crate::util;
use anyhow::{Context, Result};
use lull_core::Settings;
use owo_colors::OwoColorize;
use std::path::Path;

/// List parsed settings
pub async fn run_list(config: Option<&Path>) -> Result<()> {
    let path = util::settings_path(config)?;
    let settings = util::load_settings(config)?;

    println!("{}", "Debounce Settings".bold());
    if path.exists() {
        println!("{}: {}\n", "Location".dimmed(), path.display().dimmed());
    } else {
        println!(
            "{}: {} {}\n",
            "Location".dimmed(),
            path.display().dimmed(),
            "(not found, using defaults)".yellow()
        );
    }

    println!("{}", "[store]".yellow());
    match &settings.store.path {
        Some(db) => println!("  {} = {}", "path".cyan(), db.display()),
        None => println!("  {} = {}", "path".cyan(), "(in-memory)".dimmed()),
    }

    if settings.tasks.is_empty() {
        println!("\n{}", "No task types configured".dimmed());
    }

    for (name, task) in &settings.tasks {
        println!("\n{}", format!("[tasks.{}]", name).yellow());
        println!(
            "  {} = {}",
            "delay_secs".cyan(),
            task.delay_secs
        );
        println!(
            "  {} = {} {}",
            "delay_buffer_secs".cyan(),
            task.delay_buffer_secs,
            format!(
                "(fires {}s after the last trigger)",
                task.debounce_config().fire_offset_secs()
            )
            .dimmed()
        );
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  delay_secs: 0-{}", lull_core::settings::MAX_DELAY_SECS);
    println!("  delay_buffer_secs: 0-{}", lull_core::settings::MAX_DELAY_SECS);
    println!("  task names: non-empty, no ':'");

    Ok(())
}

/// Show the settings file path and optionally create it
pub async fn run_path(config: Option<&Path>, create: bool) -> Result<()> {
    let path = util::settings_path(config)?;

    if create && !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        std::fs::write(&path, Settings::example())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Created settings file at: {}", "✓".green(), path.display());
    } else if path.exists() {
        println!("{}", path.display());
    } else {
        println!("{}", path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example settings
pub async fn run_example() -> Result<()> {
    println!("{}", Settings::example());
    Ok(())
}
