//! Helpers for running the `lull` binary
//!
//! Every command runs with `--config` pointing into its own temp directory so
//! tests never read the user's settings.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// `lull` invocation bound to a settings file
pub struct LullCommand {
    config: PathBuf,
    args: Vec<String>,
}

impl LullCommand {
    pub fn new(config: impl AsRef<Path>) -> Self {
        Self {
            config: config.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Run to completion and capture output
    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_lull"))
            .arg("--config")
            .arg(&self.config)
            .args(&self.args)
            .env("RUST_LOG", "warn")
            .output()
            .with_context(|| format!("Failed to run lull {:?}", self.args))?;

        Ok(CommandResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Captured result of one `lull` run
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Assert the command exited successfully
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "command failed\nstdout:\n{}\nstderr:\n{}",
            self.stdout, self.stderr
        );
        self
    }

    /// Assert the command exited with an error
    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "command unexpectedly succeeded:\n{}", self.stdout);
        self
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stdout.contains(needle),
            "stdout does not contain {:?}:\n{}",
            needle,
            self.stdout
        );
        self
    }
}
