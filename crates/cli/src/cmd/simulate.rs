//! Simulate command
//!
//! Fires a burst of triggers for one task type through an in-process worker
//! and reports how many invocations ran and how many were superseded.

use crate::util;
use anyhow::{Context, Result};
use lull_core::{
    Clock, Coordinator, CoordinatorRegistry, DebounceConfig, KeySpec, MemoryTicketStore,
    SystemClock, TicketStore,
};
use lull_worker::{handler_fn, DebounceInterceptor, LocalScheduler, Pipeline, Worker};
use owo_colors::OwoColorize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Options for `lull simulate`
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub task: String,
    pub triggers: usize,
    pub interval_ms: u64,
    pub key: Option<String>,
    pub key_args: Vec<usize>,
    pub delay_secs: Option<u64>,
    pub args: Vec<String>,
}

impl SimulateOptions {
    /// Literal key, else the chosen argument positions, else every argument
    ///
    /// Positions refer to the user's arguments only; the revision argument
    /// appended to each trigger cannot be part of the key.
    fn key_spec(&self, arg_count: usize) -> Result<KeySpec> {
        if let Some(key) = &self.key {
            return Ok(KeySpec::literal(key.clone()));
        }

        if let Some(&index) = self.key_args.iter().find(|&&index| index >= arg_count) {
            anyhow::bail!(
                "--key-args index {} is out of range: {} argument(s) given",
                index,
                arg_count
            );
        }

        Ok(if !self.key_args.is_empty() {
            KeySpec::indices(self.key_args.iter().copied())
        } else if arg_count > 0 {
            KeySpec::indices(0..arg_count)
        } else {
            KeySpec::literal("default")
        })
    }
}

pub async fn run(config: Option<&Path>, options: SimulateOptions) -> Result<()> {
    let settings = util::load_settings(config)?;

    let base_args: Vec<Value> = options.args.iter().map(|raw| util::parse_arg(raw)).collect();
    let spec = options.key_spec(base_args.len())?;

    let debounce = match (options.delay_secs, settings.tasks.get(&options.task)) {
        (Some(delay), Some(task)) => DebounceConfig::new(Duration::from_secs(delay))
            .with_delay_buffer(Duration::from_secs(task.delay_buffer_secs)),
        (Some(delay), None) => DebounceConfig::new(Duration::from_secs(delay)),
        (None, Some(task)) => task.debounce_config(),
        (None, None) => anyhow::bail!(
            "Task type '{}' is not configured (add [tasks.{}] to settings or pass --delay-secs)",
            options.task,
            options.task
        ),
    };

    let store: Arc<dyn TicketStore> = match &settings.store.path {
        Some(path) => Arc::new(
            lull_core::SledTicketStore::open(path)
                .with_context(|| format!("Failed to open ticket database {}", path.display()))?,
        ),
        None => Arc::new(MemoryTicketStore::new()),
    };

    let (scheduler, rx) = LocalScheduler::new(lull_worker::DEFAULT_QUEUE_CAPACITY);
    let scheduler = Arc::new(scheduler);

    let mut registry = CoordinatorRegistry::new();
    let coordinator = registry
        .register(Coordinator::new(
            options.task.clone(),
            debounce,
            store,
            scheduler.clone(),
        )?)
        .context("Failed to register coordinator")?;
    let registry = Arc::new(registry);

    let task_name = options.task.clone();
    let pipeline = Pipeline::builder()
        .handler(handler_fn(options.task.clone(), move |args: Vec<Value>| {
            let task_name = task_name.clone();
            async move {
                println!(
                    "{} {} ran with {}",
                    "▶".green(),
                    task_name.bold(),
                    Value::Array(args.clone())
                );
                Ok(json!({ "args": args }))
            }
        }))
        .interceptor(DebounceInterceptor::new(registry))
        .build();
    let handle = Worker::new(Arc::new(pipeline), rx).spawn();

    println!(
        "{} {} trigger(s) for {} (delay {}s + buffer {}s)\n",
        "Simulating".bold(),
        options.triggers,
        options.task.cyan(),
        debounce.delay.as_secs(),
        debounce.delay_buffer.as_secs()
    );

    for trigger in 1..=options.triggers {
        let mut args = base_args.clone();
        args.push(json!({ "revision": trigger }));

        let receipt = coordinator.schedule(args, &spec).await?;
        println!(
            "  {} #{} key={} id={} fires {}",
            "•".dimmed(),
            trigger,
            receipt.key.as_str().yellow(),
            util::short_id(receipt.id.as_str()).dimmed(),
            util::format_relative_secs(receipt.fire_at, SystemClock.now_secs())
        );

        if options.interval_ms > 0 && trigger < options.triggers {
            tokio::time::sleep(Duration::from_millis(options.interval_ms)).await;
        }
    }

    println!("\n{}", "Waiting for the quiet period to elapse...".dimmed());
    scheduler.wait_idle(Duration::from_millis(100)).await;
    let report = handle.shutdown().await;

    println!("\n{}", "Result".bold());
    println!("  {}: {}", "Executed".green(), report.executed);
    println!("  {}: {}", "Skipped".yellow(), report.skipped);
    if report.failed > 0 {
        println!("  {}: {}", "Failed".red(), report.failed);
    } else {
        println!("  {}: {}", "Failed".dimmed(), report.failed);
    }

    Ok(())
}
