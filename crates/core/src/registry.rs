//! Registry of coordinators keyed by task type
//!
//! Built once at start-up and shared by reference with the execution
//! interceptor. There is no global lookup.

use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::scheduler::TaskScheduler;
use crate::settings::Settings;
use crate::store::TicketStore;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct CoordinatorRegistry {
    coordinators: HashMap<String, Arc<Coordinator>>,
}

impl CoordinatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One coordinator per `[tasks.*]` entry, all sharing `store` and `scheduler`
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn TicketStore>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Result<Self> {
        settings.validate()?;

        let mut registry = Self::new();
        for (name, task) in &settings.tasks {
            let coordinator = Coordinator::new(
                name.clone(),
                task.debounce_config(),
                store.clone(),
                scheduler.clone(),
            )?;
            registry.register(coordinator)?;
        }
        Ok(registry)
    }

    /// Add a coordinator; each task type may be registered once
    pub fn register(&mut self, coordinator: Coordinator) -> Result<Arc<Coordinator>> {
        let task_type = coordinator.task_type().to_string();
        if self.coordinators.contains_key(&task_type) {
            return Err(Error::InvalidTaskType {
                name: task_type,
                reason: "already registered".to_string(),
            });
        }

        let coordinator = Arc::new(coordinator);
        self.coordinators.insert(task_type, coordinator.clone());
        Ok(coordinator)
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<Coordinator>> {
        self.coordinators.get(task_type).cloned()
    }

    /// Registered task types, sorted
    pub fn task_types(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.coordinators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }
}
