//! The declarative user-class model: a named, weighted bundle of tasks plus
//! the wait-time/host/stop-timeout knobs the runtime needs to drive it.
//!
//! Rust has no runtime metaprogramming equivalent to the original
//! metaclass-based task assembly, so the flattened task vector (the one
//! whose multiplicity encodes selection probability) is built once, eagerly,
//! by `UserClassBuilder`, combining inherited tasks, an explicit weighted
//! list, and annotated-method-style registrations.

use crate::scenario::Scenario;
use std::sync::Arc;
use thiserror::Error;

/// Construction-time failures for a user class — fail fast, per the error
/// handling design's "configuration errors" category.
#[derive(Error, Debug)]
pub enum UserClassError {
    #[error("user class '{0}' has no host configured")]
    NoHost(String),
    #[error("user class '{0}' has an empty task list")]
    EmptyTasks(String),
    #[error("task '{task}' has non-positive weight {weight}")]
    InvalidWeight { task: String, weight: i64 },
}

/// One named unit of simulated work. A task is, in this crate, one scenario
/// executed end-to-end through the retained `ScenarioExecutor` substrate —
/// see `SPEC_FULL.md` §2.1 for why a task is modeled this way rather than as
/// a bare HTTP call.
#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub scenario: Arc<Scenario>,
    /// Set by `require_once`: a prerequisite task that must run exactly once
    /// per user before this task's first real invocation.
    pub requires: Option<Arc<Task>>,
}

impl Task {
    pub fn new(name: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            name: name.into(),
            scenario: Arc::new(scenario),
            requires: None,
        }
    }

    /// Wrap `wrapped` so that, per user, `prereq` is scheduled ahead of it
    /// (and runs) exactly once before `wrapped` ever executes for real.
    /// Implements variant B from the data model: both tasks are enqueued at
    /// the queue head, prereq in front, so the configured wait still
    /// separates them.
    pub fn require_once(prereq: Task, wrapped: Task) -> Task {
        Task {
            requires: Some(Arc::new(prereq)),
            ..wrapped
        }
    }
}

/// The assembled, immutable description of a simulated user's behavior.
#[derive(Clone)]
pub struct UserClass {
    pub name: String,
    pub host: String,
    pub weight: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    pub avg_wait_ms: Option<u64>,
    pub stop_timeout_secs: Option<u64>,
    /// Flat, weight-multiplied task vector — multiplicity is selection
    /// probability, already expanded at construction time.
    pub tasks: Vec<Task>,
    /// Invoked once when a user instance starts, before the task loop.
    /// Never counted toward the weighted task pool.
    pub on_start: Option<Task>,
}

impl UserClass {
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// Assembles a `UserClass` from inherited tasks, an explicit `{task: count}`
/// weighting, and per-method registrations, mirroring the three task
/// sources the data model names (inherited / explicit / annotated).
pub struct UserClassBuilder {
    name: String,
    host: Option<String>,
    weight: u32,
    min_wait_ms: u64,
    max_wait_ms: u64,
    avg_wait_ms: Option<u64>,
    stop_timeout_secs: Option<u64>,
    tasks: Vec<Task>,
    on_start: Option<Task>,
}

impl UserClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
            weight: 10,
            min_wait_ms: 1000,
            max_wait_ms: 1000,
            avg_wait_ms: None,
            stop_timeout_secs: None,
            tasks: Vec::new(),
            on_start: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn wait_time(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_wait_ms = min_ms;
        self.max_wait_ms = max_ms;
        self
    }

    pub fn avg_wait(mut self, avg_ms: u64) -> Self {
        self.avg_wait_ms = Some(avg_ms);
        self
    }

    pub fn stop_timeout(mut self, secs: u64) -> Self {
        self.stop_timeout_secs = Some(secs);
        self
    }

    /// Inherit a base class's already-flattened tasks (source (i) in the
    /// data model: "inherited tasks").
    pub fn inherit(mut self, base: &UserClass) -> Self {
        self.tasks.extend(base.tasks.iter().cloned());
        self
    }

    /// Add `task` with multiplicity `weight` (sources (ii)/(iii): an
    /// explicit `{task: weight}` entry, or an annotated method's declared
    /// weight).
    pub fn task(mut self, task: Task, weight: u32) -> Self {
        for _ in 0..weight {
            self.tasks.push(task.clone());
        }
        self
    }

    /// Add a `{task: count}`-style mapping in one call, expanding each entry
    /// by repeating it `count` times.
    pub fn tasks(mut self, entries: impl IntoIterator<Item = (Task, u32)>) -> Self {
        for (task, weight) in entries {
            for _ in 0..weight {
                self.tasks.push(task.clone());
            }
        }
        self
    }

    /// Register a task to run once, before the main task loop, when a user
    /// instance starts. Not part of the weighted task pool.
    pub fn on_start(mut self, task: Task) -> Self {
        self.on_start = Some(task);
        self
    }

    pub fn build(self) -> Result<UserClass, UserClassError> {
        let host = self.host.ok_or_else(|| UserClassError::NoHost(self.name.clone()))?;
        if self.tasks.is_empty() {
            return Err(UserClassError::EmptyTasks(self.name));
        }
        Ok(UserClass {
            name: self.name,
            host,
            weight: self.weight,
            min_wait_ms: self.min_wait_ms,
            max_wait_ms: self.max_wait_ms,
            avg_wait_ms: self.avg_wait_ms,
            stop_timeout_secs: self.stop_timeout_secs,
            tasks: self.tasks,
            on_start: self.on_start,
        })
    }
}
