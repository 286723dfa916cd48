//! User Runtime: drives one simulated user through its task queue until
//! it stops, sampling wait time between tasks and handling the control-flow
//! signals a task can raise instead of a plain success/failure.
//!
//! A "task" in this crate is one scenario run end-to-end through the
//! retained `ScenarioExecutor`. The global request ceiling is still checked
//! at HTTP-request granularity, not once per popped task: `execute()` tests
//! it before every step and stops dispatching further steps the moment it
//! trips, so a scenario that straddles the ceiling only logs the steps that
//! ran before the trip and reports the rest as never attempted.

use crate::connection_pool::GLOBAL_POOL_STATS;
use crate::events::{Event, EventBus, Signal};
use crate::executor::{ScenarioExecutor, SessionStore};
use crate::memory_guard::is_percentile_tracking_active;
use crate::percentiles::{GLOBAL_SCENARIO_PERCENTILES, GLOBAL_STEP_PERCENTILES};
use crate::scenario::ScenarioContext;
use crate::stats::StatsRegistry;
use crate::throughput::GLOBAL_THROUGHPUT_TRACKER;
use crate::user::{Task, UserClass};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("scenario '{scenario}' failed at step {step:?}: {detail}")]
    ScenarioFailed {
        scenario: String,
        step: Option<usize>,
        detail: String,
    },
}

/// What a task invocation tells the runtime to do next.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Ran to completion (successfully or not); proceed to wait() as usual.
    Continue,
    /// Raise `InterruptUser`: stop the user's loop. `reschedule` is currently
    /// informational only — every interrupt exits the loop immediately,
    /// there being no outer scheduler in this crate to hand the user back to.
    Interrupt { reschedule: bool },
    /// The task raised an error other than a control-flow interrupt.
    Error(TaskError),
}

/// One simulated user: a task queue drawn from a `UserClass`, wait-time
/// tracking, and the retained scenario-execution substrate.
pub struct UserInstance {
    pub user_id: String,
    user_class: Arc<UserClass>,
    queue: VecDeque<Task>,
    already_ran: HashSet<String>,
    executor: ScenarioExecutor,
    context: ScenarioContext,
    session: SessionStore,
    bus: EventBus,
    stats: Arc<StatsRegistry>,
    time_start: Instant,
    wait_mean: Option<f64>,
    wait_count: u64,
}

impl UserInstance {
    pub fn new(
        user_id: impl Into<String>,
        user_class: Arc<UserClass>,
        client: reqwest::Client,
        bus: EventBus,
        stats: Arc<StatsRegistry>,
    ) -> Self {
        let executor = ScenarioExecutor::new(user_class.host.clone(), client);
        Self {
            user_id: user_id.into(),
            user_class,
            queue: VecDeque::new(),
            already_ran: HashSet::new(),
            executor,
            context: ScenarioContext::new(),
            session: SessionStore::new(),
            bus,
            stats,
            time_start: Instant::now(),
            wait_mean: None,
            wait_count: 0,
        }
    }

    /// Draw the next task uniformly from the user class's flat, already
    /// weight-multiplied task vector (see `user.rs`).
    fn get_next_task(&self) -> Task {
        let tasks = &self.user_class.tasks;
        let idx = rand::thread_rng().gen_range(0..tasks.len());
        tasks[idx].clone()
    }

    /// Run one task invocation and report the outcome.
    async fn invoke(&mut self, task: Task) -> TaskOutcome {
        // require_once: first time this wrapped task comes up, schedule its
        // prerequisite and a plain copy of itself at the queue head (variant
        // B) instead of running for real.
        if let Some(prereq) = task.requires.clone() {
            if !self.already_ran.contains(&prereq.name) {
                self.already_ran.insert(prereq.name.clone());
                let plain_wrapped = Task {
                    requires: None,
                    ..task.clone()
                };
                self.queue.push_front(plain_wrapped);
                self.queue.push_front((*prereq).clone());
                return TaskOutcome::Continue;
            }
        }

        let result = self
            .executor
            .execute(&task.scenario, &mut self.context, &mut self.session, &self.stats)
            .await;

        for step in &result.steps {
            if step.success {
                self.stats.log(&step.step_name, step.response_time_ms);
                self.bus.fire(Event::RequestSuccess {
                    name: step.step_name.clone(),
                    response_time_ms: step.response_time_ms,
                    content_length: 0,
                });
            } else {
                let error = step.error.clone().unwrap_or_else(|| "unknown error".into());
                self.stats
                    .log_error(&step.step_name, "RequestError", &error);
                self.bus.fire(Event::RequestFailure {
                    name: step.step_name.clone(),
                    response_time_ms: step.response_time_ms,
                    error: error.clone(),
                });
            }

            if is_percentile_tracking_active() {
                let label = format!("{}:{}", result.scenario_name, step.step_name);
                GLOBAL_STEP_PERCENTILES.record(&label, step.response_time_ms);
            }
            GLOBAL_POOL_STATS.record_request(step.response_time_ms);
        }

        if is_percentile_tracking_active() {
            GLOBAL_SCENARIO_PERCENTILES.record(&result.scenario_name, result.total_time_ms);
        }
        GLOBAL_THROUGHPUT_TRACKER.record(
            &result.scenario_name,
            Duration::from_millis(result.total_time_ms),
        );

        if result.interrupted {
            debug!(user = %self.user_id, "global request ceiling reached, interrupting user");
            TaskOutcome::Interrupt { reschedule: false }
        } else if result.success {
            TaskOutcome::Continue
        } else {
            TaskOutcome::Error(TaskError::ScenarioFailed {
                scenario: result.scenario_name.clone(),
                step: result.failed_at_step,
                detail: result
                    .steps
                    .get(result.failed_at_step.unwrap_or(0))
                    .and_then(|s| s.error.clone())
                    .unwrap_or_else(|| "step failed".into()),
            })
        }
    }

    /// Sample a wait duration per the configured policy, updating the
    /// running mean when `avg_wait_ms` constrains the distribution.
    fn sample_wait(&mut self) -> Duration {
        let min = self.user_class.min_wait_ms;
        let max = self.user_class.max_wait_ms;
        if max <= min {
            return Duration::from_millis(min);
        }

        let millis = match self.user_class.avg_wait_ms {
            None => rand::thread_rng().gen_range(min..=max),
            Some(avg) => {
                let avg = avg as f64;
                let sampled = match self.wait_mean {
                    None => {
                        let r = (avg - min as f64).min(max as f64 - avg);
                        let lo = (avg - r).max(min as f64);
                        let hi = (avg + r).min(max as f64);
                        rand::thread_rng().gen_range(lo..=hi)
                    }
                    Some(mean) if mean >= avg => {
                        rand::thread_rng().gen_range(min as f64..=avg)
                    }
                    Some(_) => rand::thread_rng().gen_range(avg..=max as f64),
                };
                let n = self.wait_count as f64;
                let new_mean = match self.wait_mean {
                    None => sampled,
                    Some(mean) => (mean * n + sampled) / (n + 1.0),
                };
                self.wait_mean = Some(new_mean);
                self.wait_count += 1;
                sampled
            }
        };

        Duration::from_millis(millis as u64)
    }

    /// Drive this user until it stops: `on_start` once, if the class defines
    /// one, then loop popping tasks, invoking them, and waiting, until
    /// `stop_timeout` elapses or the global request ceiling trips.
    pub async fn run(&mut self) {
        if let Some(on_start) = self.user_class.on_start.clone() {
            match self.invoke(on_start).await {
                TaskOutcome::Interrupt { .. } => return,
                TaskOutcome::Error(err) => {
                    warn!(user = %self.user_id, error = %err, "on_start task raised an error");
                    self.bus.fire(Event::LocustError {
                        user_id: self.user_id.clone(),
                        message: err.to_string(),
                    });
                }
                TaskOutcome::Continue => {}
            }
        }

        loop {
            if let Some(secs) = self.user_class.stop_timeout_secs {
                if self.time_start.elapsed() >= Duration::from_secs(secs) {
                    return;
                }
            }

            if self.stats.ceiling_reached() {
                debug!(user = %self.user_id, "global request ceiling reached, stopping");
                return;
            }

            if self.queue.is_empty() {
                self.queue.push_back(self.get_next_task());
            }
            let task = self.queue.pop_front().unwrap();

            let outcome = self.invoke(task).await;

            match outcome {
                TaskOutcome::Continue => {}
                TaskOutcome::Interrupt { .. } => return,
                TaskOutcome::Error(err) => {
                    warn!(user = %self.user_id, error = %err, "task raised an error");
                    self.bus.fire(Event::LocustError {
                        user_id: self.user_id.clone(),
                        message: err.to_string(),
                    });
                }
            }

            let wait = self.sample_wait();
            tokio::time::sleep(wait).await;
        }
    }
}
