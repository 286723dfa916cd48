//! Local Runner: spawns and tracks `UserInstance` tasks for a single process
//! (whether that process is a standalone `local` run or a worker carrying
//! out a master's `hatch` command).
//!
//! Bookkeeping mirrors `cluster.rs`'s node/state map — a set of live handles
//! behind a lock, driven through an explicit state machine — generalized
//! from tracking peer nodes to tracking per-user `JoinHandle`s.

use crate::events::EventBus;
use crate::runtime::UserInstance;
use crate::stats::StatsRegistry;
use crate::user::UserClass;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Init,
    Hatching,
    Running,
    Stopped,
}

struct LiveUser {
    id: u64,
    class_name: String,
    handle: JoinHandle<()>,
}

/// Tracks live users for one process and drives hatch/stop transitions.
pub struct LocalRunner {
    client: reqwest::Client,
    bus: EventBus,
    stats: Arc<StatsRegistry>,
    next_id: AtomicU64,
    live: Mutex<Vec<LiveUser>>,
    state: Mutex<RunnerState>,
}

impl LocalRunner {
    pub fn new(client: reqwest::Client, bus: EventBus, stats: Arc<StatsRegistry>) -> Self {
        Self {
            client,
            bus,
            stats,
            next_id: AtomicU64::new(0),
            live: Mutex::new(Vec::new()),
            state: Mutex::new(RunnerState::Init),
        }
    }

    pub fn state(&self) -> RunnerState {
        *self.state.lock().unwrap()
    }

    pub fn user_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// Build the exact multiset of `count` classes to spawn (or kill),
    /// apportioned by `UserClass::weight` the same way `UserClassBuilder`
    /// expands a `{task: weight}` entry into a flat vector: each class gets
    /// `round(count * weight / total_weight)` slots, then rounding drift is
    /// corrected by nudging the heaviest classes so the total is exact.
    /// Deterministic — no per-spawn random draw — so a given `(classes,
    /// count)` pair always yields the same bucket.
    fn weighted_bucket(classes: &[Arc<UserClass>], count: usize) -> Vec<Arc<UserClass>> {
        let total_weight: u32 = classes.iter().map(|c| c.weight).sum();
        if classes.is_empty() || total_weight == 0 || count == 0 {
            return Vec::new();
        }

        let mut shares: Vec<(Arc<UserClass>, usize)> = classes
            .iter()
            .map(|class| {
                let exact = count as f64 * class.weight as f64 / total_weight as f64;
                (class.clone(), exact.round() as usize)
            })
            .collect();

        let mut assigned: usize = shares.iter().map(|(_, n)| *n).sum();
        while assigned < count {
            let (_, n) = shares
                .iter_mut()
                .max_by_key(|(class, _)| class.weight)
                .expect("classes is non-empty");
            *n += 1;
            assigned += 1;
        }
        while assigned > count {
            let (_, n) = shares
                .iter_mut()
                .filter(|(_, n)| *n > 0)
                .max_by_key(|(class, _)| class.weight)
                .expect("assigned > 0 implies some share is > 0");
            *n -= 1;
            assigned -= 1;
        }

        let mut bucket = Vec::with_capacity(count);
        for (class, n) in shares {
            for _ in 0..n {
                bucket.push(class.clone());
            }
        }
        bucket
    }

    fn spawn_one(&self, class: Arc<UserClass>) -> JoinHandle<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user_id = format!("{}-{}", class.name, id);
        let client = self.client.clone();
        let bus = self.bus.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            let mut instance = UserInstance::new(user_id, class, client, bus, stats);
            instance.run().await;
        })
    }

    /// Spawn `count` additional users, drawing user classes from the
    /// deterministic weighted bucket.
    pub fn spawn_locusts(&self, count: usize, classes: &[Arc<UserClass>]) {
        if classes.is_empty() {
            warn!("spawn_locusts called with no user classes configured");
            return;
        }
        let bucket = Self::weighted_bucket(classes, count);
        let mut live = self.live.lock().unwrap();
        for class in bucket {
            let class_name = class.name.clone();
            let id = self.next_id.load(Ordering::SeqCst);
            let handle = self.spawn_one(class);
            live.push(LiveUser { id, class_name, handle });
        }
    }

    /// Kill `count` live users, choosing which classes to cull from the same
    /// deterministic weighted bucket `spawn_locusts` uses, so an oversized
    /// class is trimmed back down proportionally rather than by pure
    /// most-recent-first LIFO order. Within a class, the most recently
    /// spawned instances go first.
    pub fn kill_locusts(&self, count: usize, classes: &[Arc<UserClass>]) {
        let mut live = self.live.lock().unwrap();
        if count == 0 || live.is_empty() {
            return;
        }
        let count = count.min(live.len());

        let kill_bucket = Self::weighted_bucket(classes, count);
        let mut quota: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for class in &kill_bucket {
            *quota.entry(class.name.clone()).or_insert(0) += 1;
        }

        let mut kept = Vec::with_capacity(live.len());
        for user in live.drain(..).rev() {
            match quota.get_mut(&user.class_name) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    user.handle.abort();
                }
                _ => kept.push(user),
            }
        }
        kept.reverse();
        *live = kept;
    }

    /// Converge the live user count to `target`, spawning or killing the
    /// delta — `start_hatching` doubles as the rebalance entry point.
    /// New users are spawned one at a time with a `1 / hatch_rate` second
    /// gap between them, mirroring the original implementation's
    /// `spawn_locusts` pacing; killing excess users is immediate.
    pub async fn start_hatching(&self, target: usize, hatch_rate: f64, classes: &[Arc<UserClass>]) {
        {
            let mut state = self.state.lock().unwrap();
            *state = RunnerState::Hatching;
        }
        self.stats.reset();

        let current = self.user_count();
        if target > current {
            let to_spawn = target - current;
            info!(current, target, hatch_rate, "hatching additional users");
            if classes.is_empty() {
                warn!("spawn_locusts called with no user classes configured");
            } else {
                let sleep_time = Duration::from_secs_f64(1.0 / hatch_rate.max(0.01));
                for class in Self::weighted_bucket(classes, to_spawn) {
                    let class_name = class.name.clone();
                    let id = self.next_id.load(Ordering::SeqCst);
                    let handle = self.spawn_one(class);
                    self.live.lock().unwrap().push(LiveUser { id, class_name, handle });
                    tokio::time::sleep(sleep_time).await;
                }
            }
        } else if target < current {
            info!(current, target, "killing excess users");
            self.kill_locusts(current - target, classes);
        }

        *self.state.lock().unwrap() = RunnerState::Running;
        self.bus.fire(crate::events::Event::HatchComplete { count: self.user_count() as u64 });
    }

    /// Stop every live user and transition to `Stopped`.
    pub fn stop(&self) {
        let mut live = self.live.lock().unwrap();
        for user in live.drain(..) {
            user.handle.abort();
        }
        *self.state.lock().unwrap() = RunnerState::Stopped;
    }
}
