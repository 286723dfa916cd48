//! The stats engine: per-endpoint counters, a rounded-latency histogram used
//! for space-efficient percentile/median estimation, and a process-global
//! registry that can be merged across worker processes.
//!
//! This is deliberately independent of the Prometheus-facing metrics in
//! `metrics.rs`/`percentiles.rs`: those exist for operational dashboards,
//! this exists because the master has to merge exact counters received over
//! RPC from every worker, and the merge law (associative, commutative,
//! `min`/`max` ignoring absent sides) has to hold exactly.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const RECENT_SAMPLES_CAP: usize = 1000;
const CURRENT_RPS_WINDOW_SECS: i64 = 10;

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Round a response time (milliseconds) into the histogram's bucket key.
///
/// `<100`: kept as-is. `<1000`: nearest 10. `<10000`: nearest 100.
/// Otherwise: nearest 1000. This is the exact bucketing scheme the original
/// implementation uses to keep the histogram small without losing
/// resolution at low latencies.
pub fn round_response_time(ms: u64) -> u64 {
    if ms < 100 {
        ms
    } else if ms < 1000 {
        round_to_nearest(ms, 10)
    } else if ms < 10_000 {
        round_to_nearest(ms, 100)
    } else {
        round_to_nearest(ms, 1000)
    }
}

fn round_to_nearest(value: u64, step: u64) -> u64 {
    ((value + step / 2) / step) * step
}

/// The rolling statistics bucket for a single endpoint name.
#[derive(Debug, Clone)]
pub struct StatsEntry {
    pub name: String,
    pub num_reqs: u64,
    pub num_failures: u64,
    pub total_response_time: u64,
    pub min_response_time: Option<u64>,
    pub max_response_time: u64,
    /// rounded-latency -> count
    pub response_times: BTreeMap<u64, u64>,
    /// epoch-second -> count
    pub num_reqs_per_sec: BTreeMap<i64, u64>,
    pub last_request_timestamp: Option<i64>,
    pub start_time: i64,
    recent_samples: VecDeque<u64>,
}

impl StatsEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_reqs: 0,
            num_failures: 0,
            total_response_time: 0,
            min_response_time: None,
            max_response_time: 0,
            response_times: BTreeMap::new(),
            num_reqs_per_sec: BTreeMap::new(),
            last_request_timestamp: None,
            start_time: now_unix(),
            recent_samples: VecDeque::with_capacity(RECENT_SAMPLES_CAP),
        }
    }

    /// Record one successful request's response time, in milliseconds.
    pub fn log(&mut self, response_time_ms: u64) {
        self.num_reqs += 1;
        self.total_response_time += response_time_ms;
        self.min_response_time = Some(match self.min_response_time {
            Some(min) => min.min(response_time_ms),
            None => response_time_ms,
        });
        self.max_response_time = self.max_response_time.max(response_time_ms);

        let t = now_unix();
        *self.num_reqs_per_sec.entry(t).or_insert(0) += 1;
        self.last_request_timestamp = Some(t);

        let rounded = round_response_time(response_time_ms);
        *self.response_times.entry(rounded).or_insert(0) += 1;

        if self.recent_samples.len() == RECENT_SAMPLES_CAP {
            self.recent_samples.pop_back();
        }
        self.recent_samples.push_front(response_time_ms);
    }

    /// Record a failed request against this entry. The shared error message
    /// bookkeeping lives on `StatsRegistry`, not here.
    pub fn log_error(&mut self) {
        self.num_failures += 1;
    }

    pub fn avg_response_time(&self) -> f64 {
        if self.num_reqs == 0 {
            0.0
        } else {
            self.total_response_time as f64 / self.num_reqs as f64
        }
    }

    /// Weighted median over the rounded-latency histogram.
    pub fn median_response_time(&self) -> u64 {
        if self.num_reqs == 0 {
            return 0;
        }
        let mut pos = (self.num_reqs - 1) / 2;
        for (&bucket, &count) in &self.response_times {
            if pos < count {
                return bucket;
            }
            pos -= count;
        }
        0
    }

    /// Mean requests/sec over the last `CURRENT_RPS_WINDOW_SECS` seconds
    /// ending just before the last observed request.
    pub fn current_rps(&self) -> f64 {
        let Some(last) = self.last_request_timestamp else {
            return 0.0;
        };
        let window_start = (last - CURRENT_RPS_WINDOW_SECS).max(self.start_time);
        if last <= window_start {
            return 0.0;
        }
        let span = (last - window_start) as f64;
        let total: u64 = (window_start..last)
            .map(|t| self.num_reqs_per_sec.get(&t).copied().unwrap_or(0))
            .sum();
        total as f64 / span
    }

    /// Percentile over an inflated, sorted sample list rebuilt from the
    /// histogram, with linear interpolation between neighboring indices.
    pub fn percentile(&self, p: f64) -> f64 {
        let inflated = self.inflated_sorted_samples();
        if inflated.is_empty() {
            return 0.0;
        }
        let len = inflated.len();
        let idx_f = (len - 1) as f64 * p;
        let idx = idx_f.floor() as usize;
        let frac = idx_f - idx as f64;
        let lo = inflated[idx] as f64;
        if frac == 0.0 || idx + 1 >= len {
            lo
        } else {
            let hi = inflated[idx + 1] as f64;
            lo + (hi - lo) * frac
        }
    }

    fn inflated_sorted_samples(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.num_reqs as usize);
        for (&bucket, &count) in &self.response_times {
            for _ in 0..count {
                out.push(bucket);
            }
        }
        out
    }

    /// Reconstruct an entry from a remote snapshot's already-aggregated
    /// fields (used by the master when unpacking a worker's `Stats` RPC
    /// report) — exact, unlike replaying counts through `log`, which would
    /// only have the rounded latency to re-derive `total_response_time` from.
    #[allow(clippy::too_many_arguments)]
    pub fn from_remote(
        name: impl Into<String>,
        num_reqs: u64,
        num_failures: u64,
        total_response_time: u64,
        min_response_time: Option<u64>,
        max_response_time: u64,
        response_times: BTreeMap<u64, u64>,
        num_reqs_per_sec: BTreeMap<i64, u64>,
        last_request_timestamp: Option<i64>,
        start_time: i64,
    ) -> Self {
        Self {
            name: name.into(),
            num_reqs,
            num_failures,
            total_response_time,
            min_response_time,
            max_response_time,
            response_times,
            num_reqs_per_sec,
            last_request_timestamp,
            start_time,
            recent_samples: VecDeque::new(),
        }
    }

    /// Merge another entry's counters into this one, per the merge laws in
    /// the data model: sums add, max/min combine, timestamps take the wider
    /// bound, and nulls contribute nothing.
    pub fn merge(mut self, other: &StatsEntry) -> StatsEntry {
        self.num_reqs += other.num_reqs;
        self.num_failures += other.num_failures;
        self.total_response_time += other.total_response_time;
        self.max_response_time = self.max_response_time.max(other.max_response_time);
        self.min_response_time = match (self.min_response_time, other.min_response_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        self.last_request_timestamp =
            match (self.last_request_timestamp, other.last_request_timestamp) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
        self.start_time = self.start_time.min(other.start_time);
        for (&t, &count) in &other.num_reqs_per_sec {
            *self.num_reqs_per_sec.entry(t).or_insert(0) += count;
        }
        for (&bucket, &count) in &other.response_times {
            *self.response_times.entry(bucket).or_insert(0) += count;
        }
        self
    }
}

/// Process-global (or, on a worker, process-local) registry of stats
/// entries keyed by endpoint name, plus the shared counters and error map
/// described in the data model.
pub struct StatsRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    entries: HashMap<String, StatsEntry>,
    errors: HashMap<String, u64>,
    total_num_requests: u64,
    global_max_requests: Option<u64>,
    global_start_time: i64,
    global_last_request_timestamp: Option<i64>,
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                entries: HashMap::new(),
                errors: HashMap::new(),
                total_num_requests: 0,
                global_max_requests: None,
                global_start_time: now_unix(),
                global_last_request_timestamp: None,
            }),
        }
    }

    pub fn set_global_max_requests(&self, max: Option<u64>) {
        self.inner.lock().unwrap().global_max_requests = max;
    }

    /// True once `total_num_requests` has reached the configured ceiling;
    /// the instrumented client consults this to raise `InterruptUser`.
    pub fn ceiling_reached(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.global_max_requests {
            Some(max) => inner.total_num_requests >= max,
            None => false,
        }
    }

    /// Record a successful request against `name`, creating the entry
    /// lazily on first use.
    pub fn log(&self, name: &str, response_time_ms: u64) {
        let mut inner = self.inner.lock().unwrap();
        let t = now_unix();
        inner.total_num_requests += 1;
        inner.global_last_request_timestamp = Some(t);
        inner
            .entries
            .entry(name.to_string())
            .or_insert_with(|| StatsEntry::new(name))
            .log(response_time_ms);
    }

    /// Record a failed request against `name` and bump the shared
    /// "type: message" error counter.
    pub fn log_error(&self, name: &str, error_type: &str, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .entries
            .entry(name.to_string())
            .or_insert_with(|| StatsEntry::new(name))
            .log_error();
        let key = format!("{}: {}", error_type, message);
        *inner.errors.entry(key).or_insert(0) += 1;
    }

    pub fn get(&self, name: &str) -> Option<StatsEntry> {
        self.inner.lock().unwrap().entries.get(name).cloned()
    }

    pub fn total_num_requests(&self) -> u64 {
        self.inner.lock().unwrap().total_num_requests
    }

    pub fn total_rps(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        let span = match inner.global_last_request_timestamp {
            Some(last) => (last - inner.global_start_time).max(1),
            None => 1,
        };
        inner.total_num_requests as f64 / span as f64
    }

    /// Snapshot every entry name currently known, for building an RPC
    /// stats report or a JSON `/stats/requests` response.
    pub fn snapshot(&self) -> Vec<StatsEntry> {
        self.inner.lock().unwrap().entries.values().cloned().collect()
    }

    pub fn errors_snapshot(&self) -> HashMap<String, u64> {
        self.inner.lock().unwrap().errors.clone()
    }

    /// Merge a worker's reported entries and errors into this registry
    /// (used by the master when it receives a `stats` RPC message).
    pub fn merge_report(&self, entries: Vec<StatsEntry>, errors: HashMap<String, u64>) {
        let mut inner = self.inner.lock().unwrap();
        for incoming in entries {
            inner
                .entries
                .entry(incoming.name.clone())
                .and_modify(|existing| {
                    *existing = existing.clone().merge(&incoming);
                })
                .or_insert(incoming);
        }
        for (key, count) in errors {
            *inner.errors.entry(key).or_insert(0) += count;
        }
    }

    /// Clear all counters without forgetting which endpoint names exist,
    /// and mark a fresh global start time. Called when hatching begins from
    /// a stopped state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        let names: Vec<String> = inner.entries.keys().cloned().collect();
        for name in names {
            inner.entries.insert(name.clone(), StatsEntry::new(name));
        }
        inner.errors.clear();
        inner.total_num_requests = 0;
        inner.global_start_time = now_unix();
        inner.global_last_request_timestamp = None;
    }
}
