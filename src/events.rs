//! In-process event bus used to decouple the user runtime, the HTTP client
//! adapter, and the stats engine from one another.
//!
//! Listeners run synchronously, in registration order, on the thread that
//! fires the signal. A listener must not panic the process on a bad input;
//! any error it surfaces is logged and otherwise ignored so a single
//! misbehaving listener cannot take down the signal's other subscribers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::error;

/// One fired occurrence of a signal, as handed to every registered listener.
#[derive(Debug, Clone)]
pub enum Event {
    /// A logged request succeeded. (name, response_time_ms, content_length)
    RequestSuccess {
        name: String,
        response_time_ms: u64,
        content_length: u64,
    },
    /// A logged request failed. (name, response_time_ms, error message)
    RequestFailure {
        name: String,
        response_time_ms: u64,
        error: String,
    },
    /// A hatch round finished; carries the total live user count.
    HatchComplete { count: u64 },
    /// A worker reported its stats snapshot to the master.
    SlaveReport { node_id: String, data: SlaveReportData },
    /// Fired on a worker so listeners can populate the outgoing stats report.
    ReportToMaster { node_id: String },
    /// The process is shutting down.
    Quitting,
    /// A task raised an error other than a control-flow interrupt.
    LocustError { user_id: String, message: String },
}

/// Payload carried by a `SlaveReport` event: already-decoded entries ready
/// to merge into a `StatsRegistry`, plus the worker's reported error counts
/// and live user count.
#[derive(Debug, Clone, Default)]
pub struct SlaveReportData {
    pub entries: Vec<crate::stats::StatsEntry>,
    pub errors: HashMap<String, u64>,
    pub user_count: u64,
}

type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Which named signal an event belongs to, used to key the listener table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    RequestSuccess,
    RequestFailure,
    HatchComplete,
    SlaveReport,
    ReportToMaster,
    Quitting,
    LocustError,
}

impl Event {
    fn signal(&self) -> Signal {
        match self {
            Event::RequestSuccess { .. } => Signal::RequestSuccess,
            Event::RequestFailure { .. } => Signal::RequestFailure,
            Event::HatchComplete { .. } => Signal::HatchComplete,
            Event::SlaveReport { .. } => Signal::SlaveReport,
            Event::ReportToMaster { .. } => Signal::ReportToMaster,
            Event::Quitting => Signal::Quitting,
            Event::LocustError { .. } => Signal::LocustError,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::RequestSuccess => "request_success",
            Signal::RequestFailure => "request_failure",
            Signal::HatchComplete => "hatch_complete",
            Signal::SlaveReport => "slave_report",
            Signal::ReportToMaster => "report_to_master",
            Signal::Quitting => "quitting",
            Signal::LocustError => "locust_error",
        };
        write!(f, "{}", name)
    }
}

#[derive(Default)]
struct Listeners {
    request_success: Vec<Listener>,
    request_failure: Vec<Listener>,
    hatch_complete: Vec<Listener>,
    slave_report: Vec<Listener>,
    report_to_master: Vec<Listener>,
    quitting: Vec<Listener>,
    locust_error: Vec<Listener>,
}

impl Listeners {
    fn for_signal(&mut self, signal: Signal) -> &mut Vec<Listener> {
        match signal {
            Signal::RequestSuccess => &mut self.request_success,
            Signal::RequestFailure => &mut self.request_failure,
            Signal::HatchComplete => &mut self.hatch_complete,
            Signal::SlaveReport => &mut self.slave_report,
            Signal::ReportToMaster => &mut self.report_to_master,
            Signal::Quitting => &mut self.quitting,
            Signal::LocustError => &mut self.locust_error,
        }
    }
}

/// The event bus. Cheap to clone — internally an `Arc<Mutex<...>>`.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `signal`. Listeners for a signal fire in the
    /// order they were registered.
    pub fn subscribe<F>(&self, signal: Signal, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.for_signal(signal).push(Box::new(listener));
    }

    /// Invoke every listener registered for this event's signal, in
    /// registration order. Listener panics are not caught — a listener must
    /// be written not to panic; this mirrors the "listeners must not fail"
    /// invariant rather than enforcing it structurally.
    pub fn fire(&self, event: Event) {
        let signal = event.signal();
        let listeners = self.listeners.lock().unwrap();
        let for_signal = match signal {
            Signal::RequestSuccess => &listeners.request_success,
            Signal::RequestFailure => &listeners.request_failure,
            Signal::HatchComplete => &listeners.hatch_complete,
            Signal::SlaveReport => &listeners.slave_report,
            Signal::ReportToMaster => &listeners.report_to_master,
            Signal::Quitting => &listeners.quitting,
            Signal::LocustError => &listeners.locust_error,
        };
        for listener in for_signal {
            listener(&event);
        }
    }
}

/// Log and swallow a listener-side error, per the bus's "must not fail"
/// contract — a helper for listeners that wrap fallible work.
pub fn log_listener_error(signal: Signal, err: impl fmt::Display) {
    error!(signal = %signal, error = %err, "event listener failed, continuing");
}
