//! Master Runner: tracks connected workers and drives the distributed
//! hatch/stop lifecycle by fanning out `Hatch`/`Stop` envelopes and merging
//! the `Stats` reports workers send back.
//!
//! Node bookkeeping follows `cluster.rs`'s `HashMap<NodeId, NodeState>` under
//! a lock; `client_listener`'s match-on-message-type dispatch follows the
//! same shape as `grpc.rs`'s request handling.

use crate::config::RunMode;
use crate::events::{Event, EventBus, Signal};
use crate::rpc::{start_grpc_server, start_socket_server, Envelope, OutboundRouter, Payload, RpcError, RpcServerHandle};
use crate::stats::StatsRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveState {
    Ready,
    Hatching,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SlaveNode {
    pub id: String,
    pub state: SlaveState,
    pub user_count: u64,
}

/// Coordinates a set of workers. `num_clients` is the *total* desired
/// client count across the whole cluster; `start_hatching` must never
/// overwrite it with a per-slave share (the corrected form of the bug named
/// in the data model — see `DESIGN.md`'s Open Question resolution #2).
pub struct MasterRunner {
    clients: Mutex<HashMap<String, SlaveNode>>,
    stats: Arc<StatsRegistry>,
    outbound: OutboundRouter,
    num_clients: Mutex<u64>,
    bus: EventBus,
}

impl MasterRunner {
    /// Start listening on `bind_addr` using the configured transport and
    /// return a `MasterRunner` plus the inbound-message pump future to
    /// `tokio::spawn`. Subscribes a `slave_report` listener that performs
    /// the actual stats merge, so the event is the real mechanism rather
    /// than a notification alongside a direct call.
    pub async fn bind(
        bind_addr: &str,
        transport: crate::config::RpcTransport,
        stats: Arc<StatsRegistry>,
        bus: EventBus,
    ) -> Result<(Arc<Self>, impl std::future::Future<Output = ()>), RpcError> {
        let RpcServerHandle { mut inbound, outbound } = match transport {
            crate::config::RpcTransport::Grpc => start_grpc_server(bind_addr).await?,
            crate::config::RpcTransport::Socket => start_socket_server(bind_addr).await?,
        };

        let merge_stats = stats.clone();
        bus.subscribe(Signal::SlaveReport, move |event| {
            if let Event::SlaveReport { data, .. } = event {
                merge_stats.merge_report(data.entries.clone(), data.errors.clone());
            }
        });

        let runner = Arc::new(Self {
            clients: Mutex::new(HashMap::new()),
            stats,
            outbound,
            num_clients: Mutex::new(0),
            bus,
        });

        let listener_runner = runner.clone();
        let pump = async move {
            while let Some(envelope) = inbound.recv().await {
                listener_runner.client_listener(envelope).await;
            }
        };

        Ok((runner, pump))
    }

    /// Dispatch one inbound envelope per its message type (W -> M direction).
    async fn client_listener(&self, envelope: Envelope) {
        let node_id = envelope.node_id.clone();
        match envelope.payload {
            Payload::ClientReady => {
                let mut clients = self.clients.lock().await;
                clients.insert(
                    node_id.clone(),
                    SlaveNode { id: node_id.clone(), state: SlaveState::Ready, user_count: 0 },
                );
                info!(worker = %node_id, "worker ready");
            }
            Payload::Hatching => {
                if let Some(node) = self.clients.lock().await.get_mut(&node_id) {
                    node.state = SlaveState::Hatching;
                }
            }
            Payload::HatchComplete { count } => {
                let mut clients = self.clients.lock().await;
                if let Some(node) = clients.get_mut(&node_id) {
                    node.state = SlaveState::Running;
                    node.user_count = count;
                }
            }
            Payload::Stats { entries, errors, user_count } => {
                let entries = entries.into_iter().map(into_stats_entry).collect();
                self.bus.fire(Event::SlaveReport {
                    node_id: node_id.clone(),
                    data: crate::events::SlaveReportData { entries, errors, user_count },
                });
                if let Some(node) = self.clients.lock().await.get_mut(&node_id) {
                    node.user_count = user_count;
                }
            }
            Payload::ClientStopped => {
                let mut clients = self.clients.lock().await;
                clients.remove(&node_id);
                if !clients.values().any(|n| matches!(n.state, SlaveState::Hatching | SlaveState::Running)) {
                    info!("all workers stopped");
                }
            }
            Payload::Quit => {
                self.clients.lock().await.remove(&node_id);
                info!(worker = %node_id, "worker quit");
            }
            Payload::Hatch { .. } | Payload::Stop => {
                warn!(worker = %node_id, "worker sent a master-only message, ignoring");
            }
        }
    }

    pub async fn worker_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Fan `num_clients` total desired clients out across every ready
    /// worker, dividing locally per message rather than mutating the shared
    /// total (the corrected hatch-rate math).
    pub async fn start_hatching(
        &self,
        num_clients: u64,
        hatch_rate: f64,
        host: String,
        stop_timeout_secs: Option<u64>,
    ) {
        *self.num_clients.lock().await = num_clients;

        let clients = self.clients.lock().await;
        let ready_or_running: Vec<&String> = clients
            .iter()
            .filter(|(_, node)| matches!(node.state, SlaveState::Ready | SlaveState::Running))
            .map(|(id, _)| id)
            .collect();
        let worker_count = ready_or_running.len() as u64;
        if worker_count == 0 {
            warn!("start_hatching called with no ready or running workers, no-op");
            return;
        }

        let base = num_clients / worker_count;
        let remainder = num_clients % worker_count;
        let slave_rate = (hatch_rate / worker_count as f64).max(0.01);

        for (idx, node_id) in ready_or_running.into_iter().enumerate() {
            let slave_num_clients = base + if (idx as u64) < remainder { 1 } else { 0 };
            let envelope = Envelope {
                node_id: node_id.clone(),
                payload: Payload::Hatch {
                    hatch_rate: slave_rate,
                    num_clients: slave_num_clients,
                    num_requests: None,
                    host: host.clone(),
                    stop_timeout_secs,
                },
            };
            let _ = self.outbound.send(envelope);
        }
    }

    pub async fn stop(&self) {
        let clients = self.clients.lock().await;
        for (node_id, node) in clients.iter() {
            if !matches!(node.state, SlaveState::Hatching | SlaveState::Running) {
                continue;
            }
            let _ = self.outbound.send(Envelope {
                node_id: node_id.clone(),
                payload: Payload::Stop,
            });
        }
    }

    pub async fn nodes(&self) -> Vec<SlaveNode> {
        self.clients.lock().await.values().cloned().collect()
    }

    #[cfg(test)]
    fn new_for_test(outbound: OutboundRouter) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            stats: Arc::new(StatsRegistry::new()),
            outbound,
            num_clients: Mutex::new(0),
            bus: EventBus::new(),
        }
    }
}

fn into_stats_entry(snapshot: crate::rpc::StatsSnapshot) -> crate::stats::StatsEntry {
    crate::stats::StatsEntry::from_remote(
        snapshot.name,
        snapshot.num_reqs,
        snapshot.num_failures,
        snapshot.total_response_time,
        snapshot.min_response_time,
        snapshot.max_response_time,
        snapshot.response_times.into_iter().collect(),
        snapshot.num_reqs_per_sec.into_iter().collect(),
        snapshot.last_request_timestamp,
        snapshot.start_time,
    )
}

pub fn describe_mode(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Local => "local",
        RunMode::Master => "master",
        RunMode::Worker => "worker",
    }
}
