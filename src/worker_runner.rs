//! Worker Runner: connects to a master, waits for `hatch`/`stop` commands,
//! drives a `LocalRunner` accordingly, and reports stats back on a fixed
//! interval.
//!
//! The connect-then-spawn-a-background-watcher shape follows `raft.rs`'s
//! `start_raft_node` (derive a node id, open a connection, hand off to a
//! background task that reacts to inbound messages).

use crate::config::RpcTransport;
use crate::events::{Event, EventBus, Signal};
use crate::local_runner::LocalRunner;
use crate::rpc::{connect_grpc, connect_socket, Envelope, Payload, RpcClientHandle, RpcError};
use crate::stats::StatsRegistry;
use crate::user::UserClass;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::interval;
use tracing::{error, info};

const SLAVE_REPORT_INTERVAL: Duration = Duration::from_secs(3);

/// Derive a worker id from the local hostname plus a time/random salt. The
/// original implementation hashes `hostname + now + random` through md5;
/// no md5 crate is carried in this workspace, so `DefaultHasher` (already
/// part of `std`) stands in — collision resistance is not a correctness
/// requirement here, only a human-readable, likely-unique worker label.
pub fn generate_client_id() -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hostname = hostname_best_effort();
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let salt: u64 = rand::random();

    let mut hasher = DefaultHasher::new();
    hostname.hash(&mut hasher);
    now_nanos.hash(&mut hasher);
    salt.hash(&mut hasher);

    format!("{}_{:x}", hostname, hasher.finish())
}

fn hostname_best_effort() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string())
}

pub struct WorkerRunner {
    node_id: String,
    runner: Arc<LocalRunner>,
    stats: Arc<StatsRegistry>,
    bus: EventBus,
}

impl WorkerRunner {
    pub async fn connect(
        master_host: &str,
        master_port: u16,
        transport: RpcTransport,
        client: reqwest::Client,
        bus: EventBus,
        stats: Arc<StatsRegistry>,
    ) -> Result<(Self, RpcClientHandle), RpcError> {
        let node_id = generate_client_id();
        let handle = match transport {
            RpcTransport::Grpc => connect_grpc(master_host, master_port).await?,
            RpcTransport::Socket => connect_socket(master_host, master_port).await?,
        };

        handle
            .outbound
            .send(Envelope { node_id: node_id.clone(), payload: Payload::ClientReady })
            .map_err(|_| RpcError::Disconnected)?;

        let runner = Arc::new(LocalRunner::new(client, bus.clone(), stats.clone()));

        Ok((Self { node_id, runner, stats, bus }, handle))
    }

    /// Drive the worker loop: react to `hatch`/`stop`/master-side messages
    /// until the channel closes or a `quit` is sent.
    pub async fn run(
        self,
        mut handle: RpcClientHandle,
        classes: Vec<Arc<UserClass>>,
    ) {
        let disconnected = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let outbound = handle.outbound.clone();
        let node_id = self.node_id.clone();
        let stats = self.stats.clone();
        let runner_for_reporter = self.runner.clone();
        let listener_disconnected = disconnected.clone();
        self.bus.subscribe(Signal::ReportToMaster, move |event| {
            let Event::ReportToMaster { node_id } = event else { return };
            let entries = stats.snapshot().iter().map(crate::rpc::StatsSnapshot::from).collect();
            let errors = stats.errors_snapshot();
            let envelope = Envelope {
                node_id: node_id.clone(),
                payload: Payload::Stats {
                    entries,
                    errors,
                    user_count: runner_for_reporter.user_count() as u64,
                },
            };
            if outbound.send(envelope).is_err() {
                listener_disconnected.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        });

        let reporter_bus = self.bus.clone();
        let reporter_node_id = node_id.clone();
        tokio::spawn(async move {
            Self::stats_reporter(reporter_node_id, reporter_bus, disconnected).await;
        });

        while let Some(envelope) = handle.inbound.recv().await {
            match envelope.payload {
                Payload::Hatch { num_clients, hatch_rate, host, stop_timeout_secs, .. } => {
                    info!(node = %self.node_id, num_clients, hatch_rate, "received hatch command");
                    let _ = stop_timeout_secs;
                    let _ = host;
                    let runner = self.runner.clone();
                    let outbound = handle.outbound.clone();
                    let node_id = self.node_id.clone();
                    let classes = classes.clone();
                    tokio::spawn(async move {
                        runner.start_hatching(num_clients as usize, hatch_rate, &classes).await;
                        let _ = outbound.send(Envelope {
                            node_id,
                            payload: Payload::HatchComplete { count: num_clients },
                        });
                    });
                }
                Payload::Stop => {
                    info!(node = %self.node_id, "received stop command");
                    self.runner.stop();
                    let _ = handle.outbound.send(Envelope {
                        node_id: self.node_id.clone(),
                        payload: Payload::ClientStopped,
                    });
                    let _ = handle.outbound.send(Envelope {
                        node_id: self.node_id.clone(),
                        payload: Payload::ClientReady,
                    });
                }
                Payload::Quit => {
                    info!(node = %self.node_id, "master requested quit");
                    break;
                }
                other => {
                    error!(node = %self.node_id, payload = ?other, "worker received a worker-only message, ignoring");
                }
            }
        }

        self.runner.stop();
        self.bus.fire(crate::events::Event::Quitting);
        let _ = handle.outbound.send(Envelope {
            node_id: self.node_id.clone(),
            payload: Payload::Quit,
        });
    }

    /// Tick on a fixed interval and fire `ReportToMaster` so the subscribed
    /// listener builds and sends the stats envelope. `disconnected` is set
    /// by that listener on a failed send; the ticker checks it right after
    /// firing and exits the loop rather than continuing to tick a dead link.
    async fn stats_reporter(
        node_id: String,
        bus: EventBus,
        disconnected: Arc<std::sync::atomic::AtomicBool>,
    ) {
        let mut ticker = interval(SLAVE_REPORT_INTERVAL);
        loop {
            ticker.tick().await;
            bus.fire(Event::ReportToMaster { node_id: node_id.clone() });
            if disconnected.load(std::sync::atomic::Ordering::SeqCst) {
                error!(node = %node_id, "rpc channel lost, stopping stats reporter");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_unique_across_calls() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_ne!(a, b);
        assert!(a.contains('_'));
    }

    #[test]
    fn client_id_is_prefixed_with_hostname() {
        std::env::set_var("HOSTNAME", "test-host");
        let id = generate_client_id();
        assert!(id.starts_with("test-host_"));
        std::env::remove_var("HOSTNAME");
    }
}
