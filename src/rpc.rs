//! Master/worker control-plane transport.
//!
//! Two interchangeable substrates implement the same message catalog: a
//! gRPC bidirectional stream (the production path, generated from
//! `proto/loadtest.proto`) and a length-prefixed plain-socket fallback for
//! environments without a usable gRPC stack. Selection is a runtime value
//! (`Config::rpc_transport`), following the "interface with Server and
//! Client capabilities, select at runtime" design note rather than a trait
//! object — `Envelope` is a plain enum both substrates serialize the same
//! way, so an enum-dispatched handle is enough and keeps every `await` point
//! free of dynamic dispatch through a boxed future.

use crate::stats::StatsEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tonic::transport::{Channel as TonicChannel, Server};
use tonic::{Request, Response, Status, Streaming};
use tracing::{error, warn};

pub mod pb {
    tonic::include_proto!("loadtest");
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("failed to connect to {0}")]
    ConnectFailed(String),
    #[error("rpc channel disconnected")]
    Disconnected,
    #[error("failed to decode message: {0}")]
    Decode(String),
    #[error("failed to encode message: {0}")]
    Encode(String),
}

/// One control-plane message, independent of wire format. `node_id` is
/// empty on the master->worker direction messages that do not need it
/// filled in by the sender (the transport stamps it on receipt for gRPC;
/// the socket fallback carries it explicitly in the frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub node_id: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    ClientReady,
    Hatching,
    HatchComplete { count: u64 },
    Stats { entries: Vec<StatsSnapshot>, errors: HashMap<String, u64>, user_count: u64 },
    ClientStopped,
    Quit,
    Hatch { hatch_rate: f64, num_clients: u64, num_requests: Option<u64>, host: String, stop_timeout_secs: Option<u64> },
    Stop,
}

/// Wire-friendly mirror of `StatsEntry`, since the live struct carries a
/// private `recent_samples` buffer that never needs to cross the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub name: String,
    pub num_reqs: u64,
    pub num_failures: u64,
    pub total_response_time: u64,
    pub min_response_time: Option<u64>,
    pub max_response_time: u64,
    pub response_times: HashMap<u64, u64>,
    pub num_reqs_per_sec: HashMap<i64, u64>,
    pub last_request_timestamp: Option<i64>,
    pub start_time: i64,
}

impl From<&StatsEntry> for StatsSnapshot {
    fn from(entry: &StatsEntry) -> Self {
        Self {
            name: entry.name.clone(),
            num_reqs: entry.num_reqs,
            num_failures: entry.num_failures,
            total_response_time: entry.total_response_time,
            min_response_time: entry.min_response_time,
            max_response_time: entry.max_response_time,
            response_times: entry.response_times.iter().map(|(&k, &v)| (k, v)).collect(),
            num_reqs_per_sec: entry.num_reqs_per_sec.iter().map(|(&k, &v)| (k, v)).collect(),
            last_request_timestamp: entry.last_request_timestamp,
            start_time: entry.start_time,
        }
    }
}

impl From<Envelope> for pb::Envelope {
    fn from(env: Envelope) -> Self {
        let payload = match env.payload {
            Payload::ClientReady => pb::envelope::Payload::ClientReady(pb::ClientReady {}),
            Payload::Hatching => pb::envelope::Payload::Hatching(pb::Hatching {}),
            Payload::HatchComplete { count } => {
                pb::envelope::Payload::HatchComplete(pb::HatchComplete { count })
            }
            Payload::Stats { entries, errors, user_count } => {
                let entries = entries
                    .into_iter()
                    .map(|e| {
                        (
                            e.name.clone(),
                            pb::StatsEntrySnapshot {
                                name: e.name,
                                num_reqs: e.num_reqs,
                                num_failures: e.num_failures,
                                total_response_time_ms: e.total_response_time,
                                min_response_time_ms: e.min_response_time,
                                max_response_time_ms: e.max_response_time,
                                response_times: e.response_times,
                                num_reqs_per_sec: e.num_reqs_per_sec,
                                last_request_timestamp: e.last_request_timestamp,
                                start_time: e.start_time,
                            },
                        )
                    })
                    .collect();
                pb::envelope::Payload::Stats(pb::Stats { entries, errors, user_count })
            }
            Payload::ClientStopped => pb::envelope::Payload::ClientStopped(pb::ClientStopped {}),
            Payload::Quit => pb::envelope::Payload::Quit(pb::Quit {}),
            Payload::Hatch { hatch_rate, num_clients, num_requests, host, stop_timeout_secs } => {
                pb::envelope::Payload::Hatch(pb::Hatch {
                    hatch_rate,
                    num_clients,
                    num_requests,
                    host,
                    stop_timeout_secs,
                })
            }
            Payload::Stop => pb::envelope::Payload::Stop(pb::Stop {}),
        };
        pb::Envelope { node_id: env.node_id, payload: Some(payload) }
    }
}

impl TryFrom<pb::Envelope> for Envelope {
    type Error = RpcError;

    fn try_from(env: pb::Envelope) -> Result<Self, RpcError> {
        let payload = env.payload.ok_or_else(|| RpcError::Decode("missing payload".into()))?;
        let payload = match payload {
            pb::envelope::Payload::ClientReady(_) => Payload::ClientReady,
            pb::envelope::Payload::Hatching(_) => Payload::Hatching,
            pb::envelope::Payload::HatchComplete(h) => Payload::HatchComplete { count: h.count },
            pb::envelope::Payload::Stats(s) => Payload::Stats {
                entries: s
                    .entries
                    .into_values()
                    .map(|e| StatsSnapshot {
                        name: e.name,
                        num_reqs: e.num_reqs,
                        num_failures: e.num_failures,
                        total_response_time: e.total_response_time_ms,
                        min_response_time: e.min_response_time_ms,
                        max_response_time: e.max_response_time_ms,
                        response_times: e.response_times,
                        num_reqs_per_sec: e.num_reqs_per_sec,
                        last_request_timestamp: e.last_request_timestamp,
                        start_time: e.start_time,
                    })
                    .collect(),
                errors: s.errors,
                user_count: s.user_count,
            },
            pb::envelope::Payload::ClientStopped(_) => Payload::ClientStopped,
            pb::envelope::Payload::Quit(_) => Payload::Quit,
            pb::envelope::Payload::Hatch(h) => Payload::Hatch {
                hatch_rate: h.hatch_rate,
                num_clients: h.num_clients,
                num_requests: h.num_requests,
                host: h.host,
                stop_timeout_secs: h.stop_timeout_secs,
            },
            pb::envelope::Payload::Stop(_) => Payload::Stop,
        };
        Ok(Envelope { node_id: env.node_id, payload })
    }
}

/// Fan-out for the master side of the control plane: one outbound queue per
/// worker, keyed by `node_id`, instead of a single shared channel. A server
/// substrate registers a route the moment it learns which worker a
/// connection belongs to (the worker's first envelope always carries its
/// `node_id`), and removes it once that connection drops.
#[derive(Clone)]
pub struct OutboundRouter {
    routes: std::sync::Arc<std::sync::Mutex<HashMap<String, mpsc::UnboundedSender<Envelope>>>>,
}

impl OutboundRouter {
    pub(crate) fn new() -> Self {
        Self { routes: std::sync::Arc::new(std::sync::Mutex::new(HashMap::new())) }
    }

    pub(crate) fn register(&self, node_id: String) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().unwrap().insert(node_id, tx);
        rx
    }

    pub(crate) fn remove(&self, node_id: &str) {
        self.routes.lock().unwrap().remove(node_id);
    }

    /// Route an envelope to the worker named by `env.node_id`. Silently
    /// drops (as `Disconnected`) if that worker has no registered route,
    /// matching the "best-effort" transport contract.
    pub fn send(&self, env: Envelope) -> Result<(), RpcError> {
        let routes = self.routes.lock().unwrap();
        match routes.get(&env.node_id) {
            Some(tx) => tx.send(env).map_err(|_| RpcError::Disconnected),
            None => Err(RpcError::Disconnected),
        }
    }
}

/// Server-side handle: a stream of inbound envelopes plus a router to push
/// outbound ones to the right worker, regardless of which substrate is in
/// play underneath.
pub struct RpcServerHandle {
    pub inbound: mpsc::UnboundedReceiver<Envelope>,
    pub outbound: OutboundRouter,
}

/// Client-side handle, symmetric to `RpcServerHandle`. A client only ever
/// talks to one peer, so its outbound side stays a plain sender.
pub struct RpcClientHandle {
    pub inbound: mpsc::UnboundedReceiver<Envelope>,
    pub outbound: mpsc::UnboundedSender<Envelope>,
}

struct GrpcService {
    inbound_tx: mpsc::UnboundedSender<Envelope>,
    router: OutboundRouter,
}

#[tonic::async_trait]
impl pb::load_test_control_server::LoadTestControl for GrpcService {
    type ChannelStream = tokio_stream::wrappers::UnboundedReceiverStream<Result<pb::Envelope, Status>>;

    async fn channel(
        &self,
        request: Request<Streaming<pb::Envelope>>,
    ) -> Result<Response<Self::ChannelStream>, Status> {
        let mut inbound_stream = request.into_inner();
        let inbound_tx = self.inbound_tx.clone();
        let (node_id_tx, node_id_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let mut node_id_tx = Some(node_id_tx);
            while let Ok(Some(msg)) = inbound_stream.message().await {
                match Envelope::try_from(msg) {
                    Ok(env) => {
                        if let Some(tx) = node_id_tx.take() {
                            let _ = tx.send(env.node_id.clone());
                        }
                        if inbound_tx.send(env).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to decode inbound envelope");
                    }
                }
            }
        });

        // A worker always sends client_ready as its first message, so the
        // node_id is known before any outbound route is needed.
        let node_id = node_id_rx
            .await
            .map_err(|_| Status::aborted("stream closed before first envelope"))?;

        let router = self.router.clone();
        let mut outbound_rx = router.register(node_id.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(env) = outbound_rx.recv().await {
                if tx.send(Ok(env.into())).is_err() {
                    break;
                }
            }
            router.remove(&node_id);
        });

        Ok(Response::new(tokio_stream::wrappers::UnboundedReceiverStream::new(rx)))
    }

    async fn health_check(
        &self,
        _request: Request<pb::HealthCheckRequest>,
    ) -> Result<Response<pb::HealthCheckResponse>, Status> {
        Ok(Response::new(pb::HealthCheckResponse {
            status: pb::health_check_response::Status::Serving as i32,
        }))
    }
}

/// Start the gRPC control-plane server on `bind_addr`, returning a handle
/// that fans out to every worker that opens a channel. Mirrors `grpc.rs`'s
/// `start_grpc_server` shape (build a service, bind a `Server`, spawn it).
pub async fn start_grpc_server(bind_addr: &str) -> Result<RpcServerHandle, RpcError> {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let router = OutboundRouter::new();

    let service = GrpcService { inbound_tx, router: router.clone() };

    let addr = bind_addr
        .parse()
        .map_err(|e| RpcError::ConnectFailed(format!("{bind_addr}: {e}")))?;

    tokio::spawn(async move {
        if let Err(e) = Server::builder()
            .add_service(pb::load_test_control_server::LoadTestControlServer::new(service))
            .serve(addr)
            .await
        {
            error!(error = %e, "grpc control-plane server exited");
        }
    });

    Ok(RpcServerHandle { inbound: inbound_rx, outbound: router })
}

/// Connect to a master's gRPC control plane and open its one bidi stream.
pub async fn connect_grpc(host: &str, port: u16) -> Result<RpcClientHandle, RpcError> {
    let endpoint = format!("http://{host}:{port}");
    let channel = TonicChannel::from_shared(endpoint.clone())
        .map_err(|e| RpcError::ConnectFailed(e.to_string()))?
        .connect()
        .await
        .map_err(|e| RpcError::ConnectFailed(format!("{endpoint}: {e}")))?;

    let mut client = pb::load_test_control_client::LoadTestControlClient::new(channel);

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Envelope>();
    let outbound_stream = tokio_stream::wrappers::UnboundedReceiverStream::new(outbound_rx)
        .map(pb::Envelope::from);

    let response = client
        .channel(Request::new(outbound_stream))
        .await
        .map_err(|e| RpcError::ConnectFailed(e.to_string()))?;
    let mut inbound_stream = response.into_inner();

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok(Some(msg)) = inbound_stream.message().await {
            match Envelope::try_from(msg) {
                Ok(env) => {
                    if inbound_tx.send(env).is_err() {
                        break;
                    }
                }
                Err(e) => error!(error = %e, "failed to decode inbound envelope"),
            }
        }
    });

    Ok(RpcClientHandle { inbound: inbound_rx, outbound: outbound_tx })
}

use tokio_stream::StreamExt as _;

/// Plain-socket fallback: one `Envelope` per frame, JSON-encoded, prefixed
/// with a 4-byte big-endian length. Used when `RPC_TRANSPORT=socket`.
async fn write_frame(stream: &mut TcpStream, env: &Envelope) -> Result<(), RpcError> {
    let bytes = serde_json::to_vec(env).map_err(|e| RpcError::Encode(e.to_string()))?;
    let len = (bytes.len() as u32).to_be_bytes();
    stream.write_all(&len).await.map_err(|_| RpcError::Disconnected)?;
    stream.write_all(&bytes).await.map_err(|_| RpcError::Disconnected)?;
    Ok(())
}

async fn read_frame(stream: &mut TcpStream) -> Result<Envelope, RpcError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(|_| RpcError::Disconnected)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.map_err(|_| RpcError::Disconnected)?;
    serde_json::from_slice(&buf).map_err(|e| RpcError::Decode(e.to_string()))
}

/// Serve the socket fallback on `bind_addr`, spawning one connection task
/// per accepted worker so the fleet is served concurrently rather than one
/// worker at a time.
pub async fn start_socket_server(bind_addr: &str) -> Result<RpcServerHandle, RpcError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| RpcError::ConnectFailed(format!("{bind_addr}: {e}")))?;

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let router = OutboundRouter::new();
    let accept_router = router.clone();

    tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "socket control-plane accept failed");
                    continue;
                }
            };
            warn!(peer = %peer, "socket control-plane connection accepted");
            let inbound_tx = inbound_tx.clone();
            let router = accept_router.clone();
            tokio::spawn(socket_connection(stream, inbound_tx, router));
        }
    });

    Ok(RpcServerHandle { inbound: inbound_rx, outbound: router })
}

/// Drive a single worker's socket connection: learn its `node_id` from the
/// first frame (always `client_ready`), register its outbound route, then
/// pump frames in both directions until the peer disconnects.
async fn socket_connection(
    mut stream: TcpStream,
    inbound_tx: mpsc::UnboundedSender<Envelope>,
    router: OutboundRouter,
) {
    let first = match read_frame(&mut stream).await {
        Ok(env) => env,
        Err(_) => return,
    };
    let node_id = first.node_id.clone();
    if inbound_tx.send(first).is_err() {
        return;
    }

    let mut outbound_rx = router.register(node_id.clone());
    loop {
        tokio::select! {
            frame = read_frame(&mut stream) => {
                match frame {
                    Ok(env) => {
                        if inbound_tx.send(env).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            Some(env) = outbound_rx.recv() => {
                if write_frame(&mut stream, &env).await.is_err() {
                    break;
                }
            }
        }
    }
    router.remove(&node_id);
}

/// Connect to the socket fallback.
pub async fn connect_socket(host: &str, port: u16) -> Result<RpcClientHandle, RpcError> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| RpcError::ConnectFailed(format!("{host}:{port}: {e}")))?;

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Envelope>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = read_frame(&mut stream) => {
                    match frame {
                        Ok(env) => {
                            if inbound_tx.send(env).is_err() {
                                return;
                            }
                        }
                        Err(_) => return,
                    }
                }
                Some(env) = outbound_rx.recv() => {
                    if write_frame(&mut stream, &env).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    Ok(RpcClientHandle { inbound: inbound_rx, outbound: outbound_tx })
}
