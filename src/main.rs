use std::env;
use std::sync::Arc;

use rust_loadtest::client::build_client;
use rust_loadtest::config::{Config, RunMode};
use rust_loadtest::events::EventBus;
use rust_loadtest::local_runner::LocalRunner;
use rust_loadtest::master_runner::{describe_mode, MasterRunner};
use rust_loadtest::metrics::{register_metrics, start_metrics_server};
use rust_loadtest::scenario::{RequestConfig, Scenario, Step};
use rust_loadtest::stats::StatsRegistry;
use rust_loadtest::user::{Task, UserClass, UserClassBuilder};
use rust_loadtest::worker_runner::WorkerRunner;
use rust_loadtest::yaml_config::YamlConfig;
use tracing::{error, info, warn};

/// Build the single declarative user class this process drives, from the
/// scenario list parsed out of the YAML config (or the single-request
/// fallback if none was found on disk).
fn build_user_class(config: &Config, scenarios: Vec<Scenario>) -> Result<Arc<UserClass>, Box<dyn std::error::Error + Send + Sync>> {
    let min_wait_ms: u64 = env::var("MIN_WAIT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(1000);
    let max_wait_ms: u64 = env::var("MAX_WAIT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(1000);

    let mut builder = UserClassBuilder::new("LoadTestUser")
        .host(config.target_url.clone())
        .wait_time(min_wait_ms, max_wait_ms);

    for scenario in scenarios {
        let name = scenario.name.clone();
        let weight = scenario.weight.round().max(1.0) as u32;
        builder = builder.task(Task::new(name, scenario), weight);
    }

    Ok(Arc::new(builder.build()?))
}

/// A bare single-step scenario hitting `config.target_url` directly with
/// `config.request_type`, used when no `SCENARIO_CONFIG` YAML is present —
/// the closest equivalent to the teacher's original request-loop default.
fn default_scenario(config: &Config) -> Scenario {
    Scenario {
        name: "default".to_string(),
        weight: 1.0,
        steps: vec![Step {
            name: "request".to_string(),
            request: RequestConfig {
                method: config.request_type.clone(),
                path: "/".to_string(),
                body: config.json_payload.clone(),
                headers: std::collections::HashMap::new(),
            },
            extractions: vec![],
            assertions: vec![],
            think_time: None,
            cache: None,
        }],
    }
}

fn load_scenarios(config: &Config) -> Result<Vec<Scenario>, Box<dyn std::error::Error + Send + Sync>> {
    let path = env::var("SCENARIO_CONFIG").unwrap_or_else(|_| "loadtest.yaml".to_string());
    match YamlConfig::from_file(&path) {
        Ok(cfg) => Ok(cfg.to_scenarios()?),
        Err(e) => {
            warn!(path = %path, error = %e, "could not load scenario config, falling back to a single default request");
            Ok(vec![default_scenario(config)])
        }
    }
}

/// Evaluate the configured load model once, at test start, as the hatch
/// rate — users/sec to spawn at, not requests/sec to fire at. See
/// `SPEC_FULL.md` §9.1: this is the repurposed, closed-loop-compatible use
/// of `load_models::LoadModel`.
fn hatch_rate_from(config: &Config, target_clients: usize) -> f64 {
    let rps = config
        .load_model
        .calculate_current_rps(0.0, config.test_duration.as_secs_f64());
    if rps.is_finite() && rps > 0.0 {
        rps
    } else {
        target_clients.max(1) as f64
    }
}

fn print_final_summary(stats: &StatsRegistry) {
    println!("--- Final stats ---");
    for entry in stats.snapshot() {
        println!(
            "{:40} reqs={:<8} fails={:<6} median={:<6}ms avg={:<8.1}ms rps={:.2}",
            entry.name,
            entry.num_reqs,
            entry.num_failures,
            entry.median_response_time(),
            entry.avg_response_time(),
            entry.current_rps(),
        );
    }
    for (key, count) in stats.errors_snapshot() {
        println!("error: {} x{}", key, count);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    let built = build_client(&config.to_client_config())?;
    config.print_summary(&built.parsed_headers);
    info!(mode = describe_mode(config.run_mode), "starting rust_loadtest");

    register_metrics()?;
    let metrics_port: u16 = env::var("METRICS_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(9090);
    let registry = Arc::new(std::sync::Mutex::new(prometheus::default_registry().clone()));
    tokio::spawn(start_metrics_server(metrics_port, registry));

    let bus = EventBus::new();
    let stats = Arc::new(StatsRegistry::new());

    match config.run_mode {
        RunMode::Local => run_local(&config, built.client, bus, stats).await,
        RunMode::Master => run_master(&config, bus, stats).await,
        RunMode::Worker => run_worker(&config, built.client, bus, stats).await,
    }
}

async fn run_local(
    config: &Config,
    client: reqwest::Client,
    bus: EventBus,
    stats: Arc<StatsRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let scenarios = load_scenarios(config)?;
    let class = build_user_class(config, scenarios)?;
    let classes = vec![class];

    let runner = Arc::new(LocalRunner::new(client, bus, stats.clone()));
    let hatch_rate = hatch_rate_from(config, config.num_concurrent_tasks);
    runner.start_hatching(config.num_concurrent_tasks, hatch_rate, &classes).await;

    tokio::time::sleep(config.test_duration).await;
    info!("test duration elapsed, stopping");
    runner.stop();

    print_final_summary(&stats);
    Ok(())
}

async fn run_master(
    config: &Config,
    bus: EventBus,
    stats: Arc<StatsRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (master, pump) = MasterRunner::bind(&config.master_bind_addr, config.rpc_transport, stats.clone(), bus).await?;
    tokio::spawn(pump);
    info!(addr = %config.master_bind_addr, "master listening for workers");

    let grace_secs: u64 = env::var("MASTER_HATCH_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(5);
    tokio::time::sleep(std::time::Duration::from_secs(grace_secs)).await;

    let hatch_rate = hatch_rate_from(config, config.num_concurrent_tasks);
    master
        .start_hatching(
            config.num_concurrent_tasks as u64,
            hatch_rate,
            config.target_url.clone(),
            None,
        )
        .await;

    tokio::time::sleep(config.test_duration).await;
    info!("test duration elapsed, stopping workers");
    master.stop().await;

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    print_final_summary(&stats);
    Ok(())
}

async fn run_worker(
    config: &Config,
    client: reqwest::Client,
    bus: EventBus,
    stats: Arc<StatsRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let scenarios = load_scenarios(config)?;
    let class = build_user_class(config, scenarios)?;
    let classes = vec![class];

    let (worker, handle) = WorkerRunner::connect(
        &config.master_host,
        config.master_port,
        config.rpc_transport,
        client,
        bus,
        stats.clone(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "failed to connect to master");
        Box::new(e) as Box<dyn std::error::Error + Send + Sync>
    })?;

    worker.run(handle, classes).await;
    print_final_summary(&stats);
    Ok(())
}
