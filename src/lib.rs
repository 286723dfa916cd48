#[macro_use]
extern crate lazy_static;

pub mod assertions;
pub mod client;
pub mod config;
pub mod config_docs_generator;
pub mod config_hot_reload;
pub mod config_merge;
pub mod config_source;
pub mod config_validation;
pub mod config_version;
pub mod connection_pool;
pub mod data_source;
pub mod errors;
pub mod events;
pub mod executor;
pub mod extractor;
pub mod load_models;
pub mod local_runner;
pub mod master_runner;
pub mod memory_guard;
pub mod metrics;
pub mod multi_scenario;
pub mod percentiles;
pub mod rpc;
pub mod runtime;
pub mod scenario;
pub mod stats;
pub mod throughput;
pub mod user;
pub mod utils;
pub mod worker_runner;
pub mod yaml_config;
