// Library for both binaries and for tests

pub mod aggregator;
pub mod auth;
pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod history_store;
pub mod models;
pub mod preferences_repo;
pub mod routes;
pub mod sampler;
pub mod telemetry;
pub mod transport;
pub mod user_repo;
pub mod version;
