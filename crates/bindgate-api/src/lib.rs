//! HTTP API for Bindgate

pub mod metrics;
pub mod routes;
pub mod server;

pub use metrics::MetricsRecorder;
pub use server::{router, AppState, LoginServer};
