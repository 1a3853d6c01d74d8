//! Bindgate Core Library
//!
//! Core types, configuration and errors shared by the Bindgate
//! authentication bridge.

pub mod config;
pub mod error;
pub mod types;

pub use config::BindgateConfig;
pub use error::{Error, Result};
pub use types::{Credential, VerificationOutcome};

/// Bindgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 7000;

/// Placeholder substituted with the escaped username in the user filter
pub const USERNAME_PLACEHOLDER: &str = "{username}";
