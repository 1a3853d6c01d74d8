//! Error types for Bindgate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to callers whose request lacks a usable credential
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Expected 'username' and 'password'";

#[derive(Error, Debug)]
pub enum Error {
    // Client Errors
    #[error("Expected 'username' and 'password'")]
    MissingCredentials,

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    // Internal Errors
    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingCredentials => "MissingCredentials",
            Error::InvalidConfig(_) | Error::ConfigLoad(_) => "InvalidConfiguration",
            Error::InternalError(_) => "InternalError",
            Error::Io(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::MissingCredentials => 400,
            _ => 500,
        }
    }
}
