//! Login API routes

mod health;
mod login;

pub use health::{health_check, is_staff, HealthCheck, StaffResponse};
pub use login::{login, outcome_response, ErrorBody, LoginRequest};

/// Body returned for a rejected credential
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Body returned when the directory cannot be used
pub const UNAVAILABLE_MESSAGE: &str = "Cannot bind LDAP";
