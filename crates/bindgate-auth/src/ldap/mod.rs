//! LDAP directory access
//!
//! Provides:
//! - The connector/session seam the verifier talks to
//! - An `ldap3` implementation supporting LDAP, LDAPS and STARTTLS
//! - Scoped session release on every exit path

mod client;
mod directory;
mod types;

pub use client::{LdapConnector, LdapSession};
pub use directory::{
    DirectoryConnector, DirectoryError, DirectorySession, SessionGuard, RC_INVALID_CREDENTIALS,
};
pub use types::*;
