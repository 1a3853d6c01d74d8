//! Directory authentication for Bindgate
//!
//! Proves a username/password pair against an LDAP directory with the
//! service-bind, search, user-bind protocol.

pub mod ldap;
pub mod verifier;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use ldap::{
    build_user_filter, DirectoryConnector, DirectoryError, DirectorySession, LdapConnector,
    ServiceIdentity, SessionGuard,
};
pub use verifier::CredentialVerifier;
