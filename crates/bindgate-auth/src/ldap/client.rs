//! LDAP client implementation
//!
//! Opens `ldap3` connections for the verifier. Supports LDAP, LDAPS (SSL)
//! and STARTTLS connections.

use crate::ldap::directory::{DirectoryConnector, DirectoryError, DirectorySession};
use crate::ldap::types::ConnectSettings;
use async_trait::async_trait;
use bindgate_core::config::LdapConfig;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::debug;

/// Opens one `ldap3` connection per call
#[derive(Debug, Clone)]
pub struct LdapConnector {
    settings: ConnectSettings,
}

impl LdapConnector {
    pub fn new(settings: ConnectSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &LdapConfig) -> Self {
        Self::new(ConnectSettings::from_config(config))
    }

    pub fn settings(&self) -> &ConnectSettings {
        &self.settings
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.timeout)
            .set_starttls(self.settings.start_tls)
            .set_no_tls_verify(self.settings.skip_tls_verify);

        debug!("Connecting to LDAP server: {}", self.settings.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.settings.server_url)
            .await
            .map_err(|e| {
                DirectoryError::ConnectionFailed(format!("Failed to connect to LDAP server: {}", e))
            })?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapSession { ldap }))
    }
}

/// A connected `ldap3` handle.
///
/// Dropping the handle ends the driver task, so a session that is never
/// explicitly closed still tears down its socket.
pub struct LdapSession {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self.ldap.simple_bind(dn, password).await?;

        if result.rc != 0 {
            return Err(DirectoryError::BindRejected {
                dn: dn.to_string(),
                rc: result.rc,
                text: result.text,
            });
        }

        Ok(())
    }

    async fn search_dns(&mut self, base: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        let (rs, _res) = self
            .ldap
            .search(base, Scope::Subtree, filter, vec!["dn"])
            .await?
            .success()
            .map_err(|e| DirectoryError::SearchFailed(e.to_string()))?;

        Ok(rs
            .into_iter()
            .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
            .map(|entry| SearchEntry::construct(entry).dn)
            .collect())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_from_config() {
        let config = LdapConfig {
            server_url: "ldap://localhost:389".to_string(),
            start_tls: true,
            ..Default::default()
        };

        let connector = LdapConnector::from_config(&config);
        assert_eq!(connector.settings().server_url, "ldap://localhost:389");
        assert!(connector.settings().start_tls);
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_fails() {
        // Port 1 on loopback is closed on any sane test host
        let config = LdapConfig {
            server_url: "ldap://127.0.0.1:1".to_string(),
            timeout_seconds: 2,
            ..Default::default()
        };

        let connector = LdapConnector::from_config(&config);
        let result = connector.connect().await;
        assert!(matches!(result, Err(DirectoryError::ConnectionFailed(_))));
    }
}
