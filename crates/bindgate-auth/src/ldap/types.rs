//! LDAP identity and filter helpers

use bindgate_core::config::LdapConfig;
use bindgate_core::USERNAME_PLACEHOLDER;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Service Identity
// ============================================================================

/// The account bound before every user search.
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct ServiceIdentity {
    dn: String,
    password: String,
}

impl ServiceIdentity {
    pub fn new(dn: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &LdapConfig) -> Self {
        Self::new(config.service_dn.clone(), config.service_password.clone())
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("dn", &self.dn)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Connection Settings
// ============================================================================

/// Transport settings for opening a directory connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSettings {
    pub server_url: String,
    pub start_tls: bool,
    pub skip_tls_verify: bool,
    pub timeout: Duration,
}

impl ConnectSettings {
    pub fn from_config(config: &LdapConfig) -> Self {
        Self {
            server_url: config.server_url.clone(),
            start_tls: config.start_tls,
            skip_tls_verify: config.skip_tls_verify,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Build the user search filter with username substitution.
///
/// The username is escaped per RFC 4515 so `(`, `)`, `*`, `\` and NUL cannot
/// change the structure of the filter.
pub fn build_user_filter(template: &str, username: &str) -> String {
    template.replace(USERNAME_PLACEHOLDER, &ldap3::ldap_escape(username))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_filter_building() {
        assert_eq!(build_user_filter("(cn={username})", "john"), "(cn=john)");
        assert_eq!(
            build_user_filter("(&(objectClass=person)(uid={username}))", "jane"),
            "(&(objectClass=person)(uid=jane))"
        );
    }

    #[test]
    fn test_user_filter_escapes_metacharacters() {
        assert_eq!(build_user_filter("(cn={username})", "*"), "(cn=\\2a)");
        assert_eq!(
            build_user_filter("(cn={username})", "admin)(cn=*"),
            "(cn=admin\\29\\28cn=\\2a)"
        );
        assert_eq!(build_user_filter("(cn={username})", "a\\b"), "(cn=a\\5cb)");
        assert_eq!(build_user_filter("(cn={username})", "nul\0"), "(cn=nul\\00)");
    }

    #[test]
    fn test_service_identity_debug_is_redacted() {
        let identity = ServiceIdentity::new("cn=svc,dc=example,dc=com", "topsecret");
        let rendered = format!("{:?}", identity);
        assert!(rendered.contains("cn=svc"));
        assert!(!rendered.contains("topsecret"));
    }

    #[test]
    fn test_connect_settings_from_config() {
        let config = LdapConfig {
            server_url: "ldaps://dc.example.com:636".to_string(),
            skip_tls_verify: true,
            timeout_seconds: 3,
            ..Default::default()
        };
        let settings = ConnectSettings::from_config(&config);
        assert_eq!(settings.server_url, "ldaps://dc.example.com:636");
        assert!(settings.skip_tls_verify);
        assert!(!settings.start_tls);
        assert_eq!(settings.timeout, Duration::from_secs(3));
    }
}
