//! Configuration for Bindgate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindgateConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BindgateConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::ConfigLoad(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::ConfigLoad(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults overridden by `lookup`.
    ///
    /// Unparsable numeric or boolean values are ignored and the default kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BINDGATE_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Some(port) = lookup("BINDGATE_PORT").and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }
        if let Some(secs) = lookup("BINDGATE_VERIFY_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.server.verify_timeout_secs = secs;
        }
        if let Some(status) = lookup("BINDGATE_UNAVAILABLE_STATUS").and_then(|s| s.parse().ok()) {
            config.server.unavailable_status = status;
        }

        // Directory
        if let Some(url) = lookup("LDAP_URL") {
            config.ldap.server_url = url;
        }
        if let Some(dn) = lookup("LDAP_SERVICE_DN") {
            config.ldap.service_dn = dn;
        }
        if let Some(secret) = lookup("LDAP_SERVICE_SECRET") {
            config.ldap.service_password = secret;
        }
        if let Some(base) = lookup("LDAP_SEARCH_BASE") {
            config.ldap.search_base = base;
        }
        if let Some(filter) = lookup("LDAP_USER_FILTER") {
            config.ldap.user_filter = filter;
        }
        if let Some(policy) = lookup("LDAP_MATCH_POLICY").and_then(|p| p.parse().ok()) {
            config.ldap.match_policy = policy;
        }
        if let Some(start_tls) = lookup("LDAP_START_TLS").map(|v| parse_flag(&v)) {
            config.ldap.start_tls = start_tls;
        }
        if let Some(skip) = lookup("LDAP_SKIP_TLS_VERIFY").map(|v| parse_flag(&v)) {
            config.ldap.skip_tls_verify = skip;
        }
        if let Some(secs) = lookup("LDAP_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.ldap.timeout_seconds = secs;
        }

        // Logging
        if let Some(level) = lookup("BINDGATE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("BINDGATE_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            config.logging.format = format;
        }
        if let Some(dir) = lookup("BINDGATE_LOG_DIR") {
            config.logging.directory = Some(PathBuf::from(dir));
        }
        if let Some(env) = lookup("BINDGATE_ENV") {
            config.logging.production = env.eq_ignore_ascii_case("production");
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.server.validate()?;
        self.ldap.validate()?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Deadline around one whole credential verification
    pub verify_timeout_secs: u64,
    /// HTTP status returned when the directory cannot be used
    pub unavailable_status: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::DEFAULT_PORT,
            verify_timeout_secs: 15,
            unavailable_status: 400,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.verify_timeout_secs == 0 {
            return Err(crate::Error::InvalidConfig(
                "verify_timeout_secs must be greater than zero".into(),
            ));
        }
        if !(400..600).contains(&self.unavailable_status) {
            return Err(crate::Error::InvalidConfig(format!(
                "unavailable_status must be a 4xx or 5xx code, got {}",
                self.unavailable_status
            )));
        }
        Ok(())
    }
}

/// What to do when the user search matches more than one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Refuse to authenticate against an ambiguous username
    #[default]
    Reject,
    /// Use the first entry returned by the directory server
    First,
}

impl FromStr for MatchPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "first" => Ok(Self::First),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown match policy: {}",
                other
            ))),
        }
    }
}

/// LDAP directory configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapConfig {
    /// LDAP server URL (ldap:// or ldaps://)
    pub server_url: String,

    /// Use STARTTLS for connection upgrade
    pub start_tls: bool,

    /// Skip TLS certificate verification (not recommended for production)
    pub skip_tls_verify: bool,

    /// Service account DN bound before every user search
    pub service_dn: String,

    /// Service account password
    pub service_password: String,

    /// Root of the subtree searched for users
    pub search_base: String,

    /// User search filter, `{username}` is replaced with the escaped username
    pub user_filter: String,

    pub match_policy: MatchPolicy,

    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server_url: "ldap://localhost:389".to_string(),
            start_tls: false,
            skip_tls_verify: false,
            service_dn: String::new(),
            service_password: String::new(),
            search_base: String::new(),
            user_filter: "(cn={username})".to_string(),
            match_policy: MatchPolicy::default(),
            timeout_seconds: 10,
        }
    }
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("server_url", &self.server_url)
            .field("start_tls", &self.start_tls)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("service_dn", &self.service_dn)
            .field("service_password", &"<redacted>")
            .field("search_base", &self.search_base)
            .field("user_filter", &self.user_filter)
            .field("match_policy", &self.match_policy)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl LdapConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.server_url.is_empty() {
            return Err(crate::Error::InvalidConfig("LDAP server URL is required".into()));
        }

        let url = url::Url::parse(&self.server_url).map_err(|e| {
            crate::Error::InvalidConfig(format!("Invalid LDAP server URL: {}", e))
        })?;
        match url.scheme() {
            "ldap" | "ldaps" => {}
            other => {
                return Err(crate::Error::InvalidConfig(format!(
                    "LDAP server URL must use ldap:// or ldaps://, got {}://",
                    other
                )))
            }
        }

        if url.scheme() == "ldaps" && self.start_tls {
            return Err(crate::Error::InvalidConfig(
                "STARTTLS cannot be combined with an ldaps:// URL".into(),
            ));
        }

        if self.service_dn.is_empty() {
            return Err(crate::Error::InvalidConfig("Service DN is required".into()));
        }

        if self.search_base.is_empty() {
            return Err(crate::Error::InvalidConfig("Search base DN is required".into()));
        }

        if !self.user_filter.contains(crate::USERNAME_PLACEHOLDER) {
            return Err(crate::Error::InvalidConfig(
                "User filter must contain {username} placeholder".into(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::InvalidConfig(
                "LDAP timeout must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown log format: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Directory receiving `error.log` and `combined.log`
    pub directory: Option<PathBuf>,
    /// Suppress console output, leaving only the log files
    pub production: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
            production: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn valid_ldap() -> LdapConfig {
        LdapConfig {
            server_url: "ldap://ldap.example.com:389".to_string(),
            service_dn: "cn=service,ou=services,dc=example,dc=com".to_string(),
            service_password: "secret".to_string(),
            search_base: "ou=users,dc=example,dc=com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BindgateConfig::default();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.unavailable_status, 400);
        assert_eq!(config.ldap.user_filter, "(cn={username})");
        assert_eq!(config.ldap.match_policy, MatchPolicy::Reject);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_ldap_validation() {
        let mut config = LdapConfig::default();

        // Should fail - no service DN
        assert!(config.validate().is_err());

        config = valid_ldap();
        assert!(config.validate().is_ok());

        config.server_url = "http://ldap.example.com".to_string();
        assert!(config.validate().is_err());

        config = valid_ldap();
        config.user_filter = "(cn=alice)".to_string();
        assert!(config.validate().is_err());

        config = valid_ldap();
        config.search_base.clear();
        assert!(config.validate().is_err());

        config = valid_ldap();
        config.server_url = "ldaps://ldap.example.com:636".to_string();
        config.start_tls = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_validation() {
        let mut server = ServerConfig::default();
        assert!(server.validate().is_ok());

        server.unavailable_status = 503;
        assert!(server.validate().is_ok());

        server.unavailable_status = 200;
        assert!(server.validate().is_err());

        server = ServerConfig {
            verify_timeout_secs: 0,
            ..Default::default()
        };
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BINDGATE_PORT", "8080"),
            ("BINDGATE_UNAVAILABLE_STATUS", "503"),
            ("LDAP_URL", "ldaps://dc.example.com:636"),
            ("LDAP_SERVICE_DN", "cn=svc,dc=example,dc=com"),
            ("LDAP_SERVICE_SECRET", "hunter2"),
            ("LDAP_SEARCH_BASE", "ou=people,dc=example,dc=com"),
            ("LDAP_MATCH_POLICY", "first"),
            ("LDAP_START_TLS", "no"),
            ("LDAP_SKIP_TLS_VERIFY", "true"),
            ("BINDGATE_LOG_FORMAT", "json"),
            ("BINDGATE_ENV", "production"),
        ]);

        let config = BindgateConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.unavailable_status, 503);
        assert_eq!(config.ldap.server_url, "ldaps://dc.example.com:636");
        assert_eq!(config.ldap.service_password, "hunter2");
        assert_eq!(config.ldap.match_policy, MatchPolicy::First);
        assert!(!config.ldap.start_tls);
        assert!(config.ldap.skip_tls_verify);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.production);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_ignores_garbage_numbers() {
        let config = BindgateConfig::from_lookup(|key| match key {
            "BINDGATE_PORT" => Some("not-a-port".to_string()),
            "LDAP_MATCH_POLICY" => Some("random".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.ldap.match_policy, MatchPolicy::Reject);
        assert!(!config.ldap.skip_tls_verify);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[ldap]
server_url = "ldap://127.0.0.1:1389"
service_dn = "cn=svc,dc=example,dc=com"
service_password = "pw"
search_base = "dc=example,dc=com"
match_policy = "first"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = BindgateConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.verify_timeout_secs, 15);
        assert_eq!(config.ldap.match_policy, MatchPolicy::First);
        assert_eq!(config.ldap.user_filter, "(cn={username})");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_debug_redacts_service_password() {
        let rendered = format!("{:?}", valid_ldap());
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}
