//! Credential types

use std::fmt;

/// A username/password pair supplied by the caller.
///
/// Both fields are guaranteed non-empty. An empty password would turn the
/// user bind into an unauthenticated bind, which many directory servers
/// accept, so the only way to build a `Credential` is through [`Credential::new`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> crate::Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || password.is_empty() {
            return Err(crate::Error::MissingCredentials);
        }

        Ok(Self { username, password })
    }

    /// Build a credential from optional request fields
    pub fn from_parts(username: Option<String>, password: Option<String>) -> crate::Result<Self> {
        match (username, password) {
            (Some(username), Some(password)) => Self::new(username, password),
            _ => Err(crate::Error::MissingCredentials),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_credential_requires_both_fields() {
        assert!(Credential::new("alice", "correct").is_ok());
        assert!(matches!(Credential::new("", "correct"), Err(Error::MissingCredentials)));
        assert!(matches!(Credential::new("alice", ""), Err(Error::MissingCredentials)));
    }

    #[test]
    fn test_from_parts() {
        let cred = Credential::from_parts(Some("alice".into()), Some("pw".into())).unwrap();
        assert_eq!(cred.username(), "alice");
        assert_eq!(cred.password(), "pw");

        assert!(Credential::from_parts(None, Some("pw".into())).is_err());
        assert!(Credential::from_parts(Some("alice".into()), None).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let cred = Credential::new("alice", "s3cr3t").unwrap();
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
