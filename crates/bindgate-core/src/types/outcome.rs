//! Verification outcome

use serde::{Deserialize, Serialize};

/// Result of one credential verification.
///
/// An unknown user and a wrong password both map to `InvalidCredential`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Authenticated,
    InvalidCredential,
    ServiceUnavailable,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::InvalidCredential => "invalid_credential",
            Self::ServiceUnavailable => "service_unavailable",
        }
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
