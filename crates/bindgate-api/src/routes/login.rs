//! POST /login

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bindgate_core::{error::MISSING_CREDENTIALS_MESSAGE, Credential, VerificationOutcome};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{UNAUTHORIZED_MESSAGE, UNAVAILABLE_MESSAGE};
use crate::server::AppState;

/// Login request body. Fields are optional so a missing one is reported
/// with the usual 400 instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Parse a request body. Anything that is not a JSON object with string
    /// fields yields an empty request.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn into_credential(self) -> bindgate_core::Result<Credential> {
        Credential::from_parts(self.username, self.password)
    }
}

/// Error body shared by every failure response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Map a verification outcome to the response the caller sees
pub fn outcome_response(outcome: VerificationOutcome, unavailable_status: StatusCode) -> Response {
    match outcome {
        VerificationOutcome::Authenticated => (StatusCode::OK, "OK").into_response(),
        VerificationOutcome::InvalidCredential => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new(UNAUTHORIZED_MESSAGE)),
        )
            .into_response(),
        VerificationOutcome::ServiceUnavailable => (
            unavailable_status,
            Json(ErrorBody::new(UNAVAILABLE_MESSAGE)),
        )
            .into_response(),
    }
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> Response {
    let credential = match LoginRequest::from_body(&body).into_credential() {
        Ok(credential) => credential,
        Err(e) => {
            warn!(code = e.code(), "{}", e);
            state.metrics.record_bad_request();
            return (
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
                Json(ErrorBody::new(MISSING_CREDENTIALS_MESSAGE)),
            )
                .into_response();
        }
    };

    debug!("POST /login username={}", credential.username());

    let deadline = Duration::from_secs(state.config.server.verify_timeout_secs);
    let start = Instant::now();

    let outcome = match tokio::time::timeout(deadline, state.verifier.verify(&credential)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(
                username = %credential.username(),
                timeout_secs = deadline.as_secs(),
                "Directory did not answer before the deadline"
            );
            state.metrics.record_timeout();
            VerificationOutcome::ServiceUnavailable
        }
    };

    state
        .metrics
        .record_verification(outcome, start.elapsed().as_secs_f64());

    match outcome {
        VerificationOutcome::Authenticated => info!(username = %credential.username(), "Login accepted"),
        VerificationOutcome::InvalidCredential => warn!(username = %credential.username(), "Login rejected"),
        VerificationOutcome::ServiceUnavailable => {
            error!(username = %credential.username(), "Login failed, directory unavailable")
        }
    }

    outcome_response(outcome, state.unavailable_status())
}
