//! Login server implementation

use axum::{
    extract::FromRef,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use bindgate_auth::CredentialVerifier;
use bindgate_core::{config::BindgateConfig, Error, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};
use crate::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BindgateConfig>,
    pub verifier: Arc<CredentialVerifier>,
    pub metrics: Arc<MetricsRecorder>,
}

impl AppState {
    pub fn new(
        config: BindgateConfig,
        verifier: CredentialVerifier,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            metrics,
        }
    }

    /// Status used for `ServiceUnavailable`, validated at startup
    pub fn unavailable_status(&self) -> StatusCode {
        StatusCode::from_u16(self.config.server.unavailable_status).unwrap_or(StatusCode::BAD_REQUEST)
    }
}

impl FromRef<AppState> for Arc<MetricsRecorder> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    // Request lines are info outside production, debug inside it
    let request_level = if state.config.logging.production {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(request_level))
        .on_request(DefaultOnRequest::new().level(request_level))
        .on_response(DefaultOnResponse::new().level(request_level));

    Router::new()
        .route("/login", post(routes::login))
        .route("/is_staff", post(routes::is_staff))
        .route("/health", get(routes::health_check))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
        .layer(trace)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Login Server
pub struct LoginServer {
    config: BindgateConfig,
}

impl LoginServer {
    pub fn new(config: BindgateConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        self.config.validate()?;

        let metrics = MetricsRecorder::install()
            .map_err(|e| Error::InternalError(format!("Failed to install metrics recorder: {}", e)))?;
        info!("Prometheus metrics initialized");

        let verifier = CredentialVerifier::from_config(&self.config.ldap);
        info!(
            server_url = %self.config.ldap.server_url,
            search_base = %self.config.ldap.search_base,
            match_policy = ?verifier.match_policy(),
            "LDAP verifier configured"
        );

        let addr = format!("{}:{}", self.config.server.bind_address, self.config.server.port);
        let state = AppState::new(self.config, verifier, Arc::new(metrics));
        let app = router(state);

        let listener = TcpListener::bind(&addr).await?;

        info!("Bindgate login service listening on http://{}", addr);
        info!("Prometheus metrics at http://{}/metrics", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Bindgate login service stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
