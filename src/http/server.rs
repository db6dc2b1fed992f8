//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay route
//! - Wire up middleware (tracing, request ID)
//! - Buffer the inbound descriptor body under a size limit
//! - Encode the summary or map the failure to its status and message
//! - Bind server to listener with graceful shutdown

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::relay::{Relay, RelayError, RequestStore, ResponseSummary, UpstreamClient};

/// Path of the single relay route.
pub const RELAY_PATH: &str = "/proxy";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub max_body_size: usize,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
    relay: Relay,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails only if the outbound HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let client = UpstreamClient::new(&config.upstream)?;
        let relay = Relay::new(client, RequestStore::new());

        let state = AppState {
            relay: relay.clone(),
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            relay,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(RELAY_PATH, any(relay_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The store every relayed descriptor is recorded into.
    pub fn store(&self) -> &RequestStore {
        self.relay.store()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream_timeout_secs = self.config.upstream.timeout_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!(
            stored_requests = self.relay.store().len(),
            "HTTP server stopped"
        );
        Ok(())
    }
}

/// Relay handler: descriptor in, summary out.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();

    match relay_call(&state, request.into_body()).await {
        Ok((summary, json)) => {
            tracing::info!(
                request_id = %request_id,
                relay_id = %summary.id,
                status = summary.status,
                length = summary.length,
                "Relay completed"
            );
            metrics::record_relay("ok", Some(summary.status), start);
            ([(header::CONTENT_TYPE, "application/json")], json).into_response()
        }
        Err(err) => {
            if matches!(err, RelayError::InvalidInput(_)) {
                tracing::warn!(request_id = %request_id, kind = err.kind(), error = %err, "Rejected descriptor");
            } else {
                tracing::error!(request_id = %request_id, kind = err.kind(), error = %err, "Relay failed");
            }
            metrics::record_relay(err.kind(), None, start);
            err.into_response()
        }
    }
}

async fn relay_call(state: &AppState, body: Body) -> Result<(ResponseSummary, Vec<u8>), RelayError> {
    let bytes = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|e| RelayError::InvalidInput(format!("reading body: {e}")))?;

    let summary = state.relay.handle(&bytes).await?;
    let json = serde_json::to_vec(&summary)?;
    Ok((summary, json))
}
