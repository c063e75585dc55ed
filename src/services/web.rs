//! Axum-based HTTP server for the control point API.
//!
//! Provides REST endpoints for:
//! - GET `/api/status` - Bus status projection
//! - GET `/api/state` - Full interlocking state
//! - POST `/api/turnout` - Queue a crossover move
//! - POST `/api/route` - Queue a route set or clear
//!
//! POST endpoints only queue. The command is applied, and may still be
//! rejected by the interlocking rules, at the next control cycle; its
//! outcome shows up as `last_outcome` in `/api/state`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::WebConfig;
use crate::messages::{parse_route_request, parse_turnout_request};
use crate::traits::OutputLatch;
use crate::{CommandSource, RemoteCommand};

use super::api::{ApiResponse, CommandResponse, StateResponse, StatusResponse};
use super::shared::SharedControlPoint;

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/status - Returns the status as published on the bus
async fn get_status<O: OutputLatch + Send + 'static>(
    State(state): State<Arc<SharedControlPoint<O>>>,
) -> Json<ApiResponse<StatusResponse>> {
    let status = state.status();
    Json(ApiResponse::ok(StatusResponse::from(&status)))
}

/// GET /api/state - Returns the full interlocking state
async fn get_state<O: OutputLatch + Send + 'static>(
    State(state): State<Arc<SharedControlPoint<O>>>,
) -> Json<ApiResponse<StateResponse>> {
    let response = state.with_control_point(|cp| StateResponse::from(&*cp));
    Json(ApiResponse::ok(response))
}

/// POST /api/turnout - Queue a crossover move
///
/// Accepts JSON: `{"turnout": "east_crossover", "normal": false}`
async fn set_turnout<O: OutputLatch + Send + 'static>(
    State(state): State<Arc<SharedControlPoint<O>>>,
    body: Bytes,
) -> Json<ApiResponse<CommandResponse>> {
    let Some(req) = parse_turnout_request(&body) else {
        return Json(ApiResponse::err("Invalid turnout request"));
    };
    queue(&state, req.into())
}

/// POST /api/route - Queue a route set or clear
///
/// Accepts JSON: `{"entrance": "main1_eastbound", "set": true}`
async fn code_route<O: OutputLatch + Send + 'static>(
    State(state): State<Arc<SharedControlPoint<O>>>,
    body: Bytes,
) -> Json<ApiResponse<CommandResponse>> {
    let Some(req) = parse_route_request(&body) else {
        return Json(ApiResponse::err("Invalid route request"));
    };
    queue(&state, req.into())
}

fn queue<O: OutputLatch>(
    state: &SharedControlPoint<O>,
    cmd: RemoteCommand,
) -> Json<ApiResponse<CommandResponse>> {
    if state.submit(cmd, CommandSource::WebApi) {
        Json(ApiResponse::ok(CommandResponse::queued()))
    } else {
        log::warn!("command queue full, dropped web command {:?}", cmd);
        Json(ApiResponse::ok(CommandResponse::queue_full()))
    }
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 8080).into(),
            cors_permissive: true,
        }
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<O: OutputLatch + Send + 'static>(
    state: Arc<SharedControlPoint<O>>,
    config: &WebServerConfig,
) -> Router {
    let mut router = Router::new()
        .route("/api/status", get(get_status::<O>))
        .route("/api/state", get(get_state::<O>))
        .route("/api/turnout", post(set_turnout::<O>))
        .route("/api/route", post(code_route::<O>))
        .fallback(not_found)
        .with_state(state);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state
///
/// The control loop and any MQTT handler should hold clones of the same
/// `Arc`. This function blocks until the server is shut down.
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(SharedControlPoint::new(control_point));
///
/// // Share state with MQTT
/// let mqtt_handler = MqttHandler::with_shared_state(Arc::clone(&state), mqtt_config);
///
/// // Run web server with same state
/// run_server_with_state(state, web_config).await?;
/// ```
pub async fn run_server_with_state<O: OutputLatch + Send + 'static>(
    state: Arc<SharedControlPoint<O>>,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("Web server listening on http://{}", config.addr);

    axum::serve(listener, router).await
}
