//! HTTP transport for the operation dispatcher.
//!
//! Endpoints:
//! - `POST /graphql`: execute an operation request
//! - `GET /health`: liveness probe
//! - `GET /routes/:route_id/positions/stream`: server-sent position updates
//! - `GET /`: redirects to `/graphql`

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::gateway::{OperationDispatcher, OperationRequest, OperationResponse};
use crate::model::DriverPosition;

/// SSE event name for a published position.
pub const POSITION_EVENT: &str = "driverPositionUpdated";

const INVALID_REQUEST_MESSAGE: &str = "Invalid GraphQL request";

/// Shared state for axum handlers.
type AppState = Arc<OperationDispatcher>;

/// Bind `addr` and serve until `shutdown` resolves.
///
/// The actual bound address is logged, so port 0 can be used.
pub async fn serve<F>(
    dispatcher: Arc<OperationDispatcher>,
    addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(dispatcher);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(address = %local, "Driver positions API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Driver positions API stopped");
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(dispatcher: Arc<OperationDispatcher>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/graphql", post(graphql))
        .route("/health", get(health))
        .route("/routes/:route_id/positions/stream", get(position_stream))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> Redirect {
    Redirect::temporary("/graphql")
}

async fn graphql(
    State(dispatcher): State<AppState>,
    payload: Result<Json<OperationRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) if !request.query.trim().is_empty() => request,
        Ok(_) => {
            warn!("Rejected request with empty query");
            return invalid_request();
        }
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed request body");
            return invalid_request();
        }
    };

    let response = dispatcher.execute(&request).await;
    (StatusCode::OK, Json(response)).into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

async fn position_stream(
    State(dispatcher): State<AppState>,
    Path(route_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = dispatcher.topics().subscribe(&route_id).await;
    info!(route_id = %route_id, subscriber_id = %subscription.id(), "Opened position stream");

    let events = subscription.filter_map(|position| async move { position_event(&position) });
    Sse::new(events.map(Ok::<_, Infallible>)).keep_alive(KeepAlive::default())
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}

// ============================================================================
// Helpers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(OperationResponse::error(INVALID_REQUEST_MESSAGE)),
    )
        .into_response()
}

fn position_event(position: &DriverPosition) -> Option<Event> {
    match Event::default().event(POSITION_EVENT).json_data(position) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(route_id = %position.route_id, error = %e, "Failed to encode position event");
            None
        }
    }
}
