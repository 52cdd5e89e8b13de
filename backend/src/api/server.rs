//! HTTP server for the fabricator API.
//!
//! # API Endpoints
//!
//! | Method | Path                  | Description                              |
//! |--------|-----------------------|------------------------------------------|
//! | GET    | `/healthcheck`        | Health check                             |
//! | POST   | `/workbench/check`    | Validate a JSON array-of-arrays sheet    |
//! | POST   | `/workbench/transform`| Convert a CSV body into the export files |
//! | GET    | `/api/logs`           | SSE stream for real-time logs            |

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, TransformResponse};
use crate::config::Settings;
use crate::error::{ServerError, ServerResult, TransformError};
use crate::transform::Transformer;
use crate::validation::{ErrorReport, Validator};

const EMPTY_BODY: &str = "Request body is empty";
const BAD_PAYLOAD: &str = "Error parsing CSV";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(settings: Settings, client: reqwest::Client) -> Self {
        Self { settings: Arc::new(settings), client }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Transform(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthcheck", get(health))
        .route("/workbench/check", post(check_sheet))
        .route("/workbench/transform", post(transform_sheet))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let client = settings.http_client()?;
    let app = build_router(AppState::new(settings, client));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "fabricator listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers drop the missed entries and keep streaming.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn check_sheet(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ErrorReport>, (StatusCode, &'static str)> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, EMPTY_BODY));
    }

    let rows: Vec<Vec<String>> = serde_json::from_slice(&body).map_err(|e| {
        log_error(format!("{BAD_PAYLOAD}: {e}"));
        (StatusCode::BAD_REQUEST, BAD_PAYLOAD)
    })?;

    let validator = Validator::new(&state.settings, state.client.clone());
    Ok(Json(validator.validate_rows(rows).await))
}

async fn transform_sheet(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<TransformResponse>> {
    if body.is_empty() {
        return Err(ServerError::BadRequest(EMPTY_BODY.to_string()));
    }

    let request_id = Uuid::new_v4();
    log_info(format!("Transform request {request_id} ({} bytes)", body.len()));

    let mut transformer = Transformer::new(&state.settings, state.client.clone());
    let output = transformer.transform_bytes(&body).await.map_err(|e| {
        log_error(format!("Transform request {request_id} failed: {e}"));
        server_error(e)
    })?;

    Ok(Json(TransformResponse::from_output(request_id, &output)?))
}

/// Configuration problems are the server's fault, not the submitter's.
fn server_error(error: TransformError) -> ServerError {
    match error {
        TransformError::Resolver { ref source, .. } if source.is_configuration() => {
            ServerError::Internal(error.to_string())
        }
        other => ServerError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn;
    use serde_json::{json, Value};

    async fn server() -> String {
        let settings = Settings::default();
        let client = reqwest::Client::new();
        spawn(build_router(AppState::new(settings, client))).await
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let base = server().await;
        let response = reqwest::get(format!("{base}/healthcheck")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_check_reports_cells() {
        let base = server().await;
        let payload = json!([
            ["Title", "Object Model", "Full Title", "Make Public (Y/N)"],
            ["foo", "Image", "", "maybe"]
        ]);
        let response = reqwest::Client::new()
            .post(format!("{base}/workbench/check"))
            .json(&payload)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let report: Value = response.json().await.unwrap();
        assert_eq!(report["C2"], "Missing value");
        assert_eq!(report["D2"], "Invalid value. Must be Yes or No");
    }

    #[tokio::test]
    async fn test_check_header_only() {
        let base = server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/workbench/check"))
            .json(&json!([["Title"]]))
            .send()
            .await
            .unwrap();
        let report: Value = response.json().await.unwrap();
        assert_eq!(report, json!({"A": "No rows in CSV to process"}));
    }

    #[tokio::test]
    async fn test_check_rejects_bad_bodies() {
        let base = server().await;
        let client = reqwest::Client::new();

        let empty = client.post(format!("{base}/workbench/check")).send().await.unwrap();
        assert_eq!(empty.status(), 400);
        assert_eq!(empty.text().await.unwrap(), EMPTY_BODY);

        let malformed = client
            .post(format!("{base}/workbench/check"))
            .body("{\"not\": \"rows\"}")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), 400);
        assert_eq!(malformed.text().await.unwrap(), BAD_PAYLOAD);
    }

    #[tokio::test]
    async fn test_transform_returns_files() {
        let base = server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/workbench/transform"))
            .body("Title,Object Model,Full Title\nfoo,bar,Full Test Title\n")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["target"], "target.csv");
        assert_eq!(body["rowCount"], 1);
        assert_eq!(
            body["files"][0]["content"],
            "field_full_title,field_model,title\nFull Test Title,bar,foo\n"
        );
    }

    #[tokio::test]
    async fn test_transform_failure_is_unprocessable() {
        let base = server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/workbench/transform"))
            .body("Title,Make Public (Y/N)\nfoo,Maybe\n")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 422);
        let body: Value = response.json().await.unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("Make Public (Y/N)"));
        assert!(message.contains("Maybe"));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_internal_error() {
        let taxonomy = spawn(Router::new().route(
            "/term_from_term_name",
            get(|| async { Json(json!([])) }),
        ))
        .await;
        let settings = Settings {
            term_lookup_url: taxonomy,
            ..Settings::default()
        };
        let base = spawn(build_router(AppState::new(settings, reqwest::Client::new()))).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/workbench/transform"))
            .body("Contributor\n\"{\"\"name\"\":\"\"relators:cre:person:Doe, Jane\"\"}\"\n")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Internal server error"));
    }
}
