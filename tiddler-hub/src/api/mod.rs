//! HTTP API layer exposing the tiddler bag in the TiddlyWeb dialect
//! TiddlyWiki's sync adaptor speaks.

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, delete, get, get_service},
    Json, Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tiddler_hub_core::{StoreError, TiddlerBag};
use tower_http::{compression::CompressionLayer, services::ServeFile, trace::TraceLayer};
use tracing::{error, warn};

pub const INDEX_FILE: &str = "index.html";

/// Fixed identity reported to clients; there is no authentication.
pub const STATUS_BODY: &str = r#"{"username": "GUEST", "space": {"recipe": "all"}}"#;

/// Shared application state. The bag itself is stateless, so requests never
/// contend on anything but the filesystem.
#[derive(Clone)]
pub struct AppState {
    pub bag: Arc<TiddlerBag>,
}

/// Error returned to the client as a plain-text body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "bad method")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_client_error() {
            Self::new(StatusCode::BAD_REQUEST, err.to_string())
        } else {
            warn!(error = %err, "store operation failed");
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub fn router(bag: Arc<TiddlerBag>, max_body_bytes: usize) -> Router {
    let index = ServeFile::new(bag.root().join(INDEX_FILE));
    let app_state = AppState { bag };
    Router::new()
        .route("/", get_service(index).fallback(bad_method))
        .route("/status", any(status))
        .route("/health", get(|| async { "OK" }))
        .route(
            "/recipes/all/tiddlers.json",
            get(list_tiddlers).fallback(bad_method),
        )
        .route(
            "/recipes/all/tiddlers/{*title}",
            get(get_tiddler).put(put_tiddler).fallback(bad_method),
        )
        .route(
            "/bags/bag/tiddlers/{*title}",
            delete(delete_tiddler).fallback(bad_method),
        )
        .fallback(unrouted)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Run blocking store work off the async runtime.
async fn with_bag<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&TiddlerBag) -> tiddler_hub_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let bag = state.bag.clone();
    match tokio::task::spawn_blocking(move || f(&bag)).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!(error = %e, "store task failed");
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn status() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], STATUS_BODY)
}

async fn list_tiddlers(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let tiddlers = with_bag(&state, |bag| bag.list()).await?;
    Ok(Json(tiddlers))
}

async fn get_tiddler(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let fields = with_bag(&state, move |bag| bag.get(&title)).await?;
    Ok(Json(Value::Object(fields)))
}

async fn put_tiddler(
    State(state): State<AppState>,
    Path(title): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = with_bag(&state, move |bag| bag.put(&title, &body)).await?;
    Ok([(header::ETAG, outcome.etag)])
}

async fn delete_tiddler(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<StatusCode, ApiError> {
    with_bag(&state, move |bag| bag.delete(&title)).await?;
    Ok(StatusCode::OK)
}

async fn bad_method() -> ApiError {
    ApiError::method_not_allowed()
}

/// Anything outside the routes above: wrong method first, then not found.
async fn unrouted(method: Method) -> ApiError {
    if method == Method::GET || method == Method::HEAD {
        ApiError::not_found()
    } else {
        ApiError::method_not_allowed()
    }
}
