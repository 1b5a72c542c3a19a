//! HTTP adapter over the media library.
//!
//! | Route                             | Response                                   |
//! |-----------------------------------|--------------------------------------------|
//! | `GET /api/{kind}`                 | the collection as a JSON array             |
//! | `POST /api/refresh`               | `{"status":"success","counts":{..}}`       |
//! | `DELETE /api/{kind}/{filename}`   | `{"status":"deleted"}`, 400 or 404         |
//! | `GET /api/health`                 | counts and folders, without a lazy load    |
//! | `/music`, `/images`, ...          | raw files straight from disk               |
//!
//! Library calls block on the cache lock and on disk, so every handler runs
//! them through `spawn_blocking`.

use crate::cache::CollectionCounts;
use crate::imaging::{ImageBackend, RustBackend};
use crate::library::{LibraryError, MediaLibrary};
use crate::media::MediaKind;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::InvalidFilename(_) => Self::bad_request(err.to_string()),
            LibraryError::NotFound { .. } => Self::not_found(err.to_string()),
            LibraryError::Io(_) => Self::internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!(error = %err, "blocking task failed");
        Self::internal("internal error")
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub struct AppState<B: ImageBackend = RustBackend> {
    pub library: Arc<MediaLibrary<B>>,
}

impl<B: ImageBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            library: Arc::clone(&self.library),
        }
    }
}

#[derive(Serialize)]
struct RefreshResponse {
    status: &'static str,
    counts: CollectionCounts,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    counts: CollectionCounts,
    folders: BTreeMap<MediaKind, String>,
}

/// Full application router: JSON API plus static file mounts.
pub fn router<B>(library: Arc<MediaLibrary<B>>) -> Router
where
    B: ImageBackend + Send + 'static,
{
    let paths = library.paths().clone();
    let api = Router::new()
        .route("/health", get(health::<B>))
        .route("/refresh", post(refresh::<B>))
        .route("/{kind}", get(list::<B>))
        .route("/{kind}/{filename}", delete(remove::<B>))
        .with_state(AppState { library });

    Router::new()
        .nest("/api", api)
        .nest_service("/music", ServeDir::new(&paths.music))
        .nest_service("/images", ServeDir::new(&paths.images))
        .nest_service("/documents", ServeDir::new(&paths.documents))
        .nest_service("/thumbnails", ServeDir::new(&paths.thumbnails))
        .layer(TraceLayer::new_for_http())
}

fn parse_kind(kind: &str) -> AppResult<MediaKind> {
    kind.parse()
        .map_err(|e: crate::media::UnknownKind| AppError::not_found(e.to_string()))
}

async fn list<B: ImageBackend + Send + 'static>(
    State(state): State<AppState<B>>,
    Path(kind): Path<String>,
) -> AppResult<Response> {
    let kind = parse_kind(&kind)?;
    let collection =
        tokio::task::spawn_blocking(move || state.library.list_collection(kind)).await?;
    Ok(Json(collection).into_response())
}

async fn refresh<B: ImageBackend + Send + 'static>(
    State(state): State<AppState<B>>,
) -> AppResult<Json<RefreshResponse>> {
    let counts = tokio::task::spawn_blocking(move || state.library.force_refresh()).await?;
    Ok(Json(RefreshResponse {
        status: "success",
        counts,
    }))
}

async fn remove<B: ImageBackend + Send + 'static>(
    State(state): State<AppState<B>>,
    Path((kind, filename)): Path<(String, String)>,
) -> AppResult<Json<serde_json::Value>> {
    let kind = parse_kind(&kind)?;
    tokio::task::spawn_blocking(move || state.library.remove_file(kind, &filename)).await??;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn health<B: ImageBackend + Send + 'static>(
    State(state): State<AppState<B>>,
) -> AppResult<Json<HealthResponse>> {
    let folders = MediaKind::ALL
        .into_iter()
        .map(|kind| (kind, state.library.dir(kind).display().to_string()))
        .collect();
    let counts = tokio::task::spawn_blocking(move || state.library.counts()).await?;
    Ok(Json(HealthResponse {
        status: "healthy",
        counts,
        folders,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::LibraryFixture;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    fn app(fx: &LibraryFixture) -> (Router, Arc<MediaLibrary<MockBackend>>) {
        let library = Arc::new(fx.mock_library(MockBackend::with_dimensions(640, 480)));
        (router(Arc::clone(&library)), library)
    }

    #[tokio::test]
    async fn lists_documents_as_json() {
        let fx = LibraryFixture::new();
        fx.write(MediaKind::Documents, "report.pdf", b"%PDF");
        let (app, _) = app(&fx);

        let (status, body) = call(app, Method::GET, "/api/documents").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["filename"], "report.pdf");
        assert_eq!(body[0]["type"], "pdf");
        assert_eq!(body[0]["url"], "/documents/report.pdf");
    }

    #[tokio::test]
    async fn unknown_kind_is_404() {
        let fx = LibraryFixture::new();
        let (app, _) = app(&fx);
        let (status, body) = call(app, Method::GET, "/api/videos").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["status"], 404);
    }

    #[tokio::test]
    async fn refresh_reports_counts() {
        let fx = LibraryFixture::new();
        fx.write(MediaKind::Documents, "a.txt", b"a");
        fx.write(MediaKind::Documents, "b.txt", b"b");
        let (app, _) = app(&fx);

        let (status, body) = call(app, Method::POST, "/api/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["counts"]["documents"], 2);
        assert_eq!(body["counts"]["music"], 0);
    }

    #[tokio::test]
    async fn delete_maps_library_errors() {
        let fx = LibraryFixture::new();
        fx.write(MediaKind::Documents, "a.txt", b"a");
        let (app, library) = app(&fx);

        let (status, body) = call(app.clone(), Method::DELETE, "/api/documents/a.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "deleted");
        assert!(library.list_collection(MediaKind::Documents).is_empty());

        let (status, _) = call(app.clone(), Method::DELETE, "/api/documents/a.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(app, Method::DELETE, "/api/documents/..").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_does_not_load_collections() {
        let fx = LibraryFixture::new();
        fx.write(MediaKind::Documents, "a.txt", b"a");
        let (app, library) = app(&fx);

        let (status, body) = call(app, Method::GET, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["counts"]["documents"], 0);
        assert!(body["folders"]["images"].as_str().unwrap().ends_with("images"));
        assert_eq!(library.counts().total(), 0);
    }

    #[tokio::test]
    async fn raw_files_are_served() {
        let fx = LibraryFixture::new();
        fx.write(MediaKind::Documents, "notes.txt", b"hello");
        let (app, _) = app(&fx);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/documents/notes.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hello");
    }
}
