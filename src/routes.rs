//! Request routing. Every handler resolves its own prefix from the request
//! URI and receives the shared state explicitly.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use maud::Markup;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::ServerConfig,
    download,
    error::RequestError,
    listing,
    paths::RelativePath,
    upload::{self, UploadLocks},
    view,
};

pub const BROWSE_PREFIX: &str = "/browse";
pub const UPLOAD_PREFIX: &str = "/upload";
pub const DOWNLOAD_PREFIX: &str = "/download";

// --- State ---
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: ServerConfig,
    pub upload_locks: UploadLocks,
}

impl AppState {
    pub fn new(config: ServerConfig) -> SharedState {
        Arc::new(Self {
            config,
            upload_locks: UploadLocks::new(),
        })
    }
}

/// Builds the application router.
pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/browse", get(browse_handler))
        .route("/browse/", get(browse_handler))
        .route("/browse/*rel_path", get(browse_handler))
        .route("/upload", post(upload_handler))
        .route("/upload/", post(upload_handler))
        .route("/upload/*rel_path", post(upload_handler))
        .route("/download", get(download_handler))
        .route("/download/", get(download_handler))
        .route("/download/*rel_path", get(download_handler))
        // Uploads are streamed to disk, so the body size is not capped.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 302 with a `Location` header. axum's `Redirect` only offers 303/307/308.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn redirect_to_browse(relative: &RelativePath) -> Response {
    found(&format!("{}/{}", BROWSE_PREFIX, relative.to_url_path()))
}

async fn root_handler() -> Response {
    redirect_to_browse(&RelativePath::root())
}

async fn browse_handler(
    State(state): State<SharedState>,
    uri: Uri,
) -> Result<Markup, RequestError> {
    let relative = RelativePath::resolve(uri.path(), BROWSE_PREFIX)?;
    let directory = listing::list(&state.config, &relative).await;
    Ok(view::index_page(&directory))
}

async fn upload_handler(
    State(state): State<SharedState>,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RequestError> {
    let destination = RelativePath::resolve(uri.path(), UPLOAD_PREFIX)?;
    let stored = upload::receive(&state.config, &state.upload_locks, &destination, multipart?).await?;
    info!("Stored {} file(s) in /{}", stored.len(), destination);
    Ok(redirect_to_browse(&destination))
}

async fn download_handler(
    State(state): State<SharedState>,
    uri: Uri,
) -> Result<Response, RequestError> {
    let relative = RelativePath::resolve(uri.path(), DOWNLOAD_PREFIX)?;
    download::serve(&state.config, &relative).await
}
