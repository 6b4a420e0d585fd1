use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::{
    config::ServerConfig, error::RequestError, listing::is_path_visible, paths::RelativePath,
    routes::redirect_to_browse,
};

/// Streams the file at `relative`, refusing anything that is not
/// world-readable or that sits below a directory that is not. Directories
/// redirect to their listing.
pub async fn serve(config: &ServerConfig, relative: &RelativePath) -> Result<Response, RequestError> {
    let path_to_serve = config.absolute(relative);

    // Every segment, the target included, must pass the lstat gate.
    if !is_path_visible(config, relative).await {
        return Err(RequestError::NotReadable(path_to_serve));
    }

    let metadata = tokio::fs::metadata(&path_to_serve)
        .await
        .map_err(|source| RequestError::Open {
            path: path_to_serve.clone(),
            source,
        })?;
    if metadata.is_dir() {
        return Ok(redirect_to_browse(relative));
    }

    let file = tokio::fs::File::open(&path_to_serve)
        .await
        .map_err(|source| RequestError::Open {
            path: path_to_serve.clone(),
            source,
        })?;

    info!("Serving file: {}", path_to_serve.display());

    let filename = path_to_serve
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download");
    let mime_type = mime_guess::from_path(&path_to_serve)
        .first_or_octet_stream()
        .to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            filename.replace(['"', '\\'], "_")
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}
