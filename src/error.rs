//! Error types for startup and per-request failures.

use std::{io, net::SocketAddr, path::PathBuf};

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Fatal errors that stop the server before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("unable to determine current working directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("failed to resolve root directory '{}': {source}", .path.display())]
    RootDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to bind to address {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Errors raised while handling a single request.
///
/// Each one is logged and answered with a short plain-text body; none of them
/// affect other requests.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A path segment would climb out of the served root.
    #[error("path traversal rejected: {0}")]
    Traversal(String),

    /// An uploaded part carried a filename that is not a single path segment.
    #[error("invalid upload filename: {0:?}")]
    InvalidFilename(String),

    /// Missing, or not world-readable.
    #[error("file is not readable: {}", .0.display())]
    NotReadable(PathBuf),

    #[error("request is not a multipart form: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error("unable to read submitted file: {0}")]
    Part(#[from] MultipartError),

    #[error("unable to create file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to save file to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {} for download: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Traversal(_) | Self::InvalidFilename(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Filesystem details stay in the server log.
    fn public_message(&self) -> &'static str {
        match self {
            Self::Traversal(_) | Self::InvalidFilename(_) => "Access denied",
            Self::NotReadable(_) => "File is not readable",
            Self::NotMultipart(_) | Self::Part(_) => "Unable to get file data from request",
            Self::Create { .. } => "Unable to create file on disk",
            Self::Save { .. } => "Unable to save file",
            Self::Open { .. } => "Unable to read file",
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        error!("{}", self);
        (self.status(), self.public_message()).into_response()
    }
}
