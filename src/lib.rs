//! Share a directory over HTTP: browse, download and upload files from any
//! machine on the local network.

pub mod config;
pub mod download;
pub mod error;
pub mod listing;
pub mod paths;
pub mod routes;
pub mod size;
pub mod upload;
pub mod view;

pub use config::{Args, ServerConfig};
pub use error::{RequestError, StartupError};
pub use routes::{app, AppState, SharedState};
