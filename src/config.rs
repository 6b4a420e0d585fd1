use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Component, Path, PathBuf},
};

use clap::Parser;

use crate::{
    error::StartupError,
    paths::{validate_segment, RelativePath},
};

pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Bytes of an upload held in memory before they are flushed to disk.
pub const DEFAULT_UPLOAD_BUFFER: usize = 10 * 1024 * 1024;

// --- Command line ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Share a folder over HTTP on the local network", long_about = None)]
pub struct Args {
    /// Folder to serve (defaults to the current working directory)
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Port to serve the HTTP endpoint on
    #[arg(short, long, value_name = "PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, value_name = "ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Upload bytes staged in memory before writing to disk
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_UPLOAD_BUFFER)]
    pub upload_buffer: usize,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything a handler needs to know about the server, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    root: PathBuf,
    root_label: String,
    listen_addr: SocketAddr,
    upload_buffer: usize,
}

impl ServerConfig {
    /// Canonicalizes `root` and checks that it is a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StartupError> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|source| StartupError::RootDir {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(StartupError::NotADirectory(root));
        }

        let root_label = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            root,
            root_label,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_LISTEN_PORT),
            upload_buffer: DEFAULT_UPLOAD_BUFFER,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, StartupError> {
        let root = match &args.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(StartupError::CurrentDir)?,
        };
        Ok(Self::new(root)?
            .with_listen_addr(SocketAddr::new(args.bind, args.port))
            .with_upload_buffer(args.upload_buffer))
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_upload_buffer(mut self, bytes: usize) -> Self {
        self.upload_buffer = bytes.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Basename of the root, shown as the first breadcrumb.
    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn upload_buffer(&self) -> usize {
        self.upload_buffer
    }

    /// Filesystem location of `relative` under the served root.
    pub fn absolute(&self, relative: &RelativePath) -> PathBuf {
        let mut path = self.root.clone();
        for segment in relative.segments() {
            path.push(segment);
        }
        path
    }

    /// Inverse of [`Self::absolute`]; `None` for paths outside the root or
    /// with components that cannot appear in a URL.
    pub fn relative_to_root(&self, path: &Path) -> Option<RelativePath> {
        let rest = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in rest.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str()?;
                    validate_segment(name).ok()?;
                    segments.push(name.to_string());
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(RelativePath::from_segments(segments))
    }
}
