//! Mapping between request URLs, relative paths and the filesystem.
//!
//! A [`RelativePath`] is the only way handlers address files. It is built from
//! the URL by stripping the route prefix and validating each segment, so by
//! construction it can never climb out of the served root. Joining onto the
//! root happens segment by segment in [`crate::config::ServerConfig::absolute`].

use std::fmt;

use serde::Serialize;

use crate::error::RequestError;

/// Slash-separated path below the served root, e.g. `photos/2024`.
///
/// Invariants: no empty, `.` or `..` segments; no segment contains `/`, `\`
/// or a NUL byte. The root itself is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct RelativePath {
    segments: Vec<String>,
}

impl RelativePath {
    /// The served root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Strips `route_prefix` from a raw URL path and parses the remainder.
    ///
    /// The remainder is percent-decoded before validation, so `%2e%2e` is
    /// rejected the same way as a literal `..`.
    pub fn resolve(url_path: &str, route_prefix: &str) -> Result<Self, RequestError> {
        let remainder = url_path.strip_prefix(route_prefix).unwrap_or(url_path);
        let remainder = remainder.trim_start_matches('/');
        let decoded = urlencoding::decode(remainder)
            .map_err(|_| RequestError::Traversal(remainder.to_string()))?;
        Self::parse(&decoded)
    }

    /// Parses an already-decoded relative path.
    pub fn parse(path: &str) -> Result<Self, RequestError> {
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(RequestError::Traversal(path.to_string())),
                s if s.contains(['\\', '\0']) => {
                    return Err(RequestError::Traversal(path.to_string()))
                }
                s => segments.push(s.to_string()),
            }
        }
        Ok(Self { segments })
    }

    /// Appends a single entry name, e.g. a directory child or an upload filename.
    pub fn child(&self, name: &str) -> Result<Self, RequestError> {
        validate_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Root label followed by every segment, for the path header on a listing.
    pub fn breadcrumbs(&self, root_label: &str) -> Vec<String> {
        std::iter::once(root_label.to_string())
            .chain(self.segments.iter().cloned())
            .collect()
    }

    /// Percent-encoded form for hrefs and `Location` headers.
    pub fn to_url_path(&self) -> String {
        self.segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// The first `depth` segments, used to link each breadcrumb.
    pub fn ancestor(&self, depth: usize) -> Self {
        Self {
            segments: self.segments.iter().take(depth).cloned().collect(),
        }
    }

    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

/// Checks that `name` is exactly one normal path segment.
pub fn validate_segment(name: &str) -> Result<(), RequestError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(RequestError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.to_string()
    }
}
