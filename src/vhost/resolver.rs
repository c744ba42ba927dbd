//! Request target resolution
//!
//! Maps a validated request onto a file below its virtual host's document
//! root and builds the 200 or 404 answer for it.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder};
use crate::vhost::VirtualHosts;

/// Served in place of a target that names a directory (ends in `/`).
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// A file that exists inside a document root and may be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Absolute, normalized path of the file
    pub path: PathBuf,

    /// Last modification time
    pub modified: SystemTime,

    /// Size in bytes
    pub len: u64,
}

/// Lexically normalizes a path: drops `.`, resolves `..` against the
/// preceding segment and never climbs above the filesystem root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(segment) => out.push(segment),
        }
    }

    out
}

/// Where `target` lives below `root`, or `None` if it would escape it.
///
/// A target ending in `/` gets [`DEFAULT_DOCUMENT`] appended first. The
/// containment test compares whole path components, so `/srv/rootevil` is
/// not considered inside `/srv/root`.
///
/// # Example
///
/// ```
/// # use std::path::Path;
/// # use porter::vhost::document_path;
/// let root = Path::new("/srv/a");
/// assert_eq!(
///     document_path(root, "/docs/").unwrap(),
///     Path::new("/srv/a/docs/index.html")
/// );
/// assert!(document_path(root, "/../../etc/passwd").is_none());
/// ```
pub fn document_path(root: &Path, target: &str) -> Option<PathBuf> {
    let mut target = target.to_string();
    if target.ends_with('/') {
        target.push_str(DEFAULT_DOCUMENT);
    }

    let root = normalize(root);
    let path = normalize(&root.join(target.trim_start_matches('/')));

    (path != root && path.starts_with(&root)).then_some(path)
}

/// Looks up the file a request asks for.
///
/// Unknown hosts, escapes from the document root, missing files and
/// anything that is not a regular file all come back as `None`; callers
/// cannot tell them apart.
pub async fn resolve(request: &Request, hosts: &VirtualHosts) -> Option<ResolvedFile> {
    let Some(root) = hosts.root(request.host()) else {
        tracing::debug!(host = %request.host(), "Unknown virtual host");
        return None;
    };

    let Some(path) = document_path(root, request.target()) else {
        tracing::debug!(
            host = %request.host(),
            target = %request.target(),
            "Target escapes document root"
        );
        return None;
    };

    let meta = tokio::fs::metadata(&path).await.ok()?;
    if !meta.is_file() {
        return None;
    }

    Some(ResolvedFile {
        path,
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        len: meta.len(),
    })
}

/// Resolves a request and builds its 200 or 404 response.
pub async fn respond(request: Request, hosts: &VirtualHosts) -> Response {
    match resolve(&request, hosts).await {
        Some(file) => ResponseBuilder::new(request).ok(file),
        None => ResponseBuilder::new(request).not_found(),
    }
}
