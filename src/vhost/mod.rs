//! Virtual hosts and document resolution
//!
//! This module owns the table mapping `Host` header values to document
//! roots, and the resolver that turns a request target into a file inside
//! the matching root.

pub mod resolver;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use resolver::{DEFAULT_DOCUMENT, ResolvedFile, document_path, resolve, respond};

/// Reasons a virtual host table is rejected at startup.
#[derive(Debug, thiserror::Error)]
pub enum VhostError {
    #[error("no virtual hosts configured")]
    Empty,
    #[error("document root {path:?} for host {host:?} is not accessible: {source}")]
    Inaccessible {
        host: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("document root {path:?} for host {host:?} is not a directory")]
    NotADirectory { host: String, path: PathBuf },
}

/// Read-only mapping from host name to document root.
///
/// Built once before the listener starts and shared behind an `Arc` by
/// every connection; there is no way to modify it afterwards.
#[derive(Debug, Clone)]
pub struct VirtualHosts {
    roots: HashMap<String, PathBuf>,
}

impl VirtualHosts {
    /// Checks that every root exists and is a directory, and stores each in
    /// canonical absolute form.
    pub fn validate<I, H, P>(roots: I) -> Result<Self, VhostError>
    where
        I: IntoIterator<Item = (H, P)>,
        H: Into<String>,
        P: AsRef<Path>,
    {
        let mut validated = HashMap::new();

        for (host, path) in roots {
            let host = host.into();
            let path = path.as_ref();

            let canonical = std::fs::canonicalize(path).map_err(|source| VhostError::Inaccessible {
                host: host.clone(),
                path: path.to_path_buf(),
                source,
            })?;

            if !canonical.is_dir() {
                return Err(VhostError::NotADirectory {
                    host,
                    path: path.to_path_buf(),
                });
            }

            tracing::debug!(host = %host, root = %canonical.display(), "Virtual host registered");
            validated.insert(host, canonical);
        }

        if validated.is_empty() {
            return Err(VhostError::Empty);
        }

        Ok(Self { roots: validated })
    }

    /// The document root for `host`, if the host is known.
    pub fn root(&self, host: &str) -> Option<&Path> {
        self.roots.get(host).map(PathBuf::as_path)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }
}
