//! Replace-on-miss disk cache.

use std::fs;
use std::path::{Path, PathBuf};

use pmvconnect::{ConnectionError, ServerLink};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CoverError {
    #[error(transparent)]
    Remote(#[from] ConnectionError),

    #[error("cover cache I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk thumbnail cache, namespaced per server identity.
///
/// A miss triggers exactly one remote fetch; the bytes land in a sibling
/// temp file and are renamed into place, so a partially written cover is
/// never served. Concurrent misses for one path race to write idempotent
/// bytes, which the rename keeps harmless.
pub struct CoverCache {
    root: PathBuf,
}

impl CoverCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic cache location for a remote thumbnail path.
    /// Substituting the separator keeps distinct paths distinct on disk.
    pub fn cached_path(&self, server_name: &str, remote_path: &str) -> PathBuf {
        self.root
            .join(server_name)
            .join(remote_path.replace('/', "+"))
    }

    /// Returns the local file for `remote_path`, downloading it on miss.
    pub fn fetch(
        &self,
        server: &dyn ServerLink,
        remote_path: &str,
    ) -> Result<PathBuf, CoverError> {
        let file = self.cached_path(server.identity_name(), remote_path);
        if file.is_file() {
            debug!(path = %file.display(), "cover cache hit");
            return Ok(file);
        }

        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)?;
        }

        let bytes = server.fetch_bytes(remote_path)?;

        let mut tmp = file.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &file)?;

        info!(path = %file.display(), bytes = bytes.len(), "cover cached");
        Ok(file)
    }

    /// Drops every cover cached for one server.
    pub fn clear_server(&self, server_name: &str) -> Result<(), CoverError> {
        let dir = self.root.join(server_name);
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
