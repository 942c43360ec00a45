//! Base-model resolution.
//!
//! Training starts from a named base model. The resolver turns that
//! name into a local directory, caching fetched models under the data
//! root so repeat jobs against the same base skip the fetch. A cached
//! copy can go stale or get corrupted, so callers can force a fresh
//! fetch as a fallback.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use veridex_core::error::{CoreError, CoreResult};

/// Turns a base-model identifier into a usable local directory.
pub trait BaseModelResolver: Send + Sync {
    /// Resolve `id`, reusing a cached copy when one exists.
    fn resolve(&self, id: &str) -> CoreResult<PathBuf>;

    /// Resolve `id`, discarding any cached copy first.
    fn resolve_fresh(&self, id: &str) -> CoreResult<PathBuf>;
}

/// Resolver backed by a local registry directory.
///
/// "Fetching" is a recursive copy from the registry into the cache,
/// which keeps the cache semantics (and failure modes) of a remote
/// fetch without needing the network.
pub struct LocalRegistryResolver {
    registry_dir: PathBuf,
    cache_dir: PathBuf,
}

/// Base-model identifiers may contain `/` (org-qualified names); flatten
/// them for use as a directory name.
pub fn sanitize_id(id: &str) -> String {
    id.replace('/', "_")
}

impl LocalRegistryResolver {
    pub fn new(registry_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry_dir: registry_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    fn cached_path(&self, id: &str) -> PathBuf {
        self.cache_dir.join(sanitize_id(id))
    }

    fn fetch(&self, id: &str) -> CoreResult<PathBuf> {
        let source = self.registry_dir.join(sanitize_id(id));
        if !source.is_dir() {
            return Err(CoreError::NotFound {
                entity: "base model",
                code: id.to_string(),
            });
        }

        let target = self.cached_path(id);
        fs::create_dir_all(&self.cache_dir)?;
        if let Err(err) = copy_dir(&source, &target) {
            // A partial copy must not be mistaken for a cached model.
            if let Err(cleanup) = fs::remove_dir_all(&target) {
                warn!(%cleanup, path = %target.display(), "failed to clean up partial fetch");
            }
            return Err(err.into());
        }
        info!(id, path = %target.display(), "fetched base model");
        Ok(target)
    }
}

impl BaseModelResolver for LocalRegistryResolver {
    fn resolve(&self, id: &str) -> CoreResult<PathBuf> {
        let cached = self.cached_path(id);
        if cached.is_dir() {
            return Ok(cached);
        }
        self.fetch(id)
    }

    fn resolve_fresh(&self, id: &str) -> CoreResult<PathBuf> {
        let cached = self.cached_path(id);
        if cached.is_dir() {
            fs::remove_dir_all(&cached)?;
        }
        self.fetch(id)
    }
}

fn copy_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
