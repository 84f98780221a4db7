//! Registry of files currently being processed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;

/// Concurrent set of claimed paths. Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct InUseRegistry {
    paths: Arc<DashSet<PathBuf>>,
}

impl InUseRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim a path.
    ///
    /// Returns `None` if the path is already claimed. The path stays claimed
    /// until the returned guard is released or dropped.
    #[must_use]
    pub fn try_claim(&self, path: impl Into<PathBuf>) -> Option<Claim> {
        let path = path.into();
        if self.paths.insert(path.clone()) {
            Some(Claim {
                registry: self.clone(),
                path,
            })
        } else {
            None
        }
    }

    /// Check whether a path is claimed.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Number of claimed paths.
    #[must_use]
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    fn release(&self, path: &Path) {
        self.paths.remove(path);
    }
}

/// Exclusive claim on one path; releases it on drop.
#[derive(Debug)]
pub struct Claim {
    registry: InUseRegistry,
    path: PathBuf,
}

impl Claim {
    /// The claimed path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the claim now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.registry.release(&self.path);
    }
}
