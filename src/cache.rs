//! Schema registry cache.
//!
//! Registries are cached per canonicalized schema path and shared behind
//! a read-mostly lock: readers proceed concurrently on cache hits, while
//! a single builder populates a missing entry under the write lock, so a
//! given schema is parsed at most once even when several threads request
//! it at the same time. Schema files are assumed immutable for the
//! process lifetime; `invalidate` and `clear` are the explicit escape
//! hatches for reconfiguration.

use proto_codec::{load_schema, Error};
use proto_types::SchemaRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Cache of loaded schema registries, keyed by canonical schema path.
#[derive(Debug, Default)]
pub struct SchemaCache {
    registries: RwLock<HashMap<PathBuf, Arc<SchemaRegistry>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the registry for a schema path, loading it on first use.
    pub fn load(&self, path: &Path) -> Result<Arc<SchemaRegistry>, Error> {
        let key = path.canonicalize().map_err(|e| Error::SchemaRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        {
            let registries = self.registries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(registry) = registries.get(&key) {
                return Ok(Arc::clone(registry));
            }
        }

        let mut registries = self.registries.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have built the entry while we waited.
        if let Some(registry) = registries.get(&key) {
            return Ok(Arc::clone(registry));
        }

        debug!("loading schema registry for {}", key.display());
        let registry = Arc::new(load_schema(&key)?);
        registries.insert(key, Arc::clone(&registry));
        Ok(registry)
    }

    /// Drop the cached registry for one schema path.
    pub fn invalidate(&self, path: &Path) {
        let Ok(key) = path.canonicalize() else {
            return;
        };
        self.registries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    /// Drop every cached registry.
    pub fn clear(&self) {
        self.registries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
