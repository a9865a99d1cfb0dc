//! Compiled menu cache.
//!
//! Compiled menus are keyed by a fingerprint of everything they are built
//! from (module keys, raw presences, menu configuration), so a changed module
//! set or configuration never hits a stale entry.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{MenuError, MenuResult};
use crate::menu::{CompiledMenu, MenuConfig, ModuleSource, RawPresence};

/// Default maximum number of compiled menus kept.
pub const DEFAULT_CAPACITY: u64 = 64;

/// Default time-to-live of a compiled menu (1 hour).
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// In-process cache of compiled menus.
#[derive(Clone)]
pub struct MenuCache {
    inner: Cache<String, Arc<CompiledMenu>>,
}

impl MenuCache {
    /// Create a cache with the given capacity and time-to-live.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { inner }
    }

    /// Get a compiled menu by fingerprint.
    pub fn get(&self, fingerprint: &str) -> Option<Arc<CompiledMenu>> {
        let hit = self.inner.get(fingerprint);
        debug!(fingerprint = %fingerprint, hit = hit.is_some(), "menu cache lookup");
        hit
    }

    /// Store a compiled menu.
    pub fn insert(&self, fingerprint: String, menu: Arc<CompiledMenu>) {
        self.inner.insert(fingerprint, menu);
    }

    /// Get a compiled menu, building and storing it on a miss.
    ///
    /// Concurrent misses on one fingerprint run `build` once; the other
    /// callers wait for its result.
    pub fn get_or_build<F>(&self, fingerprint: &str, build: F) -> MenuResult<Arc<CompiledMenu>>
    where
        F: FnOnce() -> MenuResult<Arc<CompiledMenu>>,
    {
        self.inner
            .try_get_with(fingerprint.to_string(), build)
            .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(MenuError::SharedBuild))
    }

    /// Drop a single compiled menu.
    pub fn invalidate(&self, fingerprint: &str) {
        self.inner.invalidate(fingerprint);
    }

    /// Drop every compiled menu.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        debug!("menu cache cleared");
    }

    /// Number of cached menus (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for MenuCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

#[derive(Serialize)]
struct FingerprintModule<'a> {
    key: &'a str,
    presence: Option<RawPresence>,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    modules: Vec<FingerprintModule<'a>>,
    config: &'a MenuConfig,
}

/// Hex SHA-256 over the modules (in the given order) and the configuration.
pub fn fingerprint(modules: &[&dyn ModuleSource], config: &MenuConfig) -> MenuResult<String> {
    let input = FingerprintInput {
        modules: modules
            .iter()
            .map(|m| FingerprintModule {
                key: m.key(),
                presence: m.raw_menu_presence(),
            })
            .collect(),
        config,
    };

    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, &input)?;
    Ok(hex::encode(hasher.finalize()))
}
