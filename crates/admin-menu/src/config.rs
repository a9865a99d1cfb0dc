//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL_SECS};

/// Process settings for the menu tooling.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the administrator menu YAML (default: ./config/admin_menu.yml).
    pub menu_config: PathBuf,

    /// Directory holding `*.menu.toml` module manifests (default: ./modules).
    pub modules_dir: PathBuf,

    /// Maximum number of cached compiled menus (default: 64).
    pub cache_capacity: u64,

    /// Time-to-live of a cached compiled menu (default: 3600s).
    pub cache_ttl: Duration,

    /// Serve the unfiltered menu to anonymous requests (default: false).
    pub bypass_anonymous: bool,
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self> {
        let menu_config = env::var("MENU_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./config/admin_menu.yml"));

        let modules_dir = env::var("MENU_MODULES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./modules"));

        let cache_capacity = env::var("MENU_CACHE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_CAPACITY.to_string())
            .parse()
            .context("MENU_CACHE_CAPACITY must be a valid u64")?;

        let cache_ttl_secs: u64 = env::var("MENU_CACHE_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_TTL_SECS.to_string())
            .parse()
            .context("MENU_CACHE_TTL_SECS must be a valid u64")?;

        let bypass_anonymous = env::var("MENU_BYPASS_ANONYMOUS")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .context("MENU_BYPASS_ANONYMOUS must be true or false")?;

        Ok(Self {
            menu_config,
            modules_dir,
            cache_capacity,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            bypass_anonymous,
        })
    }
}
