//! Menu service - owns the inputs of the admin menu and serves it per user.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{MenuCache, fingerprint};
use crate::error::MenuResult;
use crate::menu::{
    CompiledMenu, FilterOptions, LayoutData, MenuConfig, ModulePresences, ModuleSource, Principal,
};

/// Builds, caches and filters the administrative menu.
#[derive(Clone)]
pub struct MenuService {
    inner: Arc<MenuServiceInner>,
}

struct MenuServiceInner {
    config: MenuConfig,
    modules: Vec<Arc<dyn ModuleSource + Send + Sync>>,
    cache: MenuCache,
    options: FilterOptions,
}

impl MenuService {
    /// Create a service over the given configuration and modules (in
    /// registry order).
    pub fn new(
        config: MenuConfig,
        modules: Vec<Arc<dyn ModuleSource + Send + Sync>>,
        cache: MenuCache,
    ) -> Self {
        Self::with_options(config, modules, cache, FilterOptions::default())
    }

    /// Create a service with explicit filter options.
    pub fn with_options(
        config: MenuConfig,
        modules: Vec<Arc<dyn ModuleSource + Send + Sync>>,
        cache: MenuCache,
        options: FilterOptions,
    ) -> Self {
        Self {
            inner: Arc::new(MenuServiceInner {
                config,
                modules,
                cache,
                options,
            }),
        }
    }

    pub fn config(&self) -> &MenuConfig {
        &self.inner.config
    }

    /// The compiled menu, from cache when the inputs are unchanged.
    pub fn compiled(&self) -> MenuResult<Arc<CompiledMenu>> {
        let sources: Vec<&dyn ModuleSource> = self
            .inner
            .modules
            .iter()
            .map(|m| m.as_ref() as &dyn ModuleSource)
            .collect();

        let key = fingerprint(&sources, &self.inner.config)?;
        self.inner.cache.get_or_build(&key, || {
            info!(fingerprint = %key, "building admin menu");
            CompiledMenu::build(&sources, &self.inner.config)
        })
    }

    /// The menu as visible to `principal` (`None` = anonymous).
    pub fn menu_for(&self, principal: Option<&dyn Principal>) -> MenuResult<LayoutData> {
        let compiled = self.compiled()?;
        let filtered = compiled.filter_for(principal, self.inner.options)?;
        debug!(top_level = filtered.len(), "served admin menu");
        Ok(filtered)
    }

    /// Alternative presences (e.g. for the user profile menu).
    pub fn alternative(&self) -> MenuResult<ModulePresences> {
        Ok(self.compiled()?.layout.alternative.clone())
    }

    /// Forget every compiled menu; the next request rebuilds.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }
}
