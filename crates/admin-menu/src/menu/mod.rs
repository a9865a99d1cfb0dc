//! Administrative menu assembly and filtering.
//!
//! The menu is built in one direction:
//! - module presences are collected, configured and normalized
//!   ([`ModulePresenceInterpreter`]);
//! - they are merged with the administrator layout ([`interpret_layout`]);
//! - the finalized tree is indexed by permission ([`build_permissions_index`])
//!   and filtered per request ([`filter_layout`]).
//!
//! Building is deterministic, so the compiled menu can be cached and shared
//! by every request until the module set or configuration changes.

mod grouping;
mod layout;
mod menu_config;
mod modules;
mod permissions;
mod presence;
mod view;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use grouping::{GroupDeclaration, grouped_layout};
pub use layout::{GroupSpec, LayoutData, LayoutEntry, interpret_layout, parse_layout};
pub use menu_config::{MenuConfig, MenuStrategy};
pub use modules::{
    ConfiguredModules, ModuleEntry, ModuleMenuConfig, ModulePresenceInterpreter, ModulePresences,
    ModuleSource,
};
pub use permissions::{
    FilterOptions, MenuPath, PermissionsIndex, Principal, StaticPrincipal, build_permissions_index,
    filter_layout,
};
pub use presence::{Presence, PresenceKind, RawPresence, normalize};
pub use view::MenuNodeView;

use crate::error::MenuResult;

/// Build the finalized menu from active modules and the configuration.
pub fn build_menu(modules: &[&dyn ModuleSource], config: &MenuConfig) -> MenuResult<LayoutData> {
    let configured = ModulePresenceInterpreter::new(&config.order, &config.modules).interpret(modules)?;
    let spec = config.layout_for(&configured)?;
    interpret_layout(&spec, configured)
}

/// A finalized menu together with its permissions index.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledMenu {
    pub layout: LayoutData,
    pub index: PermissionsIndex,
}

impl CompiledMenu {
    /// Build and index the menu.
    pub fn build(modules: &[&dyn ModuleSource], config: &MenuConfig) -> MenuResult<Arc<Self>> {
        let layout = build_menu(modules, config)?;
        let index = build_permissions_index(&layout);

        info!(
            top_level = layout.len(),
            conditional_groups = index.len(),
            permissions = index.permissions().len(),
            "compiled admin menu"
        );

        Ok(Arc::new(Self { layout, index }))
    }

    /// The menu as visible to `principal`.
    pub fn filter_for(
        &self,
        principal: Option<&dyn Principal>,
        options: FilterOptions,
    ) -> MenuResult<LayoutData> {
        filter_layout(&self.layout, principal, Some(&self.index), options)
    }
}
