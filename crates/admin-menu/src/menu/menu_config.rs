//! Administrator menu configuration.
//!
//! Loaded from YAML:
//!
//! ```yaml
//! order: [dashboard, content, users]
//! modules:
//!   cron: false                 # hide the module's presence
//!   users:                      # replace it
//!     id: people
//!     type: link
//!     label: People
//!   blog: content               # direct grouping: put it in group "content"
//! layout:                       # explicit nested layout
//!   - dashboard
//!   - id: structure
//!     label: Structure
//!     children: [content, blog]
//! groups:                       # used only when there is no layout
//!   - id: content
//!     label: Content
//! ```
//!
//! Every module entry and layout entry is validated while parsing, so a bad
//! configuration fails before any menu is built.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::grouping::{GroupDeclaration, grouped_layout, validate_assignments};
use super::layout::{LayoutEntry, parse_layout};
use super::modules::{ConfiguredModules, ModuleMenuConfig};
use crate::error::MenuResult;

/// How the configuration arranges modules into the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStrategy {
    /// An explicit nested layout.
    Layout,
    /// Pre-declared groups with modules assigned by name.
    DirectGrouping,
    /// No arrangement: modules in configured order.
    Flat,
}

/// Parsed administrator menu configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuConfig {
    /// Module keys in the order they should appear.
    pub order: Vec<String>,
    /// Per-module configuration.
    pub modules: BTreeMap<String, ModuleMenuConfig>,
    /// Explicit layout, if configured.
    pub layout: Option<Vec<LayoutEntry>>,
    /// Named groups for direct grouping.
    pub groups: Vec<GroupDeclaration>,
}

#[derive(Debug, Deserialize)]
struct RawMenuConfig {
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    modules: BTreeMap<String, Value>,
    #[serde(default)]
    layout: Option<Value>,
    #[serde(default)]
    groups: Vec<GroupDeclaration>,
}

impl MenuConfig {
    /// Load the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read menu config: {}", path.display()))?;

        Self::parse_str(&content)
            .with_context(|| format!("invalid menu config at {}", path.display()))
    }

    /// Parse the configuration from a YAML string.
    pub fn parse_str(content: &str) -> Result<Self> {
        let raw: RawMenuConfig =
            serde_yml::from_str(content).context("failed to parse menu config YAML")?;
        Ok(Self::from_raw(raw)?)
    }

    /// Build the configuration from already-decoded data (e.g. JSON).
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawMenuConfig =
            serde_json::from_value(value).context("failed to decode menu config")?;
        Ok(Self::from_raw(raw)?)
    }

    fn from_raw(raw: RawMenuConfig) -> MenuResult<Self> {
        let mut modules = BTreeMap::new();
        for (module, value) in raw.modules {
            if let Some(config) = ModuleMenuConfig::from_value(&module, value)? {
                modules.insert(module, config);
            }
        }

        let layout = match raw.layout {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_layout(value)?),
        };

        if layout.is_none() {
            validate_assignments(&raw.groups, &modules)?;
        }

        let config = Self {
            order: raw.order,
            modules,
            layout,
            groups: raw.groups,
        };
        debug!(
            strategy = ?config.strategy(),
            modules = config.modules.len(),
            "parsed menu config"
        );
        Ok(config)
    }

    pub fn strategy(&self) -> MenuStrategy {
        if self.layout.is_some() {
            MenuStrategy::Layout
        } else if !self.groups.is_empty() {
            MenuStrategy::DirectGrouping
        } else {
            MenuStrategy::Flat
        }
    }

    /// The layout specification to merge `configured` with.
    pub fn layout_for(&self, configured: &ConfiguredModules) -> MenuResult<Vec<LayoutEntry>> {
        match (&self.layout, self.strategy()) {
            (Some(layout), _) => Ok(layout.clone()),
            (None, MenuStrategy::DirectGrouping) => {
                grouped_layout(&self.groups, &self.modules, configured)
            }
            (None, _) => Ok(Vec::new()),
        }
    }
}
