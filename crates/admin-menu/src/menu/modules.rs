//! Module presence interpreter.
//!
//! Collects the raw menu presence of every active module, applies the
//! per-module configuration (disable, override, group assignment), sorts
//! modules by the configured order and splits the normalized nodes into
//! standard and alternative presences keyed by module.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::presence::{Presence, RawPresence, describe, normalize};
use crate::error::{MenuError, MenuResult};

/// A module that may contribute entries to the administrative menu.
pub trait ModuleSource {
    /// Stable module key (e.g. "blog").
    fn key(&self) -> &str;

    /// The module's own presence data, unnormalized.
    fn raw_menu_presence(&self) -> Option<RawPresence>;
}

/// Administrator configuration for one module's menu presence.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleMenuConfig {
    /// `false`: the module contributes nothing.
    Disabled,
    /// A mapping of presence fields that replaces the module's own presence.
    Override(Map<String, Value>),
    /// A group name, used by the direct-grouping mode. The module's own
    /// presence is kept.
    Group(String),
}

impl ModuleMenuConfig {
    /// Parse one `modules` entry. `null` means "not configured".
    pub fn from_value(module: &str, value: Value) -> MenuResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(false) => Ok(Some(ModuleMenuConfig::Disabled)),
            Value::Object(fields) => Ok(Some(ModuleMenuConfig::Override(fields))),
            Value::String(group) => Ok(Some(ModuleMenuConfig::Group(group))),
            other => Err(MenuError::invalid_config(
                module,
                format!(
                    "expected false, a presence mapping or a group name, got {}",
                    describe(&other)
                ),
            )),
        }
    }

    /// The group this module is assigned to, if any.
    pub fn group(&self) -> Option<&str> {
        match self {
            ModuleMenuConfig::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl Serialize for ModuleMenuConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModuleMenuConfig::Disabled => serializer.serialize_bool(false),
            ModuleMenuConfig::Override(fields) => fields.serialize(serializer),
            ModuleMenuConfig::Group(group) => serializer.serialize_str(group),
        }
    }
}

/// Presences contributed by one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub module: String,
    pub presences: Vec<Presence>,
}

/// Ordered mapping of module key to the presences it contributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePresences {
    entries: Vec<ModuleEntry>,
}

impl ModulePresences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append presences for a module, extending an existing entry.
    pub fn insert(&mut self, module: &str, presences: Vec<Presence>) {
        match self.entries.iter_mut().find(|e| e.module == module) {
            Some(entry) => entry.presences.extend(presences),
            None => self.entries.push(ModuleEntry {
                module: module.to_string(),
                presences,
            }),
        }
    }

    pub fn get(&self, module: &str) -> Option<&[Presence]> {
        self.entries
            .iter()
            .find(|e| e.module == module)
            .map(|e| e.presences.as_slice())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.entries.iter().any(|e| e.module == module)
    }

    /// Remove a module's entry, keeping the order of the rest.
    pub fn remove(&mut self, module: &str) -> Option<Vec<Presence>> {
        let pos = self.entries.iter().position(|e| e.module == module)?;
        Some(self.entries.remove(pos).presences)
    }

    /// Module keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.module.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ModulePresences {
    type Item = ModuleEntry;
    type IntoIter = std::vec::IntoIter<ModuleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Output of the module presence interpreter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredModules {
    /// Presences for the main menu tree.
    pub standard: ModulePresences,
    /// Presences of other kinds, surfaced outside the main tree.
    pub alternative: ModulePresences,
}

/// Turns active modules plus per-module configuration into
/// [`ConfiguredModules`].
#[derive(Debug, Clone, Copy)]
pub struct ModulePresenceInterpreter<'a> {
    order: &'a [String],
    config: &'a BTreeMap<String, ModuleMenuConfig>,
}

impl<'a> ModulePresenceInterpreter<'a> {
    /// Create an interpreter for the given configured order and module
    /// configuration.
    pub fn new(order: &'a [String], config: &'a BTreeMap<String, ModuleMenuConfig>) -> Self {
        Self { order, config }
    }

    /// Interpret modules given in natural registry order.
    pub fn interpret(&self, modules: &[&dyn ModuleSource]) -> MenuResult<ConfiguredModules> {
        let mut configured = ConfiguredModules::default();

        for module in self.sorted(modules) {
            let key = module.key();
            let raw = match self.config.get(key) {
                Some(ModuleMenuConfig::Disabled) => {
                    debug!(module = %key, "menu presence disabled by configuration");
                    continue;
                }
                Some(ModuleMenuConfig::Override(fields)) => {
                    Some(RawPresence::Fields(fields.clone()))
                }
                Some(ModuleMenuConfig::Group(_)) | None => module.raw_menu_presence(),
            };

            let Some(raw) = raw else {
                continue;
            };

            let (standard, alternative): (Vec<_>, Vec<_>) = normalize(raw, key)?
                .into_iter()
                .partition(|node| node.kind.is_standard());

            if !standard.is_empty() {
                configured.standard.insert(key, standard);
            }
            if !alternative.is_empty() {
                configured.alternative.insert(key, alternative);
            }
        }

        debug!(
            standard = configured.standard.len(),
            alternative = configured.alternative.len(),
            "interpreted module presences"
        );

        Ok(configured)
    }

    /// Configured modules first, in configured order; the rest keep
    /// registry order.
    fn sorted<'m>(&self, modules: &[&'m dyn ModuleSource]) -> Vec<&'m dyn ModuleSource> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (pos, key) in self.order.iter().enumerate() {
            positions.entry(key.as_str()).or_insert(pos);
        }

        let mut sorted = modules.to_vec();
        sorted.sort_by_key(|m| positions.get(m.key()).copied().unwrap_or(usize::MAX));
        sorted
    }
}
