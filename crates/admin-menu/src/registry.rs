//! Module registry - loads module menu manifests.
//!
//! Each module ships a `{name}.menu.toml` manifest that declares:
//! - name (the module key)
//! - weight (registry order, lower = earlier)
//! - presence (a single node, a list of nodes, or none)
//!
//! ```toml
//! name = "blog"
//! weight = 10
//!
//! [[presence]]
//! id = "blog"
//! type = "link"
//! label = "Blog"
//! action = "admin.blog"
//! permissions = ["administer blog"]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::menu::{ModuleSource, RawPresence};

/// Manifest file suffix.
pub const MANIFEST_SUFFIX: &str = ".menu.toml";

/// Menu metadata of one module, parsed from its manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module machine name.
    pub name: String,

    /// Weight for registry order (lower = earlier, default 0).
    #[serde(default)]
    pub weight: i32,

    /// Raw menu presence, in any accepted shape.
    #[serde(default)]
    pub presence: Option<Value>,
}

impl ModuleManifest {
    /// Parse a manifest file.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read module manifest: {}", path.display()))?;

        Self::parse_str(&content, path)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self> {
        let manifest: ModuleManifest = toml::from_str(content).with_context(|| {
            format!("failed to parse module manifest TOML at {}", path.display())
        })?;

        if manifest.name.is_empty() {
            bail!("module manifest at {} has empty 'name' field", path.display());
        }

        Ok(manifest)
    }
}

impl ModuleSource for ModuleManifest {
    fn key(&self) -> &str {
        &self.name
    }

    fn raw_menu_presence(&self) -> Option<RawPresence> {
        self.presence.clone().map(RawPresence::from)
    }
}

/// All module manifests, in registry order.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<ModuleManifest>>,
}

impl ModuleRegistry {
    /// Create a registry from manifests, sorted by weight then name.
    pub fn from_manifests(manifests: Vec<ModuleManifest>) -> Result<Self> {
        let mut seen = HashSet::new();
        for manifest in &manifests {
            if !seen.insert(manifest.name.as_str()) {
                bail!("module '{}' is declared more than once", manifest.name);
            }
        }

        let mut modules: Vec<_> = manifests.into_iter().map(Arc::new).collect();
        modules.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));

        debug!(modules = modules.len(), "built module registry");
        Ok(Self { modules })
    }

    /// Load every `*.menu.toml` manifest in a directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read modules directory: {}", dir.display()))?;

        let mut manifests = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list {}", dir.display()))?
                .path();
            let is_manifest = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(MANIFEST_SUFFIX));
            if is_manifest {
                manifests.push(ModuleManifest::parse(&path)?);
            }
        }

        let registry = Self::from_manifests(manifests)?;
        info!(
            dir = %dir.display(),
            modules = registry.len(),
            "loaded module manifests"
        );
        Ok(registry)
    }

    /// Get a module by name.
    pub fn get(&self, name: &str) -> Option<&ModuleManifest> {
        self.modules.iter().find(|m| m.name == name).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleManifest> {
        self.modules.iter().map(Arc::as_ref)
    }

    /// Shared handles to every module, in registry order.
    pub fn sources(&self) -> Vec<Arc<dyn ModuleSource + Send + Sync>> {
        self.modules
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn ModuleSource + Send + Sync>)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
