#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Fixtures live in `tests/fixtures`: module manifests under `modules/` and
//! menu configurations next to them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::Value;

use trovato_admin_menu::ModuleRegistry;
use trovato_admin_menu::menu::{
    LayoutData, MenuConfig, ModuleSource, PermissionsIndex, Presence, RawPresence, StaticPrincipal,
};
use trovato_test_utils::TestUser;

/// Path to the fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Load the fixture module manifests.
pub fn fixture_registry() -> ModuleRegistry {
    ModuleRegistry::load_dir(&fixtures_dir().join("modules")).expect("fixture modules load")
}

/// Load a fixture menu configuration by file name.
pub fn fixture_config(name: &str) -> MenuConfig {
    MenuConfig::load(&fixtures_dir().join(name)).expect("fixture config loads")
}

/// A module defined inline by its raw presence JSON.
pub struct JsonModule {
    pub key: String,
    pub presence: Option<Value>,
}

impl JsonModule {
    pub fn new(key: &str, presence: Value) -> Self {
        Self {
            key: key.to_string(),
            presence: Some(presence),
        }
    }
}

impl ModuleSource for JsonModule {
    fn key(&self) -> &str {
        &self.key
    }

    fn raw_menu_presence(&self) -> Option<RawPresence> {
        self.presence.clone().map(RawPresence::from)
    }
}

/// Borrow modules as trait objects, keeping their order.
pub fn sources(modules: &[JsonModule]) -> Vec<&dyn ModuleSource> {
    modules.iter().map(|m| m as &dyn ModuleSource).collect()
}

/// The principal matching a test user.
pub fn principal(user: &TestUser) -> StaticPrincipal {
    if user.admin {
        StaticPrincipal::admin()
    } else {
        StaticPrincipal::new(user.permissions.clone())
    }
}

/// Every non-group node, depth first.
pub fn leaves(nodes: &[Presence]) -> Vec<&Presence> {
    let mut out = Vec::new();
    for node in nodes {
        if node.is_group() {
            out.extend(leaves(&node.children));
        } else {
            out.push(node);
        }
    }
    out
}

/// Assert that every indexed path holds only conditional leaves and that
/// every leaf permission is listed.
pub fn assert_index_sound_and_complete(layout: &LayoutData, index: &PermissionsIndex) {
    for path in index.paths() {
        let nodes: &[Presence] = if path.is_root() {
            &layout.tree
        } else {
            let ids: Vec<&str> = path.segments().iter().map(String::as_str).collect();
            &layout.find(&ids).expect("indexed path exists").children
        };
        for leaf in leaves(nodes) {
            assert!(
                !leaf.permissions.is_empty(),
                "unconditional leaf '{}' under indexed path {path}",
                leaf.id
            );
        }
    }

    for leaf in leaves(&layout.tree) {
        for permission in &leaf.permissions {
            assert!(
                index.permissions().contains(permission),
                "permission '{permission}' missing from index"
            );
        }
    }
}

/// Assert that `filtered` is `source` with nodes removed: same fields,
/// sibling order preserved, nothing added.
pub fn assert_filtered_subset(filtered: &[Presence], source: &[Presence]) {
    let mut cursor = 0;
    for node in filtered {
        let offset = source[cursor..]
            .iter()
            .position(|candidate| candidate.id == node.id)
            .unwrap_or_else(|| panic!("node '{}' not in source at this level (or reordered)", node.id));
        let original = &source[cursor + offset];
        cursor += offset + 1;

        assert_eq!(node.kind, original.kind);
        assert_eq!(node.label, original.label);
        assert_eq!(node.permissions, original.permissions);
        assert_eq!(node.action, original.action);
        assert_filtered_subset(&node.children, &original.children);
    }
}
