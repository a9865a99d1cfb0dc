//! Layout interpreter - merges the administrator layout with module presences.
//!
//! The layout is a nested list whose entries are either module keys
//! (placeholders for that module's standard presences) or inline groups.
//! Interpretation runs in three passes:
//!
//! 1. build group nodes bottom-up, leaving module keys as placeholders;
//! 2. splice each module's presences in place of its placeholder, then append
//!    every module the layout never mentioned;
//! 3. prune groups left without any non-group descendant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::modules::{ConfiguredModules, ModulePresences};
use super::permissions::MenuPath;
use super::presence::{Presence, describe};
use super::view::MenuNodeView;
use crate::error::{MenuError, MenuResult};

/// One entry of the administrator layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayoutEntry {
    /// Placeholder for a module's standard presences.
    Module(String),
    /// An inline group.
    Group(GroupSpec),
}

/// Inline group description in the layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_translated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub children: Vec<LayoutEntry>,
}

impl GroupSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>, children: Vec<LayoutEntry>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            label_translated: None,
            icon: None,
            children,
        }
    }
}

impl LayoutEntry {
    pub fn module(key: impl Into<String>) -> Self {
        LayoutEntry::Module(key.into())
    }

    /// Parse a layout entry from configuration data.
    pub fn from_value(value: Value) -> MenuResult<Self> {
        let mut fields = match value {
            Value::String(key) => return Ok(LayoutEntry::Module(key)),
            Value::Object(fields) => fields,
            other => {
                return Err(MenuError::InvalidLayoutEntry {
                    details: format!("expected a module key or a group, got {}", describe(&other)),
                });
            }
        };

        let mut string_field = |name: &str| -> MenuResult<Option<String>> {
            match fields.remove(name) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s)),
                Some(other) => Err(MenuError::InvalidLayoutEntry {
                    details: format!("group field '{name}' must be a string, got {}", describe(&other)),
                }),
            }
        };

        let id = string_field("id")?.ok_or_else(|| MenuError::InvalidLayoutEntry {
            details: "group is missing 'id'".to_string(),
        })?;
        let label = string_field("label")?.unwrap_or_else(|| id.clone());
        let label_translated = string_field("labelTranslated")?;
        let icon = string_field("icon")?;

        let children = match fields.remove("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => parse_layout(value)?,
        };

        Ok(LayoutEntry::Group(GroupSpec {
            id,
            label,
            label_translated,
            icon,
            children,
        }))
    }
}

/// Parse a whole layout specification (a list of entries).
pub fn parse_layout(value: Value) -> MenuResult<Vec<LayoutEntry>> {
    match value {
        Value::Array(entries) => entries.into_iter().map(LayoutEntry::from_value).collect(),
        other => Err(MenuError::InvalidLayoutEntry {
            details: format!("layout children must be a list, got {}", describe(&other)),
        }),
    }
}

/// The finalized menu: the ordered top-level tree plus the alternative
/// presences carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    pub tree: Vec<Presence>,
    pub alternative: ModulePresences,
}

impl LayoutData {
    /// Get a top-level node by id.
    pub fn get(&self, id: &str) -> Option<&Presence> {
        self.tree.iter().find(|node| node.id == id)
    }

    /// Follow a path of ids from the top level.
    pub fn find(&self, path: &[&str]) -> Option<&Presence> {
        let (first, rest) = path.split_first()?;
        let mut node = self.get(first)?;
        for id in rest {
            node = node.children.iter().find(|child| child.id == *id)?;
        }
        Some(node)
    }

    /// Top-level ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tree.iter().map(|node| node.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// JSON projection handed to API consumers.
    pub fn to_view(&self) -> Vec<MenuNodeView> {
        self.tree.iter().map(MenuNodeView::from).collect()
    }
}

/// Intermediate tree after the first pass.
#[derive(Debug)]
enum Draft {
    Placeholder(String),
    Group { node: Presence, children: Vec<Draft> },
}

/// Merge a layout specification with the interpreted module presences.
pub fn interpret_layout(
    entries: &[LayoutEntry],
    modules: ConfiguredModules,
) -> MenuResult<LayoutData> {
    let ConfiguredModules {
        mut standard,
        alternative,
    } = modules;

    let drafts = build_drafts(entries);

    let mut referenced = HashSet::new();
    let mut tree = resolve(drafts, &mut standard, &mut referenced)?;

    let unreferenced = standard.len();
    for entry in standard {
        debug!(module = %entry.module, "appending module missing from layout");
        tree.extend(entry.presences);
    }

    let mut pruned = 0;
    let tree = prune(tree, &MenuPath::root(), &mut pruned)?;

    debug!(
        referenced = referenced.len(),
        appended = unreferenced,
        pruned_groups = pruned,
        top_level = tree.len(),
        "interpreted menu layout"
    );

    Ok(LayoutData { tree, alternative })
}

/// First pass: groups become presence nodes, children built first.
fn build_drafts(entries: &[LayoutEntry]) -> Vec<Draft> {
    entries
        .iter()
        .map(|entry| match entry {
            LayoutEntry::Module(key) => Draft::Placeholder(key.clone()),
            LayoutEntry::Group(group) => {
                let children = build_drafts(&group.children);
                let mut node = Presence::group(&group.id, &group.label);
                node.label_translated = group.label_translated.clone();
                node.icon = group.icon.clone();
                Draft::Group { node, children }
            }
        })
        .collect()
}

/// Second pass: replace placeholders with the module's standard presences.
///
/// Each module may be consumed once; `referenced` tracks the keys already
/// seen anywhere in the layout.
fn resolve(
    drafts: Vec<Draft>,
    standard: &mut ModulePresences,
    referenced: &mut HashSet<String>,
) -> MenuResult<Vec<Presence>> {
    let mut out = Vec::with_capacity(drafts.len());

    for draft in drafts {
        match draft {
            Draft::Placeholder(key) => {
                if referenced.contains(&key) {
                    return Err(MenuError::DuplicateModuleReference { module: key });
                }
                let presences = standard
                    .remove(&key)
                    .ok_or_else(|| MenuError::UnknownModuleReference { module: key.clone() })?;
                referenced.insert(key);
                out.extend(presences);
            }
            Draft::Group { mut node, children } => {
                node.children = resolve(children, standard, referenced)?;
                out.push(node);
            }
        }
    }

    Ok(out)
}

/// Third pass: drop groups without any surviving non-group descendant.
///
/// Surviving siblings must have distinct ids, since menu paths are built
/// from them.
fn prune(
    nodes: Vec<Presence>,
    path: &MenuPath,
    pruned: &mut usize,
) -> MenuResult<Vec<Presence>> {
    let mut out: Vec<Presence> = Vec::with_capacity(nodes.len());

    for mut node in nodes {
        if node.is_group() {
            let children = std::mem::take(&mut node.children);
            node.children = prune(children, &path.child(&node.id), pruned)?;
            if node.children.is_empty() {
                *pruned += 1;
                continue;
            }
        }

        if out.iter().any(|existing| existing.id == node.id) {
            return Err(MenuError::DuplicateNodeId {
                path: path.to_string(),
                id: node.id,
            });
        }
        out.push(node);
    }

    Ok(out)
}
