//! Direct grouping - the older way of arranging the admin menu.
//!
//! Instead of a nested layout, the configuration declares a flat list of
//! named groups and assigns modules to them by name. The assignment is turned
//! into a one-level layout and merged by the regular layout interpreter, so
//! unassigned modules are still appended and empty groups still pruned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::layout::{GroupSpec, LayoutEntry};
use super::modules::{ConfiguredModules, ModuleMenuConfig};
use crate::error::{MenuError, MenuResult};

/// A pre-declared named group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDeclaration {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_translated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Check that every group assignment names a declared group.
pub fn validate_assignments(
    groups: &[GroupDeclaration],
    modules: &BTreeMap<String, ModuleMenuConfig>,
) -> MenuResult<()> {
    for (module, config) in modules {
        let Some(group) = config.group() else {
            continue;
        };
        if !groups.iter().any(|g| g.id == group) {
            return Err(MenuError::invalid_config(
                module,
                format!("assigned to undeclared group '{group}'"),
            ));
        }
    }
    Ok(())
}

/// Build the one-level layout for the declared groups.
///
/// Modules join their group in interpreter order. Modules assigned to a
/// group but without standard presence are left out.
pub fn grouped_layout(
    groups: &[GroupDeclaration],
    modules: &BTreeMap<String, ModuleMenuConfig>,
    configured: &ConfiguredModules,
) -> MenuResult<Vec<LayoutEntry>> {
    validate_assignments(groups, modules)?;

    let layout = groups
        .iter()
        .map(|declared| {
            let children: Vec<LayoutEntry> = configured
                .standard
                .keys()
                .filter(|key| {
                    modules.get(*key).and_then(ModuleMenuConfig::group) == Some(declared.id.as_str())
                })
                .map(LayoutEntry::module)
                .collect();

            debug!(group = %declared.id, modules = children.len(), "assigned modules to group");

            LayoutEntry::Group(GroupSpec {
                id: declared.id.clone(),
                label: declared.label.clone(),
                label_translated: declared.label_translated.clone(),
                icon: declared.icon.clone(),
                children,
            })
        })
        .collect();

    Ok(layout)
}
