//! Permissions index and per-principal menu filtering.
//!
//! The index is built once per menu and records every *fully conditional*
//! group (one without any unconditionally visible leaf beneath it) together
//! with the union of permissions its leaves require. Filtering then skips any
//! indexed group whose permissions the principal holds in full, and only
//! walks subtrees that are partially granted.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::layout::LayoutData;
use super::presence::Presence;
use crate::error::{MenuError, MenuResult};

/// Path of group ids from the top level. The empty path is the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuPath(Vec<String>);

impl MenuPath {
    /// The top level.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from a sequence of ids.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// The path of a child group.
    pub fn child(&self, id: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MenuPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// Precomputed permission requirements of a finalized menu.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexRepr", into = "IndexRepr")]
pub struct PermissionsIndex {
    conditional: HashMap<MenuPath, Vec<String>>,
    permissions: Vec<String>,
}

impl PermissionsIndex {
    /// Permissions gating a fully conditional group, if `path` is one.
    pub fn get(&self, path: &MenuPath) -> Option<&[String]> {
        self.conditional.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &MenuPath) -> bool {
        self.conditional.contains_key(path)
    }

    /// Every permission referenced anywhere in the menu, deduplicated.
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Indexed paths, sorted.
    pub fn paths(&self) -> Vec<&MenuPath> {
        let mut paths: Vec<_> = self.conditional.keys().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.conditional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditional.is_empty()
    }
}

/// Serialized form; JSON map keys cannot be paths.
#[derive(Serialize, Deserialize)]
struct IndexRepr {
    paths: Vec<IndexedPath>,
    permissions: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct IndexedPath {
    path: MenuPath,
    permissions: Vec<String>,
}

impl From<IndexRepr> for PermissionsIndex {
    fn from(repr: IndexRepr) -> Self {
        Self {
            conditional: repr
                .paths
                .into_iter()
                .map(|entry| (entry.path, entry.permissions))
                .collect(),
            permissions: repr.permissions,
        }
    }
}

impl From<PermissionsIndex> for IndexRepr {
    fn from(index: PermissionsIndex) -> Self {
        let mut paths: Vec<_> = index
            .conditional
            .into_iter()
            .map(|(path, permissions)| IndexedPath { path, permissions })
            .collect();
        paths.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            paths,
            permissions: index.permissions,
        }
    }
}

/// Build the permissions index of a finalized menu.
pub fn build_permissions_index(layout: &LayoutData) -> PermissionsIndex {
    let mut builder = IndexBuilder::default();
    let root = MenuPath::root();
    if let Some(union) = builder.visit(&layout.tree, &root) {
        builder.conditional.insert(root, union);
    }

    debug!(
        conditional_groups = builder.conditional.len(),
        permissions = builder.permissions.len(),
        "built menu permissions index"
    );

    PermissionsIndex {
        conditional: builder.conditional,
        permissions: builder.permissions,
    }
}

#[derive(Default)]
struct IndexBuilder {
    conditional: HashMap<MenuPath, Vec<String>>,
    permissions: Vec<String>,
    seen: HashSet<String>,
}

impl IndexBuilder {
    /// Post-order walk. Returns the permission union when every leaf below
    /// requires a permission, `None` when some leaf is unconditional.
    fn visit(&mut self, nodes: &[Presence], path: &MenuPath) -> Option<Vec<String>> {
        let mut union: Vec<String> = Vec::new();
        let mut unconditional = false;

        for node in nodes {
            if node.is_group() {
                let child_path = path.child(&node.id);
                match self.visit(&node.children, &child_path) {
                    Some(permissions) => {
                        extend_unique(&mut union, &permissions);
                        self.conditional.insert(child_path, permissions);
                    }
                    None => unconditional = true,
                }
            } else if node.is_unconditional() {
                unconditional = true;
            } else {
                for permission in &node.permissions {
                    if self.seen.insert(permission.clone()) {
                        self.permissions.push(permission.clone());
                    }
                }
                extend_unique(&mut union, &node.permissions);
            }
        }

        (!unconditional).then_some(union)
    }
}

fn extend_unique(target: &mut Vec<String>, permissions: &[String]) {
    for permission in permissions {
        if !target.contains(permission) {
            target.push(permission.clone());
        }
    }
}

/// The requester of a menu, as seen by the authorization backend.
pub trait Principal {
    /// Administrators see the whole menu.
    fn is_admin(&self) -> bool;

    /// Whether the principal holds `permission`. Backend failures are
    /// propagated, never treated as a denial.
    fn holds_permission(&self, permission: &str) -> anyhow::Result<bool>;
}

/// A principal backed by an in-memory permission set.
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipal {
    admin: bool,
    permissions: HashSet<String>,
}

impl StaticPrincipal {
    /// A non-admin principal holding the given permissions.
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admin: false,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn admin() -> Self {
        Self {
            admin: true,
            permissions: HashSet::new(),
        }
    }
}

impl Principal for StaticPrincipal {
    fn is_admin(&self) -> bool {
        self.admin
    }

    fn holds_permission(&self, permission: &str) -> anyhow::Result<bool> {
        Ok(self.admin || self.permissions.contains(permission))
    }
}

/// Caller policy for [`filter_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Return the unfiltered menu when there is no principal.
    pub bypass_anonymous: bool,
    /// Build an index when none is supplied (not cached by the call).
    pub build_index_on_demand: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            bypass_anonymous: false,
            build_index_on_demand: true,
        }
    }
}

/// Filter a menu down to what `principal` may see.
///
/// The input is never modified; the result is an independent copy. An absent
/// principal is anonymous and holds no permissions unless
/// [`FilterOptions::bypass_anonymous`] is set.
pub fn filter_layout(
    layout: &LayoutData,
    principal: Option<&dyn Principal>,
    index: Option<&PermissionsIndex>,
    options: FilterOptions,
) -> MenuResult<LayoutData> {
    match principal {
        Some(p) if p.is_admin() => return Ok(layout.clone()),
        None if options.bypass_anonymous => return Ok(layout.clone()),
        _ => {}
    }

    let index = match index {
        Some(index) => Cow::Borrowed(index),
        None if options.build_index_on_demand => Cow::Owned(build_permissions_index(layout)),
        None => return Err(MenuError::PermissionsIndexUnavailable),
    };

    let mut grants: HashMap<&str, bool> = HashMap::with_capacity(index.permissions().len());
    for permission in index.permissions() {
        let granted = match principal {
            Some(p) => p
                .holds_permission(permission)
                .map_err(MenuError::Authorization)?,
            None => false,
        };
        grants.insert(permission.as_str(), granted);
    }

    if grants.values().all(|granted| *granted) {
        return Ok(layout.clone());
    }

    let filter = Filter {
        index: &index,
        grants: &grants,
    };
    let tree = filter.filter_nodes(&layout.tree, &MenuPath::root());

    debug!(
        before = layout.tree.len(),
        after = tree.len(),
        "filtered menu for principal"
    );

    Ok(LayoutData {
        tree,
        alternative: layout.alternative.clone(),
    })
}

struct Filter<'a> {
    index: &'a PermissionsIndex,
    grants: &'a HashMap<&'a str, bool>,
}

impl Filter<'_> {
    fn granted(&self, permission: &str) -> bool {
        self.grants.get(permission).copied().unwrap_or(false)
    }

    fn filter_nodes(&self, nodes: &[Presence], path: &MenuPath) -> Vec<Presence> {
        nodes
            .iter()
            .filter_map(|node| {
                if !node.is_group() {
                    let visible = node.is_unconditional()
                        || node.permissions.iter().any(|p| self.granted(p));
                    return visible.then(|| node.clone());
                }

                let group_path = path.child(&node.id);
                let fully_granted = self
                    .index
                    .get(&group_path)
                    .is_some_and(|required| required.iter().all(|p| self.granted(p)));
                if fully_granted {
                    return Some(node.clone());
                }

                let children = self.filter_nodes(&node.children, &group_path);
                (!children.is_empty()).then(|| Presence {
                    id: node.id.clone(),
                    kind: node.kind.clone(),
                    label: node.label.clone(),
                    label_translated: node.label_translated.clone(),
                    icon: node.icon.clone(),
                    image: node.image.clone(),
                    action: node.action.clone(),
                    parameters: node.parameters.clone(),
                    permissions: node.permissions.clone(),
                    children,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn leaf(id: &str, permissions: &[&str]) -> Presence {
        Presence::new(id, "action", id).with_permissions(permissions.iter().copied())
    }

    /// G1 -> [A, B(p1)], G2 -> [C(p2), D(p3)]
    fn sample() -> LayoutData {
        LayoutData {
            tree: vec![
                Presence::group("G1", "G1").with_children(vec![leaf("A", &[]), leaf("B", &["p1"])]),
                Presence::group("G2", "G2")
                    .with_children(vec![leaf("C", &["p2"]), leaf("D", &["p3"])]),
            ],
            ..Default::default()
        }
    }

    struct FailingPrincipal;

    impl Principal for FailingPrincipal {
        fn is_admin(&self) -> bool {
            false
        }

        fn holds_permission(&self, _permission: &str) -> anyhow::Result<bool> {
            anyhow::bail!("role backend unreachable")
        }
    }

    /// Records every permission it is asked about.
    struct CountingPrincipal {
        held: HashSet<String>,
        asked: RefCell<Vec<String>>,
    }

    impl CountingPrincipal {
        fn new(held: &[&str]) -> Self {
            Self {
                held: held.iter().map(|p| p.to_string()).collect(),
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Principal for CountingPrincipal {
        fn is_admin(&self) -> bool {
            false
        }

        fn holds_permission(&self, permission: &str) -> anyhow::Result<bool> {
            self.asked.borrow_mut().push(permission.to_string());
            Ok(self.held.contains(permission))
        }
    }

    #[test]
    fn index_records_fully_conditional_groups_only() {
        let index = build_permissions_index(&sample());

        assert_eq!(
            index.get(&MenuPath::from_ids(["G2"])),
            Some(&["p2".to_string(), "p3".to_string()][..])
        );
        assert!(!index.contains(&MenuPath::from_ids(["G1"])));
        assert!(!index.contains(&MenuPath::root()));
        assert_eq!(index.permissions(), &["p1", "p2", "p3"]);
    }

    #[test]
    fn fully_conditional_top_level_is_indexed_at_root() {
        let layout = LayoutData {
            tree: vec![leaf("a", &["p1"]), leaf("b", &["p2", "p1"])],
            ..Default::default()
        };

        let index = build_permissions_index(&layout);
        assert_eq!(
            index.get(&MenuPath::root()),
            Some(&["p1".to_string(), "p2".to_string()][..])
        );
    }

    #[test]
    fn nested_unconditional_leaf_unindexes_ancestors() {
        let layout = LayoutData {
            tree: vec![Presence::group("outer", "Outer").with_children(vec![
                leaf("x", &["p1"]),
                Presence::group("inner", "Inner").with_children(vec![leaf("open", &[])]),
            ])],
            ..Default::default()
        };

        let index = build_permissions_index(&layout);
        assert!(index.is_empty());
        assert_eq!(index.permissions(), &["p1"]);
    }

    #[test]
    fn filter_removes_ungranted_subtrees() {
        let layout = sample();
        let principal = StaticPrincipal::new(Vec::<String>::new());

        let filtered =
            filter_layout(&layout, Some(&principal), None, FilterOptions::default()).unwrap();

        assert!(filtered.get("G2").is_none());
        let g1 = filtered.get("G1").unwrap();
        assert_eq!(g1.children.len(), 1);
        assert_eq!(g1.children[0].id, "A");
    }

    #[test]
    fn any_listed_permission_grants_a_leaf() {
        let layout = LayoutData {
            tree: vec![leaf("open", &[]), leaf("either", &["p1", "p2"])],
            ..Default::default()
        };
        let principal = StaticPrincipal::new(["p2"]);

        let filtered =
            filter_layout(&layout, Some(&principal), None, FilterOptions::default()).unwrap();
        assert_eq!(filtered.ids().collect::<Vec<_>>(), vec!["open", "either"]);
    }

    #[test]
    fn partially_granted_group_is_walked() {
        let layout = sample();
        let principal = StaticPrincipal::new(["p3"]);

        let filtered =
            filter_layout(&layout, Some(&principal), None, FilterOptions::default()).unwrap();
        let g2 = filtered.get("G2").unwrap();
        assert_eq!(g2.children.len(), 1);
        assert_eq!(g2.children[0].id, "D");
    }

    #[test]
    fn each_permission_is_checked_once() {
        let layout = LayoutData {
            tree: vec![
                leaf("top", &["p1"]),
                Presence::group("G1", "G1").with_children(vec![
                    leaf("a", &["p1"]),
                    leaf("b", &["p2", "p1"]),
                    Presence::group("G2", "G2").with_children(vec![leaf("c", &["p2"])]),
                ]),
                Presence::group("G3", "G3").with_children(vec![leaf("d", &["p1"])]),
            ],
            ..Default::default()
        };
        let principal = CountingPrincipal::new(&["p2"]);

        let filtered =
            filter_layout(&layout, Some(&principal), None, FilterOptions::default()).unwrap();

        assert_eq!(*principal.asked.borrow(), vec!["p1", "p2"]);
        assert_eq!(filtered.ids().collect::<Vec<_>>(), vec!["G1"]);
    }

    #[test]
    fn fully_granted_indexed_group_is_kept_whole() {
        let layout = sample();
        // G2 is indexed as gated by p2 alone, so holding p2 keeps D as well.
        let index = PermissionsIndex {
            conditional: HashMap::from([(MenuPath::from_ids(["G2"]), vec!["p2".to_string()])]),
            permissions: vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
        };
        let principal = StaticPrincipal::new(["p2"]);

        let filtered =
            filter_layout(&layout, Some(&principal), Some(&index), FilterOptions::default())
                .unwrap();

        assert_eq!(filtered.get("G2"), layout.get("G2"));
        assert!(filtered.find(&["G2", "D"]).is_some());

        // Without the shortcut the same principal loses D.
        let walked = filter_layout(&layout, Some(&principal), None, FilterOptions::default())
            .unwrap();
        assert!(walked.find(&["G2", "D"]).is_none());
    }

    #[test]
    fn admin_and_full_grant_see_everything() {
        let layout = sample();
        let index = build_permissions_index(&layout);

        let admin = StaticPrincipal::admin();
        let all = StaticPrincipal::new(["p1", "p2", "p3"]);

        for principal in [&admin, &all] {
            let filtered =
                filter_layout(&layout, Some(principal), Some(&index), FilterOptions::default())
                    .unwrap();
            assert_eq!(filtered, layout);
        }
    }

    #[test]
    fn anonymous_bypass_is_explicit() {
        let layout = sample();

        let hidden = filter_layout(&layout, None, None, FilterOptions::default()).unwrap();
        assert!(hidden.get("G2").is_none());

        let options = FilterOptions {
            bypass_anonymous: true,
            ..Default::default()
        };
        let shown = filter_layout(&layout, None, None, options).unwrap();
        assert_eq!(shown, layout);
    }

    #[test]
    fn missing_index_without_on_demand_build_fails() {
        let options = FilterOptions {
            build_index_on_demand: false,
            ..Default::default()
        };
        let principal = StaticPrincipal::new(["p1"]);

        let err = filter_layout(&sample(), Some(&principal), None, options).unwrap_err();
        assert!(matches!(err, MenuError::PermissionsIndexUnavailable));
    }

    #[test]
    fn authorization_failure_propagates() {
        let err = filter_layout(&sample(), Some(&FailingPrincipal), None, FilterOptions::default())
            .unwrap_err();
        assert!(matches!(err, MenuError::Authorization(_)));
        assert_eq!(err.to_string(), "role backend unreachable");
    }

    #[test]
    fn index_serializes_with_sorted_paths() {
        let index = build_permissions_index(&sample());
        let json = serde_json::to_value(&index).unwrap();

        assert_eq!(json["paths"][0]["path"], serde_json::json!(["G2"]));
        let restored: PermissionsIndex = serde_json::from_value(json).unwrap();
        assert_eq!(restored, index);
    }

    #[test]
    fn path_display() {
        assert_eq!(MenuPath::root().to_string(), "/");
        assert_eq!(MenuPath::from_ids(["a", "b"]).to_string(), "/a/b");
        assert!(MenuPath::root().child("a").segments() == ["a"]);
    }
}
