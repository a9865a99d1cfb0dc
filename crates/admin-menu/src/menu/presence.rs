//! Presence nodes - the entries of the administrative menu tree.
//!
//! Modules and administrator configuration hand over presence data in one of
//! three shapes: a canonical node, a list of nodes, or a bare mapping of node
//! fields. [`normalize`] turns any of them into a list of canonical
//! [`Presence`] nodes before the rest of the menu pipeline sees them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{MenuError, MenuResult};

/// The kind of a presence node.
///
/// `group`, `action` and `link` are shown in the main menu tree. Any other
/// kind declared by a module is an alternative presence surfaced elsewhere
/// (e.g. the user profile menu).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PresenceKind {
    Group,
    Action,
    Link,
    Other(String),
}

impl PresenceKind {
    /// Machine name as used in configuration and JSON output.
    pub fn as_str(&self) -> &str {
        match self {
            PresenceKind::Group => "group",
            PresenceKind::Action => "action",
            PresenceKind::Link => "link",
            PresenceKind::Other(name) => name,
        }
    }

    /// Whether nodes of this kind belong in the main menu tree.
    pub fn is_standard(&self) -> bool {
        !matches!(self, PresenceKind::Other(_))
    }
}

impl From<String> for PresenceKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "group" => PresenceKind::Group,
            "action" => PresenceKind::Action,
            "link" => PresenceKind::Link,
            _ => PresenceKind::Other(name),
        }
    }
}

impl From<&str> for PresenceKind {
    fn from(name: &str) -> Self {
        PresenceKind::from(name.to_string())
    }
}

impl From<PresenceKind> for String {
    fn from(kind: PresenceKind) -> Self {
        match kind {
            PresenceKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PresenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single menu entry: an action, a link, or a group of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    /// Identifier, unique among its siblings once the menu is finalized.
    pub id: String,

    /// Node kind (serialized as `type`).
    #[serde(rename = "type")]
    pub kind: PresenceKind,

    /// Human-readable label.
    pub label: String,

    /// Translation key for the label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_translated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Route name or URL this entry points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Ordered route parameters.
    #[serde(default)]
    pub parameters: Vec<Value>,

    /// Permissions of which any one grants visibility (empty = public).
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default)]
    pub children: Vec<Presence>,
}

impl Presence {
    /// Create a node with no permissions, parameters or children.
    pub fn new(id: impl Into<String>, kind: impl Into<PresenceKind>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: label.into(),
            label_translated: None,
            icon: None,
            image: None,
            action: None,
            parameters: Vec::new(),
            permissions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an empty group node.
    pub fn group(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, PresenceKind::Group, label)
    }

    /// Set the required permissions, dropping duplicates.
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = dedupe_permissions(permissions.into_iter().map(Into::into));
        self
    }

    /// Set the children.
    pub fn with_children(mut self, children: Vec<Presence>) -> Self {
        self.children = children;
        self
    }

    /// Set the route/URL reference.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_label_translated(mut self, key: impl Into<String>) -> Self {
        self.label_translated = Some(key.into());
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == PresenceKind::Group
    }

    /// Whether this node is visible without any permission.
    pub fn is_unconditional(&self) -> bool {
        self.permissions.is_empty()
    }
}

/// Presence data in any of the accepted input shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawPresence {
    /// An already canonical node.
    Node(Presence),
    /// A list whose elements must be nodes or field mappings.
    List(Vec<RawPresence>),
    /// A single node described as a mapping of fields.
    Fields(Map<String, Value>),
    /// Anything else; rejected by [`normalize`].
    Other(Value),
}

impl From<Value> for RawPresence {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawPresence::List(Vec::new()),
            Value::Object(fields) => RawPresence::Fields(fields),
            Value::Array(items) => {
                RawPresence::List(items.into_iter().map(RawPresence::from).collect())
            }
            other => RawPresence::Other(other),
        }
    }
}

impl From<Presence> for RawPresence {
    fn from(node: Presence) -> Self {
        RawPresence::Node(node)
    }
}

impl From<Vec<Presence>> for RawPresence {
    fn from(nodes: Vec<Presence>) -> Self {
        RawPresence::List(nodes.into_iter().map(RawPresence::Node).collect())
    }
}

/// Normalize presence data into canonical nodes.
///
/// `source_key` names the module (or configuration entry) the data came from
/// and is only used in error messages.
pub fn normalize(raw: RawPresence, source_key: &str) -> MenuResult<Vec<Presence>> {
    match raw {
        RawPresence::Node(node) => Ok(vec![node]),
        RawPresence::Fields(fields) => Ok(vec![from_fields(fields, source_key)?]),
        RawPresence::List(items) => items
            .into_iter()
            .map(|item| match item {
                RawPresence::Node(node) => Ok(node),
                RawPresence::Fields(fields) => from_fields(fields, source_key),
                RawPresence::List(_) => Err(MenuError::malformed(
                    source_key,
                    "list element is a nested list",
                )),
                RawPresence::Other(value) => Err(MenuError::malformed(
                    source_key,
                    format!("list element is {}", describe(&value)),
                )),
            })
            .collect(),
        RawPresence::Other(value) => Err(MenuError::malformed(
            source_key,
            format!("expected a node, a list or a mapping, got {}", describe(&value)),
        )),
    }
}

/// Build a canonical node from a field mapping, normalizing its children.
fn from_fields(mut fields: Map<String, Value>, source_key: &str) -> MenuResult<Presence> {
    let id = take_string(&mut fields, "id", source_key)?
        .ok_or_else(|| MenuError::malformed(source_key, "presence is missing 'id'"))?;
    let kind = take_string(&mut fields, "type", source_key)?
        .map(PresenceKind::from)
        .unwrap_or(PresenceKind::Action);
    let label = take_string(&mut fields, "label", source_key)?.unwrap_or_else(|| id.clone());

    let parameters = match fields.remove("parameters") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(params)) => params,
        Some(single) => vec![single],
    };

    let permissions = match fields.remove("permissions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(permission)) => vec![permission],
        Some(Value::Array(values)) => values
            .into_iter()
            .map(|value| match value {
                Value::String(permission) => Ok(permission),
                other => Err(MenuError::malformed(
                    source_key,
                    format!("presence '{id}' lists {} as a permission", describe(&other)),
                )),
            })
            .collect::<MenuResult<Vec<_>>>()?,
        Some(other) => {
            return Err(MenuError::malformed(
                source_key,
                format!("presence '{id}' has {} as permissions", describe(&other)),
            ));
        }
    };

    let children = match fields.remove("children") {
        None => Vec::new(),
        Some(value) => normalize(RawPresence::from(value), source_key)?,
    };

    let label_translated = take_string(&mut fields, "labelTranslated", source_key)?;
    let icon = take_string(&mut fields, "icon", source_key)?;
    let image = take_string(&mut fields, "image", source_key)?;
    let action = take_string(&mut fields, "action", source_key)?;

    if !fields.is_empty() {
        let unknown: Vec<&str> = fields.keys().map(String::as_str).collect();
        warn!(
            source = %source_key,
            id = %id,
            fields = ?unknown,
            "ignoring unrecognized presence fields"
        );
    }

    Ok(Presence {
        label_translated,
        icon,
        image,
        action,
        id,
        kind,
        label,
        parameters,
        permissions: dedupe_permissions(permissions),
        children,
    })
}

fn take_string(
    fields: &mut Map<String, Value>,
    name: &str,
    source_key: &str,
) -> MenuResult<Option<String>> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(MenuError::malformed(
            source_key,
            format!("field '{name}' must be a string, got {}", describe(&other)),
        )),
    }
}

/// Drop repeated permissions, keeping first occurrences in order.
pub(crate) fn dedupe_permissions<I>(permissions: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for permission in permissions {
        if !out.contains(&permission) {
            out.push(permission);
        }
    }
    out
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_round_trips_known_and_custom_names() {
        assert_eq!(PresenceKind::from("group"), PresenceKind::Group);
        assert_eq!(PresenceKind::from("link"), PresenceKind::Link);
        assert_eq!(
            PresenceKind::from("profile"),
            PresenceKind::Other("profile".to_string())
        );
        assert!(!PresenceKind::from("profile").is_standard());
        assert_eq!(String::from(PresenceKind::Action), "action");
    }

    #[test]
    fn normalize_single_mapping() {
        let raw = RawPresence::from(json!({
            "id": "users",
            "type": "link",
            "label": "Users",
            "action": "admin.users",
            "permissions": "administer users"
        }));

        let nodes = normalize(raw, "users").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, PresenceKind::Link);
        assert_eq!(nodes[0].action.as_deref(), Some("admin.users"));
        assert_eq!(nodes[0].permissions, vec!["administer users"]);
    }

    #[test]
    fn normalize_applies_defaults() {
        let nodes = normalize(RawPresence::from(json!({"id": "cache"})), "system").unwrap();
        assert_eq!(nodes[0].kind, PresenceKind::Action);
        assert_eq!(nodes[0].label, "cache");
        assert!(nodes[0].permissions.is_empty());
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn normalize_list_of_nodes_and_mappings() {
        let raw = RawPresence::List(vec![
            RawPresence::Node(Presence::new("a", "action", "A")),
            RawPresence::from(json!({"id": "b", "type": "link"})),
        ]);

        let nodes = normalize(raw, "mixed").unwrap();
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn normalize_recurses_into_children() {
        let raw = RawPresence::from(json!({
            "id": "content",
            "type": "group",
            "children": [
                {"id": "pages", "type": "link", "children": {"id": "new-page"}}
            ]
        }));

        let nodes = normalize(raw, "content").unwrap();
        let pages = &nodes[0].children[0];
        assert_eq!(pages.id, "pages");
        assert_eq!(pages.children[0].id, "new-page");
    }

    #[test]
    fn normalize_is_idempotent() {
        let first = normalize(
            RawPresence::from(json!([
                {"id": "a", "permissions": ["p1", "p1", "p2"]},
                {"id": "g", "type": "group", "children": [{"id": "b"}]}
            ])),
            "m",
        )
        .unwrap();

        let second = normalize(RawPresence::from(first.clone()), "m").unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].permissions, vec!["p1", "p2"]);
    }

    #[test]
    fn null_presence_is_empty() {
        assert!(normalize(RawPresence::from(Value::Null), "m").unwrap().is_empty());
    }

    #[test]
    fn malformed_list_element_is_rejected() {
        let err = normalize(RawPresence::from(json!([{"id": "a"}, 42])), "broken").unwrap_err();
        assert!(matches!(
            err,
            MenuError::MalformedPresence { ref source_key, .. } if source_key == "broken"
        ));
    }

    #[test]
    fn scalar_presence_is_rejected() {
        let err = normalize(RawPresence::from(json!("dashboard")), "m").unwrap_err();
        assert!(matches!(err, MenuError::MalformedPresence { .. }));
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = normalize(RawPresence::from(json!({"label": "Nameless"})), "m").unwrap_err();
        assert!(err.to_string().contains("missing 'id'"));
    }

    #[test]
    fn unrecognized_fields_do_not_gate_the_node() {
        let nodes = normalize(
            RawPresence::from(json!({"id": "users", "permission": "administer users"})),
            "users",
        )
        .unwrap();

        assert!(nodes[0].permissions.is_empty());
        assert!(nodes[0].is_unconditional());
    }

    #[test]
    fn non_string_permission_is_rejected() {
        let err =
            normalize(RawPresence::from(json!({"id": "a", "permissions": [true]})), "m").unwrap_err();
        assert!(matches!(err, MenuError::MalformedPresence { .. }));
    }
}
