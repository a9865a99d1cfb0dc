//! Trovato test utilities.
//!
//! Helpers for integration testing of the admin menu: raw presence and
//! layout builders, test users, and JSON assertion helpers.

use serde_json::{Value as JsonValue, json};

/// Create a raw presence with default values.
pub fn test_presence(id: &str, kind: &str) -> TestPresence {
    TestPresence {
        id: id.to_string(),
        kind: kind.to_string(),
        label: None,
        action: None,
        icon: None,
        permissions: Vec::new(),
        children: Vec::new(),
    }
}

/// Create a raw link presence.
pub fn link(id: &str) -> TestPresence {
    test_presence(id, "link")
}

/// Create a raw group presence.
pub fn group(id: &str) -> TestPresence {
    test_presence(id, "group")
}

/// A raw presence builder, rendered as the JSON mapping modules hand over.
#[derive(Debug, Clone)]
pub struct TestPresence {
    pub id: String,
    pub kind: String,
    pub label: Option<String>,
    pub action: Option<String>,
    pub icon: Option<String>,
    pub permissions: Vec<String>,
    pub children: Vec<TestPresence>,
}

impl TestPresence {
    /// Set the label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Set the route.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    /// Add a required permission.
    pub fn with_permission(mut self, perm: &str) -> Self {
        self.permissions.push(perm.to_string());
        self
    }

    /// Add a child.
    pub fn with_child(mut self, child: TestPresence) -> Self {
        self.children.push(child);
        self
    }

    /// Render as a presence field mapping.
    pub fn to_json(&self) -> JsonValue {
        let mut value = json!({
            "id": self.id,
            "type": self.kind,
            "label": self.label.clone().unwrap_or_else(|| self.id.clone()),
            "permissions": self.permissions,
        });
        if let Some(action) = &self.action {
            value["action"] = json!(action);
        }
        if let Some(icon) = &self.icon {
            value["icon"] = json!(icon);
        }
        if !self.children.is_empty() {
            value["children"] =
                JsonValue::Array(self.children.iter().map(TestPresence::to_json).collect());
        }
        value
    }
}

/// Render several presences as a JSON list.
pub fn presence_list(presences: &[TestPresence]) -> JsonValue {
    JsonValue::Array(presences.iter().map(TestPresence::to_json).collect())
}

/// Create an inline layout group entry.
pub fn layout_group(id: &str, label: &str, children: Vec<JsonValue>) -> JsonValue {
    json!({
        "id": id,
        "label": label,
        "children": children,
    })
}

/// Create a test user holding the given permissions.
pub fn test_user(permissions: &[&str]) -> TestUser {
    TestUser {
        authenticated: true,
        admin: false,
        permissions: permissions.iter().map(|s| s.to_string()).collect(),
    }
}

/// Create an anonymous test user.
pub fn anonymous_user() -> TestUser {
    TestUser {
        authenticated: false,
        admin: false,
        permissions: vec![],
    }
}

/// Create an admin test user.
pub fn admin_user() -> TestUser {
    TestUser {
        authenticated: true,
        admin: true,
        permissions: vec![],
    }
}

/// A test user builder.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub authenticated: bool,
    pub admin: bool,
    pub permissions: Vec<String>,
}

impl TestUser {
    /// Add a permission.
    pub fn with_permission(mut self, perm: &str) -> Self {
        self.permissions.push(perm.to_string());
        self
    }

    /// Check if user has permission.
    pub fn has_permission(&self, perm: &str) -> bool {
        self.admin || self.permissions.iter().any(|p| p == perm)
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual,
            expected,
            "JSON mismatch:\nactual: {}\nexpected: {}",
            serde_json::to_string_pretty(actual).unwrap_or_default(),
            serde_json::to_string_pretty(expected).unwrap_or_default()
        );
    }

    /// Assert the ids of a serialized menu level, in order.
    pub fn ids(nodes: &Value, expected: &[&str]) {
        let actual: Vec<&str> = nodes
            .as_array()
            .map(|items| items.iter().filter_map(|n| n["id"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(actual, expected, "menu ids mismatch in {nodes}");
    }
}
