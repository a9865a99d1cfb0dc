//! JSON projection of the menu tree for API consumers.
//!
//! The field set here is what the admin frontend reads. Keep it stable.

use serde::Serialize;
use serde_json::Value;

use super::presence::Presence;

/// One node of the serialized menu tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuNodeView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    /// The node image, falling back to its icon.
    pub image: Option<String>,
    pub action: Option<String>,
    pub parameters: Vec<Value>,
    pub permissions: Vec<String>,
    pub children: Vec<MenuNodeView>,
}

impl From<&Presence> for MenuNodeView {
    fn from(node: &Presence) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind.as_str().to_string(),
            label: node.label.clone(),
            image: node.image.clone().or_else(|| node.icon.clone()),
            action: node.action.clone(),
            parameters: node.parameters.clone(),
            permissions: node.permissions.clone(),
            children: node.children.iter().map(MenuNodeView::from).collect(),
        }
    }
}
