//! Menu assembly and filtering error types.
//!
//! Every assembly error aborts the whole interpretation pass; there is no
//! partially built menu.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised while building or filtering the administrative menu.
#[derive(Debug, Error)]
pub enum MenuError {
    /// A module or configuration supplied presence data that is not a node.
    #[error("malformed presence from '{source_key}': {details}")]
    MalformedPresence { source_key: String, details: String },

    /// A module's menu configuration entry has an unsupported value.
    #[error("invalid menu configuration for module '{module}': {details}")]
    InvalidModuleConfig { module: String, details: String },

    /// The layout references a module without standard presence.
    #[error("layout references unknown module '{module}'")]
    UnknownModuleReference { module: String },

    /// The layout references the same module more than once.
    #[error("layout references module '{module}' more than once")]
    DuplicateModuleReference { module: String },

    /// Two siblings of the merged menu share an id.
    #[error("duplicate menu id '{id}' under '{path}'")]
    DuplicateNodeId { path: String, id: String },

    /// A layout entry is neither a module reference nor a group.
    #[error("invalid layout entry: {details}")]
    InvalidLayoutEntry { details: String },

    /// Filtering needs an index but none was supplied or may be built.
    #[error("permissions index unavailable: build the index and retry")]
    PermissionsIndexUnavailable,

    /// Menu inputs could not be serialized for fingerprinting.
    #[error("failed to serialize menu data")]
    Serialization(#[from] serde_json::Error),

    /// A menu build failed for a concurrent request of the same menu.
    #[error(transparent)]
    SharedBuild(Arc<MenuError>),

    /// The authorization backend failed while checking a permission.
    #[error(transparent)]
    Authorization(anyhow::Error),
}

impl MenuError {
    pub(crate) fn malformed(source_key: &str, details: impl Into<String>) -> Self {
        MenuError::MalformedPresence {
            source_key: source_key.to_string(),
            details: details.into(),
        }
    }

    pub(crate) fn invalid_config(module: &str, details: impl Into<String>) -> Self {
        MenuError::InvalidModuleConfig {
            module: module.to_string(),
            details: details.into(),
        }
    }
}

/// Result type alias using MenuError.
pub type MenuResult<T> = Result<T, MenuError>;
