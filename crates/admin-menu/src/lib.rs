//! Trovato admin menu library.
//!
//! Builds the administrative menu from module presences and the
//! administrator layout, and filters it per user by permission.
//! The `trovato-menu` binary wraps it for the command line.

pub mod cache;
pub mod config;
pub mod error;
pub mod menu;
pub mod registry;
pub mod service;

pub use cache::MenuCache;
pub use config::Settings;
pub use error::{MenuError, MenuResult};
pub use registry::{ModuleManifest, ModuleRegistry};
pub use service::MenuService;
