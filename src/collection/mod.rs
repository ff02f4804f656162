//! REST collections: the nouns of the API.
//!
//! # Data Flow
//! ```text
//! CollectionSpec (config) + Arc<dyn Collection> (business logic)
//!     → registry.rs (compile rules and hints, index by type)
//!     → CollectionEntry, shared read-only by every request
//! ```
//!
//! # Design Decisions
//! - Rules and hints are compiled once at registration; a bad rule fails
//!   startup, not a request
//! - Type lookups in both directions are precomputed maps, no probing at
//!   request time
//! - Business logic sees transformed input only; it never touches wire
//!   formats

pub mod memory;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::resource::{Entity, Value};

pub use memory::MemoryCollection;
pub use registry::{CollectionEntry, CollectionRegistry, RegistryError};

/// Standard action names produced by the default routes.
pub mod actions {
    pub const LIST: &str = "list";
    pub const SHOW: &str = "show";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    /// Routed when a path matches but its method does not.
    pub const METHOD_NOT_ALLOWED: &str = "_method_not_allowed";
}

/// Per-collection configuration surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionSpec {
    /// URL name, e.g. `books`.
    pub name: String,
    /// External type of the entities it holds, e.g. `book`.
    pub contains: String,
    /// Hint table, one hint per line.
    pub parse_hints: String,
    /// Rule source, one rule per line.
    pub entity_transform: String,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, contains: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contains: contains.into(),
            ..Default::default()
        }
    }

    pub fn with_hints(mut self, hints: impl Into<String>) -> Self {
        self.parse_hints = hints.into();
        self
    }

    pub fn with_transform(mut self, rules: impl Into<String>) -> Self {
        self.entity_transform = rules.into();
        self
    }
}

/// Arguments of one action invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCall {
    /// Path variables and query parameters; path variables win on clash.
    pub args: BTreeMap<String, String>,
    /// Transformed request entity, if the request carried one.
    pub input: Option<Value>,
}

impl ActionCall {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

/// User-supplied business logic behind a collection.
pub trait Collection: Send + Sync + fmt::Debug {
    /// Whether the collection implements `action`.
    fn supports(&self, action: &str) -> bool;

    /// Run `action`. Output is in the internal representation.
    fn call(&self, action: &str, call: ActionCall) -> Result<Entity, ActionError>;
}
