//! Generic entity model.
//!
//! # Data Flow
//! ```text
//! wire bytes ──codec parse──▶ Value (Resource / Map / List / scalar)
//!     → Transformer (external → internal)
//!     → collection action
//!     → Transformer (internal → external)
//!     → codec format ──▶ wire bytes
//! ```
//!
//! # Design Decisions
//! - A `Resource` always has a type; it is stored apart from the fields so
//!   the invariant cannot be broken by field updates
//! - Mappings that have no type yet (JSON objects, plain YAML maps) are
//!   `Value::Map` until the transformer assigns one from hints
//! - Field order is irrelevant; `BTreeMap` keeps formatting deterministic

use std::collections::BTreeMap;
use std::fmt;

use axum::body::Bytes;

/// Reserved key holding the type name of a resource on the wire.
pub const TYPE_KEY: &str = "!type";

/// A value inside an entity tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// A mapping that has not been assigned a type yet.
    Map(BTreeMap<String, Value>),
    Resource(Resource),
}

impl Value {
    /// True for null, booleans, numbers and strings.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Value::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
            Value::Resource(_) => "resource",
        }
    }

    /// Text form of a scalar, as written into XML element content.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        Value::Resource(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// A typed record: the universal in-memory entity representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Resource {
    /// Create an empty resource of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Create a resource from an existing field map.
    pub fn from_fields(type_name: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_type(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert a field. The type lives outside the field map, so `!type` is
    /// not a valid field name here; use [`Resource::set_type`].
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        debug_assert_ne!(key, TYPE_KEY, "use set_type for the resource type");
        self.fields.insert(key, value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Split into type name and fields.
    pub fn into_parts(self) -> (String, BTreeMap<String, Value>) {
        (self.type_name, self.fields)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_name)?;
        for (i, key) in self.fields.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", key)?;
        }
        write!(f, "}}")
    }
}

/// Request or response body as it moves through the filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// No body.
    Empty,
    /// Raw wire bytes (unparsed input, or formatted output).
    Bytes(Bytes),
    /// Structured body.
    Value(Value),
    /// Output of a create action: the new entity and where it lives.
    Located { location: String, entity: Box<Entity> },
}

impl Entity {
    /// True when there is nothing to send or read.
    pub fn is_empty(&self) -> bool {
        match self {
            Entity::Empty => true,
            Entity::Bytes(b) => b.is_empty(),
            Entity::Value(Value::Null) => true,
            Entity::Value(_) => false,
            Entity::Located { .. } => false,
        }
    }

    /// A created entity located at `location`.
    pub fn located(location: impl Into<String>, entity: impl Into<Entity>) -> Self {
        Entity::Located {
            location: location.into(),
            entity: Box::new(entity.into()),
        }
    }
}

impl From<Value> for Entity {
    fn from(v: Value) -> Self {
        Entity::Value(v)
    }
}

impl From<Resource> for Entity {
    fn from(r: Resource) -> Self {
        Entity::Value(Value::Resource(r))
    }
}

impl From<Vec<Resource>> for Entity {
    fn from(items: Vec<Resource>) -> Self {
        Entity::Value(Value::List(items.into_iter().map(Value::Resource).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_always_typed() {
        let book = Resource::new("book").with("title", "Dune").with("year", 1965i64);
        assert_eq!(book.type_name(), "book");
        assert_eq!(book.get("title"), Some(&Value::from("Dune")));
        assert!(!book.contains_key(TYPE_KEY));
        assert_eq!(book.to_string(), "book{title, year}");
    }

    #[test]
    fn test_entity_emptiness() {
        assert!(Entity::Empty.is_empty());
        assert!(Entity::Bytes(Bytes::new()).is_empty());
        assert!(Entity::Value(Value::Null).is_empty());
        assert!(!Entity::from(Resource::new("book")).is_empty());
        assert!(!Entity::located("/api/books/1", Entity::Empty).is_empty());
    }
}
