//! Recursive conversion between external and internal entity shapes.
//!
//! Children are converted before their parent: a parent's rules rename
//! keys whose values must already carry their final type.
//!
//! Forward, a mapping without a type is typed from context: the root (and
//! each element of a root list) gets the collection's `contains`, anything
//! deeper needs a `type` hint at its path. Reverse, every mapping must
//! already be a typed resource; there is nothing to infer from.

use crate::collection::{CollectionEntry, CollectionRegistry};
use crate::entity::hints::Hints;
use crate::error::TransformError;
use crate::resource::{Resource, Value};

/// Converts entities on behalf of one collection.
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'a> {
    registry: &'a CollectionRegistry,
    collection: &'a CollectionEntry,
}

impl<'a> Transformer<'a> {
    pub fn new(registry: &'a CollectionRegistry, collection: &'a CollectionEntry) -> Self {
        Self {
            registry,
            collection,
        }
    }

    pub fn transform(&self, value: Value, reverse: bool) -> Result<Value, TransformError> {
        if reverse {
            self.reverse(value)
        } else {
            self.forward(value)
        }
    }

    /// External to internal.
    pub fn forward(&self, value: Value) -> Result<Value, TransformError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| self.forward_root(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => self.forward_root(other),
        }
    }

    /// Internal to external.
    pub fn reverse(&self, value: Value) -> Result<Value, TransformError> {
        self.reverse_node(value, "")
    }

    fn hints(&self) -> &Hints {
        self.collection.hints()
    }

    fn forward_root(&self, value: Value) -> Result<Value, TransformError> {
        match value {
            Value::Map(fields) => {
                let resource = Resource::from_fields(self.collection.contains(), fields);
                let path = format!("/{}", resource.type_name());
                self.forward_resource(resource, &path)
            }
            Value::Resource(resource) => {
                let path = format!("/{}", resource.type_name());
                self.forward_resource(resource, &path)
            }
            scalar => Ok(scalar),
        }
    }

    fn forward_node(&self, value: Value, path: &str) -> Result<Value, TransformError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| self.forward_node(item, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Value::Map(fields) => {
                let type_name = self
                    .hints()
                    .type_at(path)
                    .ok_or_else(|| TransformError::MissingTypeHint {
                        path: path.to_string(),
                    })?;
                self.forward_resource(Resource::from_fields(type_name, fields), path)
            }
            Value::Resource(resource) => self.forward_resource(resource, path),
            scalar => Ok(scalar),
        }
    }

    fn forward_resource(&self, resource: Resource, path: &str) -> Result<Value, TransformError> {
        let (type_name, fields) = resource.into_parts();
        let fields = fields
            .into_iter()
            .map(|(key, value)| {
                let child_path = format!("{}/{}", path, key);
                self.forward_node(value, &child_path).map(|value| (key, value))
            })
            .collect::<Result<_, _>>()?;
        let resource = Resource::from_fields(type_name, fields);

        let ruleset = self
            .registry
            .by_external_type(resource.type_name())
            .and_then(CollectionEntry::ruleset);
        Ok(Value::Resource(match ruleset {
            Some(ruleset) => ruleset.process(resource)?,
            None => resource,
        }))
    }

    fn reverse_node(&self, value: Value, path: &str) -> Result<Value, TransformError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| self.reverse_node(item, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Value::Map(_) => Err(TransformError::Untyped {
                path: if path.is_empty() { "/".into() } else { path.to_string() },
            }),
            Value::Resource(resource) => {
                let path = if path.is_empty() {
                    format!("/{}", resource.type_name())
                } else {
                    path.to_string()
                };
                let (type_name, fields) = resource.into_parts();
                let fields = fields
                    .into_iter()
                    .map(|(key, value)| {
                        let child_path = format!("{}/{}", path, key);
                        self.reverse_node(value, &child_path).map(|value| (key, value))
                    })
                    .collect::<Result<_, _>>()?;
                let resource = Resource::from_fields(type_name, fields);

                // Only a missing `!type` is fatal here. A type that no
                // collection contains is already in its external shape.
                let ruleset = self
                    .registry
                    .by_internal_type(resource.type_name())
                    .and_then(CollectionEntry::ruleset);
                Ok(Value::Resource(match ruleset {
                    Some(ruleset) => ruleset.process_reverse(resource)?,
                    None => resource,
                }))
            }
            scalar => Ok(scalar),
        }
    }
}
