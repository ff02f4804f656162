//! Compiled collections and their type indexes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::{Collection, CollectionSpec};
use crate::entity::hints::Hints;
use crate::error::SyntaxError;
use crate::rules::Ruleset;

/// Error type for collection registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("collection '{collection}': {source}")]
    Syntax {
        collection: String,
        #[source]
        source: SyntaxError,
    },

    #[error("collection '{0}' registered twice")]
    DuplicateName(String),

    #[error("type '{type_name}' is claimed by both '{first}' and '{second}'")]
    DuplicateType {
        type_name: String,
        first: String,
        second: String,
    },
}

/// A registered collection with its compiled rules and hints.
#[derive(Debug)]
pub struct CollectionEntry {
    spec: CollectionSpec,
    ruleset: Option<Ruleset>,
    hints: Hints,
    internal_type: String,
    handler: Arc<dyn Collection>,
}

impl CollectionEntry {
    /// Compile `spec`. Fails on the first rule or hint syntax error.
    pub fn compile(spec: CollectionSpec, handler: Arc<dyn Collection>) -> Result<Self, RegistryError> {
        let syntax = |source| RegistryError::Syntax {
            collection: spec.name.clone(),
            source,
        };
        let ruleset = Ruleset::parse(&spec.entity_transform).map_err(syntax)?;
        let hints = Hints::parse(&spec.parse_hints).map_err(syntax)?;
        let ruleset = (!ruleset.is_empty()).then_some(ruleset);
        let internal_type = match &ruleset {
            Some(ruleset) => ruleset.probe_type(&spec.contains),
            None => spec.contains.clone(),
        };
        Ok(Self {
            spec,
            ruleset,
            hints,
            internal_type,
            handler,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// External type name of the entities in this collection.
    pub fn contains(&self) -> &str {
        &self.spec.contains
    }

    /// The type name the rules give `contains` internally.
    pub fn internal_type(&self) -> &str {
        &self.internal_type
    }

    /// None when the collection declares no rules; entities then pass
    /// through unchanged.
    pub fn ruleset(&self) -> Option<&Ruleset> {
        self.ruleset.as_ref()
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn handler(&self) -> &dyn Collection {
        self.handler.as_ref()
    }

    pub fn spec(&self) -> &CollectionSpec {
        &self.spec
    }
}

/// All collections of an application. Built at startup, read-only after.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    entries: Vec<Arc<CollectionEntry>>,
    by_name: HashMap<String, usize>,
    by_external: HashMap<String, usize>,
    by_internal: HashMap<String, usize>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        spec: CollectionSpec,
        handler: Arc<dyn Collection>,
    ) -> Result<Arc<CollectionEntry>, RegistryError> {
        let entry = CollectionEntry::compile(spec, handler)?;
        if self.by_name.contains_key(entry.name()) {
            return Err(RegistryError::DuplicateName(entry.name().to_string()));
        }
        self.check_type(&self.by_external, entry.contains(), entry.name())?;
        self.check_type(&self.by_internal, entry.internal_type(), entry.name())?;

        let index = self.entries.len();
        self.by_name.insert(entry.name().to_string(), index);
        self.by_external.insert(entry.contains().to_string(), index);
        self.by_internal.insert(entry.internal_type().to_string(), index);

        tracing::debug!(
            collection = %entry.name(),
            contains = %entry.contains(),
            internal_type = %entry.internal_type(),
            rules = entry.ruleset().map_or(0, |r| r.rules().len()),
            "Collection registered"
        );

        let entry = Arc::new(entry);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn check_type(
        &self,
        index: &HashMap<String, usize>,
        type_name: &str,
        collection: &str,
    ) -> Result<(), RegistryError> {
        match index.get(type_name) {
            Some(&existing) => Err(RegistryError::DuplicateType {
                type_name: type_name.to_string(),
                first: self.entries[existing].name().to_string(),
                second: collection.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CollectionEntry>> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// The collection whose `contains` is `type_name`.
    pub fn by_external_type(&self, type_name: &str) -> Option<&CollectionEntry> {
        self.by_external.get(type_name).map(|&i| self.entries[i].as_ref())
    }

    /// The collection whose rules produce `type_name` internally.
    pub fn by_internal_type(&self, type_name: &str) -> Option<&CollectionEntry> {
        self.by_internal.get(type_name).map(|&i| self.entries[i].as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CollectionEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
