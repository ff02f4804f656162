//! In-memory, id-keyed collection.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::collection::{actions, ActionCall, Collection};
use crate::error::ActionError;
use crate::resource::{Entity, Resource, Value};

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    records: BTreeMap<u64, Resource>,
}

/// Keeps resources in a map keyed by a generated numeric id. Supports the
/// five standard actions.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    store: Mutex<Store>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: Mutex::new(Store {
                next_id: 1,
                records: BTreeMap::new(),
            }),
        }
    }

    /// Insert a record directly, returning its id.
    pub fn insert(&self, resource: Resource) -> Result<u64, ActionError> {
        let mut store = self.lock()?;
        let id = store.next_id;
        store.next_id += 1;
        store.records.insert(id, resource);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|store| store.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Store>, ActionError> {
        self.store.lock().map_err(|_| ActionError::Failed {
            message: format!("store of '{}' is poisoned", self.name),
            source: None,
        })
    }

    fn location(&self, id: u64) -> String {
        format!("/api/{}/{}", self.name, id)
    }

    fn list(&self) -> Result<Entity, ActionError> {
        let store = self.lock()?;
        Ok(store.records.values().cloned().collect::<Vec<_>>().into())
    }

    fn show(&self, call: &ActionCall) -> Result<Entity, ActionError> {
        let id = self.id(call)?;
        let store = self.lock()?;
        store
            .records
            .get(&id)
            .cloned()
            .map(Entity::from)
            .ok_or_else(|| self.not_found(id))
    }

    fn create(&self, call: ActionCall) -> Result<Entity, ActionError> {
        let resource = into_resource(call.input)?;
        let id = self.insert(resource)?;
        Ok(Entity::located(self.location(id), Entity::Empty))
    }

    fn update(&self, call: ActionCall) -> Result<Entity, ActionError> {
        let id = self.id(&call)?;
        let resource = into_resource(call.input)?;
        let mut store = self.lock()?;
        match store.records.get_mut(&id) {
            Some(existing) => {
                *existing = resource;
                Ok(Entity::Empty)
            }
            None => Err(self.not_found(id)),
        }
    }

    fn delete(&self, call: &ActionCall) -> Result<Entity, ActionError> {
        let id = self.id(call)?;
        let mut store = self.lock()?;
        store
            .records
            .remove(&id)
            .map(|_| Entity::Empty)
            .ok_or_else(|| self.not_found(id))
    }

    /// Unparsable ids cannot exist, so they are "not found" rather than
    /// invalid input.
    fn id(&self, call: &ActionCall) -> Result<u64, ActionError> {
        let raw = call
            .arg("id")
            .ok_or_else(|| ActionError::Invalid("missing id".into()))?;
        raw.parse()
            .map_err(|_| ActionError::NotFound(format!("{} {}", self.name, raw)))
    }

    fn not_found(&self, id: u64) -> ActionError {
        ActionError::NotFound(format!("{} {}", self.name, id))
    }
}

fn into_resource(input: Option<Value>) -> Result<Resource, ActionError> {
    match input {
        Some(Value::Resource(resource)) => Ok(resource),
        Some(other) => Err(ActionError::Invalid(format!(
            "expecting a single resource, got a {}",
            other.kind()
        ))),
        None => Err(ActionError::Invalid("no input provided".into())),
    }
}

impl Collection for MemoryCollection {
    fn supports(&self, action: &str) -> bool {
        matches!(
            action,
            actions::LIST | actions::SHOW | actions::CREATE | actions::UPDATE | actions::DELETE
        )
    }

    fn call(&self, action: &str, call: ActionCall) -> Result<Entity, ActionError> {
        match action {
            actions::LIST => self.list(),
            actions::SHOW => self.show(&call),
            actions::CREATE => self.create(call),
            actions::UPDATE => self.update(call),
            actions::DELETE => self.delete(&call),
            other => Err(ActionError::Invalid(format!("unsupported action '{}'", other))),
        }
    }
}
