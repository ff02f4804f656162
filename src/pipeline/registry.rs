//! Registration and resolution of filter chains.
//!
//! Entries are keyed by (collection, action), where either part may be the
//! wildcard. The chain for a concrete pair is the union of the entries
//! under its four key variants, ordered by (priority, registration order).

use std::collections::HashMap;
use std::sync::Arc;

use crate::pipeline::filter::{ExceptionHandler, InputFilter, OutputFilter};

/// One half of a registration key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Any,
    Named(String),
}

impl Scope {
    pub fn named(name: impl Into<String>) -> Self {
        Scope::Named(name.into())
    }
}

/// `"*"` is the wildcard.
impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        if name == "*" {
            Scope::Any
        } else {
            Scope::Named(name.to_string())
        }
    }
}

#[derive(Debug)]
struct Entry<T: ?Sized> {
    priority: i32,
    serial: u64,
    item: Arc<T>,
}

#[derive(Debug)]
struct Chain<T: ?Sized> {
    entries: HashMap<(Scope, Scope), Vec<Entry<T>>>,
}

impl<T: ?Sized> Default for Chain<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: ?Sized> Chain<T> {
    fn add(&mut self, collection: Scope, action: Scope, priority: i32, serial: u64, item: Arc<T>) {
        self.entries
            .entry((collection, action))
            .or_default()
            .push(Entry {
                priority,
                serial,
                item,
            });
    }

    fn resolve(&self, collection: &str, action: &str) -> Vec<Arc<T>> {
        let keys = [
            (Scope::named(collection), Scope::named(action)),
            (Scope::Any, Scope::named(action)),
            (Scope::named(collection), Scope::Any),
            (Scope::Any, Scope::Any),
        ];
        let mut matched: Vec<&Entry<T>> = keys
            .iter()
            .filter_map(|key| self.entries.get(key))
            .flatten()
            .collect();
        matched.sort_by_key(|entry| (entry.priority, entry.serial));
        matched.into_iter().map(|entry| entry.item.clone()).collect()
    }

    fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// All filters and exception handlers of an application.
#[derive(Debug, Default)]
pub struct FilterRegistry {
    input: Chain<dyn InputFilter>,
    output: Chain<dyn OutputFilter>,
    exception: Chain<dyn ExceptionHandler>,
    next_serial: u64,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    pub fn add_input_filter(
        &mut self,
        collection: impl Into<Scope>,
        action: impl Into<Scope>,
        priority: i32,
        filter: Arc<dyn InputFilter>,
    ) {
        let serial = self.serial();
        self.input
            .add(collection.into(), action.into(), priority, serial, filter);
    }

    pub fn add_output_filter(
        &mut self,
        collection: impl Into<Scope>,
        action: impl Into<Scope>,
        priority: i32,
        filter: Arc<dyn OutputFilter>,
    ) {
        let serial = self.serial();
        self.output
            .add(collection.into(), action.into(), priority, serial, filter);
    }

    pub fn add_exception_handler(
        &mut self,
        collection: impl Into<Scope>,
        action: impl Into<Scope>,
        priority: i32,
        handler: Arc<dyn ExceptionHandler>,
    ) {
        let serial = self.serial();
        self.exception
            .add(collection.into(), action.into(), priority, serial, handler);
    }

    pub fn input_filters(&self, collection: &str, action: &str) -> Vec<Arc<dyn InputFilter>> {
        self.input.resolve(collection, action)
    }

    pub fn output_filters(&self, collection: &str, action: &str) -> Vec<Arc<dyn OutputFilter>> {
        self.output.resolve(collection, action)
    }

    pub fn exception_handlers(
        &self,
        collection: &str,
        action: &str,
    ) -> Vec<Arc<dyn ExceptionHandler>> {
        self.exception.resolve(collection, action)
    }

    /// Total number of registrations of all kinds.
    pub fn len(&self) -> usize {
        self.input.len() + self.output.len() + self.exception.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
