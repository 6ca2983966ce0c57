//! Application container.
//!
//! A typed registry for services and values the application wants to hand
//! around. Lookups are type-checked: asking for the wrong type yields `None`.
//! Values linked with [`Container::link_exported`] are also visible to
//! templates under the `app` binding.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use stupidly_core::Scope;

struct Entry {
    value: Box<dyn Any + Send + Sync>,
    exported: Option<Value>,
}

#[derive(Default)]
pub struct Container {
    entries: BTreeMap<String, Entry>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under `name`, replacing any previous binding.
    pub fn link<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(
            name.into(),
            Entry {
                value: Box::new(value),
                exported: None,
            },
        );
    }

    /// Bind `value` under `name` and expose its serialized form to templates.
    pub fn link_exported<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), serde_json::Error>
    where
        T: Serialize + Any + Send + Sync,
    {
        let exported = serde_json::to_value(&value)?;
        self.entries.insert(
            name.into(),
            Entry {
                value: Box::new(value),
                exported: Some(exported),
            },
        );
        Ok(())
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries.get(name)?.value.downcast_ref::<T>()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialized forms of exported entries.
    pub fn exports(&self) -> Scope {
        self.entries
            .iter()
            .filter_map(|(name, entry)| Some((name.clone(), entry.exported.clone()?)))
            .collect()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
