//! Ambient variables shared by every render.

use serde_json::Value;
use stupidly_core::Scope;

/// Process-level template variables. `get()` is `None` until something has
/// been shared.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    vars: Option<Scope>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. An empty scope leaves it unset.
    pub fn from_scope(vars: Scope) -> Self {
        Self {
            vars: (!vars.is_empty()).then_some(vars),
        }
    }

    pub fn share(&mut self, name: impl Into<String>, value: Value) {
        self.vars.get_or_insert_with(Scope::new).insert(name.into(), value);
    }

    pub fn get(&self) -> Option<&Scope> {
        self.vars.as_ref()
    }
}
