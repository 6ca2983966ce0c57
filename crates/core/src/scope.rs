// Variable scopes handed to templates

use serde_json::{Map, Value};

/// A named set of template variables. Keys are variable names.
pub type Scope = Map<String, Value>;

/// The merged set of variables visible to a single template execution.
///
/// Built by applying layers in order; a later layer replaces earlier
/// bindings with the same name. The scope lives for one render call and is
/// dropped once output has been captured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderScope {
    vars: Scope,
}

impl RenderScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from layers, lowest precedence first.
    pub fn from_layers<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a Scope>,
    {
        let mut scope = Self::new();
        for layer in layers {
            scope.bind_all(layer);
        }
        scope
    }

    /// Bind a single variable, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Bind every entry of `layer` over the current bindings.
    pub fn bind_all(&mut self, layer: &Scope) {
        for (name, value) in layer {
            self.vars.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Enumerate the bindings in key order.
    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn as_map(&self) -> &Scope {
        &self.vars
    }

    pub fn into_map(self) -> Scope {
        self.vars
    }
}

impl From<Scope> for RenderScope {
    fn from(vars: Scope) -> Self {
        Self { vars }
    }
}
