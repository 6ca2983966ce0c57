//! Finds, renders and writes views. Reports a 404 for missing or reserved
//! names.

use std::sync::Arc;

use stupidly_core::{RenderScope, Response, Scope};
use stupidly_debug::Debugger;
use stupidly_render::{RenderError, Renderer};

use crate::container::Container;
use crate::resolver::{PathResolver, ResolvedTemplate};
use crate::sharer::SharedStore;

/// Scope key holding the container's exported entries.
pub const APP_BINDING: &str = "app";

/// Profile kind for the viewer's own checkpoints.
pub const VIEWER_KIND: &str = "viewer";

#[derive(Debug, Clone)]
pub struct Viewer {
    resolver: PathResolver,
    renderer: Renderer,
    shared: Arc<SharedStore>,
    container: Arc<Container>,
}

impl Viewer {
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            renderer: Renderer::new(),
            shared: Arc::new(SharedStore::new()),
            container: Arc::new(Container::new()),
        }
    }

    pub fn with_shared(mut self, shared: Arc<SharedStore>) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_container(mut self, container: Arc<Container>) -> Self {
        self.container = container;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn shared(&self) -> &SharedStore {
        &self.shared
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Assemble the render scope: container exports (as `app`), then the
    /// shared store, then `local`. Later layers win.
    pub fn scope(&self, local: &Scope) -> RenderScope {
        let mut scope = RenderScope::new();
        let exports = self.container.exports();
        if !exports.is_empty() {
            scope.bind(APP_BINDING, exports.into());
        }
        if let Some(shared) = self.shared.get() {
            scope.bind_all(shared);
        }
        scope.bind_all(local);
        scope
    }

    /// Render a resolved template with `local` over the ambient variables.
    pub fn render(&self, template: &ResolvedTemplate, local: &Scope) -> Result<String, RenderError> {
        self.renderer.render(&template.path, &self.scope(local))
    }

    /// Resolve `name`, render it and write the output to `response`.
    ///
    /// Reserved and unresolvable names are reported as a terminating 404.
    /// Render failures are returned to the caller, not handled here.
    pub fn show(
        &self,
        debugger: &mut Debugger,
        response: &mut Response,
        name: &str,
        local: &Scope,
    ) -> Result<(), RenderError> {
        if self.resolver.is_reserved(name) {
            log::info!("refusing to serve reserved view {name:?}");
            debugger.report(response, 404, true);
            return Ok(());
        }

        let resolved = self.resolver.resolve(name);
        checkpoint(debugger, &format!("resolve {name}"));

        let Some(template) = resolved else {
            debugger.report(response, 404, true);
            return Ok(());
        };

        let output = self.render(&template, local)?;
        checkpoint(debugger, &format!("render {name}"));
        response.write(&output);
        Ok(())
    }
}

fn checkpoint(debugger: &mut Debugger, name: &str) {
    let profiler = debugger.profiler_mut();
    if profiler.is_active() {
        profiler.add(name, VIEWER_KIND);
    }
}
