//! One application root, many requests.
//!
//! `App` holds what outlives a request (settings, viewer, shared store,
//! container). Every call to [`App::handle`] builds a fresh response and
//! debugger, so faults and profiling data never cross requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use stupidly_config::Settings;
use stupidly_core::{Fault, Response, Scope};
use stupidly_debug::{Debugger, ProfileReport};

use crate::container::Container;
use crate::resolver::PathResolver;
use crate::sharer::SharedStore;
use crate::viewer::Viewer;

/// A view name plus the request-local variables for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewRequest {
    pub name: String,
    pub data: Scope,
}

impl ViewRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Scope::new(),
        }
    }

    pub fn with_data(mut self, data: Scope) -> Self {
        self.data = data;
        self
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Run a profiling session around the request.
    pub profile: bool,
    /// Append the "Request takes N milliseconds" line.
    pub exec_time: bool,
}

/// The outcome of a request.
#[derive(Debug)]
pub struct Handled {
    pub response: Response,
    pub profile: Option<ProfileReport>,
}

#[derive(Debug, Clone)]
pub struct App {
    root: PathBuf,
    settings: Settings,
    viewer: Viewer,
    debug: bool,
    protocol: String,
}

impl App {
    /// Build an app rooted at `root`. The shared store is seeded from the
    /// settings' `[shared]` table. The debug flag and protocol are read once
    /// here, environment overrides included.
    pub fn new(root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self::with_container(root, settings, Container::new())
    }

    pub fn with_container(root: impl Into<PathBuf>, settings: Settings, container: Container) -> Self {
        let root = root.into();
        let resolver = PathResolver::new(&root, settings.views.template_ext.clone());
        let shared = SharedStore::from_scope(settings.shared.clone());
        let viewer = Viewer::new(resolver)
            .with_shared(Arc::new(shared))
            .with_container(Arc::new(container));
        let debug = settings.debug_enabled();
        let protocol = settings.protocol();
        Self {
            root,
            settings,
            viewer,
            debug,
            protocol,
        }
    }

    /// Force the error page tier regardless of settings and environment.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Serve one view request. `origin` is when the request started.
    pub fn handle(&self, request: &ViewRequest, options: RequestOptions, origin: Instant) -> Handled {
        let mut response = Response::new(self.protocol.as_str());
        let mut debugger = Debugger::new(self.debug, origin);

        if options.profile {
            debugger.profiler_mut().start();
        }

        let viewer = &self.viewer;
        debugger.guard(&mut response, |dbg, resp| {
            viewer
                .show(dbg, resp, &request.name, &request.data)
                .map_err(Fault::from)
        });

        if options.exec_time {
            debugger.exec_time(&mut response);
        }

        let profile = options.profile.then(|| debugger.profiler_mut().end());
        log::info!("{} {:?} -> {}", response.protocol(), request.name, response.status());

        Handled { response, profile }
    }
}
