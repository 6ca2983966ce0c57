//! Built-in error pages.
//!
//! Both pages are Lua templates compiled into the binary and rendered through
//! the same [`Renderer`] as application views. They inline the stylesheet.

use std::fmt;

use stupidly_core::{Fault, RenderScope};
use stupidly_render::{RenderError, Renderer};

const STYLE: &str = include_str!("../pages/style.css");
const SIMPLE_PAGE: &str = include_str!("../pages/simple.lua");
const FULL_PAGE: &str = include_str!("../pages/full.lua");

/// Error page verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTier {
    /// Fixed message only.
    Simple,
    /// Raw fault payload: message, file, line, severity.
    Full,
}

impl DisplayTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayTier::Simple => "simple",
            DisplayTier::Full => "full",
        }
    }
}

impl fmt::Display for DisplayTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error page together with what it displays.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPage {
    Simple { message: String },
    /// The payload is shown unescaped. Only for trusted, non-production use.
    Full(Fault),
}

impl ErrorPage {
    pub fn simple(message: impl Into<String>) -> Self {
        ErrorPage::Simple { message: message.into() }
    }

    pub fn tier(&self) -> DisplayTier {
        match self {
            ErrorPage::Simple { .. } => DisplayTier::Simple,
            ErrorPage::Full(_) => DisplayTier::Full,
        }
    }

    fn scope(&self) -> RenderScope {
        let mut scope = match self {
            ErrorPage::Simple { message } => {
                let mut scope = RenderScope::new();
                scope.bind("message", message.as_str().into());
                scope
            }
            ErrorPage::Full(fault) => RenderScope::from(fault.to_scope()),
        };
        scope.bind("style", STYLE.into());
        scope
    }

    /// Embedded template source for this page's tier.
    pub(crate) fn source(&self) -> &'static str {
        match self.tier() {
            DisplayTier::Simple => SIMPLE_PAGE,
            DisplayTier::Full => FULL_PAGE,
        }
    }

    pub fn render(&self, renderer: &Renderer) -> Result<String, RenderError> {
        self.render_with(renderer, self.source())
    }

    /// Render this page's bindings through `source` instead of the embedded
    /// template.
    pub(crate) fn render_with(&self, renderer: &Renderer, source: &str) -> Result<String, RenderError> {
        let name = format!("errorpage/{}.lua", self.tier());
        renderer.render_source(&name, source, &self.scope())
    }
}
