//! `stupidly-view`: turns a view name into rendered output.
//!
//! [`PathResolver`] finds the template file, [`Viewer`] assembles the scope
//! and renders it, and [`App`] wraps one request with its own response,
//! debugger and profiler.

pub mod app;
pub mod container;
pub mod resolver;
pub mod sharer;
pub mod viewer;

pub use app::{App, Handled, RequestOptions, ViewRequest};
pub use container::Container;
pub use resolver::{PathResolver, ResolvedTemplate};
pub use sharer::SharedStore;
pub use viewer::Viewer;
