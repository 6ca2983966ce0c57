//! `stupidly-core`: types shared by every layer of the view pipeline.
//!
//! Nothing in here touches the filesystem or the Lua runtime.

pub mod fault;
pub mod response;
pub mod scope;

pub use fault::{Fault, Severity};
pub use response::{Response, Status};
pub use scope::{RenderScope, Scope};
