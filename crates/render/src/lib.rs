//! `stupidly-render`: executes Lua templates.
//!
//! A template is a Lua 5.4 chunk. It sees every variable of its
//! [`RenderScope`](stupidly_core::RenderScope) as a global and produces text
//! through `echo(...)` and `print(...)`. Output is captured and returned as a
//! single string; nothing is streamed while the chunk runs.

pub mod error;
pub mod runtime;

pub use error::RenderError;
pub use runtime::Renderer;
