use std::fmt;
use std::path::PathBuf;

use stupidly_core::Fault;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Template file could not be read.
    Io { path: PathBuf, message: String },
    /// The Lua state could not be prepared (capture functions, bindings).
    Setup(String),
    /// The template failed to compile or raised an error while running.
    Execution {
        template: String,
        line: Option<u32>,
        message: String,
    },
}

impl RenderError {
    /// Convert into a runtime fault for the debugger.
    pub fn to_fault(&self) -> Fault {
        match self {
            Self::Io { path, message } => {
                Fault::error(message.clone()).at(path.display().to_string(), None)
            }
            Self::Setup(message) => Fault::error(message.clone()),
            Self::Execution { template, line, message } => {
                Fault::error(message.clone()).at(template.clone(), *line)
            }
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read template {}: {message}", path.display()),
            Self::Setup(msg) => write!(f, "template runtime setup failed: {msg}"),
            Self::Execution { template, line: Some(line), message } => {
                write!(f, "{template}:{line}: {message}")
            }
            Self::Execution { template, line: None, message } => write!(f, "{template}: {message}"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<RenderError> for Fault {
    fn from(err: RenderError) -> Self {
        err.to_fault()
    }
}
