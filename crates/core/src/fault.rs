//! Runtime faults and the per-thread "last fault" slot.
//!
//! Anything that goes wrong while a request is being served (a template that
//! fails to execute, a Lua `warn()`, a panic) is recorded here. The debugger
//! later takes the most recent fault and decides how to display it.
//!
//! The slot is thread-local: one request runs on one thread, so faults never
//! leak between concurrently served requests.

use std::cell::RefCell;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::scope::Scope;

/// How serious a recorded fault is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A template or runtime error that aborted execution.
    Error,
    /// A non-fatal diagnostic raised by a template.
    Warning,
    /// A Rust panic caught at the request boundary.
    Panic,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Panic => "panic",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw payload of a runtime fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fault {
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub severity: Severity,
}

impl Fault {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            line: None,
            severity,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Attach a source location.
    pub fn at(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    /// Template bindings for the full error page.
    pub fn to_scope(&self) -> Scope {
        let mut scope = Scope::new();
        scope.insert("message".into(), json!(self.message));
        scope.insert(
            "file".into(),
            self.file.as_deref().map_or(Value::Null, |f| json!(f)),
        );
        scope.insert(
            "line".into(),
            self.line.map_or(Value::Null, |l| json!(l)),
        );
        scope.insert("severity".into(), json!(self.severity.as_str()));
        scope
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, " in {file} on line {line}"),
            (Some(file), None) => write!(f, " in {file}"),
            _ => Ok(()),
        }
    }
}

thread_local! {
    static LAST_FAULT: RefCell<Option<Fault>> = const { RefCell::new(None) };
}

/// Record a fault as the most recent one on this thread.
pub fn record(fault: Fault) {
    log::debug!("fault recorded: {}", fault);
    LAST_FAULT.with(|slot| *slot.borrow_mut() = Some(fault));
}

/// Take the most recent fault, leaving the slot empty.
pub fn take_last() -> Option<Fault> {
    LAST_FAULT.with(|slot| slot.borrow_mut().take())
}

/// Look at the most recent fault without consuming it.
pub fn last() -> Option<Fault> {
    LAST_FAULT.with(|slot| slot.borrow().clone())
}

/// Forget any recorded fault.
pub fn clear() {
    LAST_FAULT.with(|slot| *slot.borrow_mut() = None);
}
