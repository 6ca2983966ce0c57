//! Lua runtime for template rendering.
//!
//! Every render gets a fresh `mlua::Lua` state, so nothing a template does
//! survives into the next render. The state is not sandboxed: templates keep
//! the standard Lua libraries.
//!
//! Output is collected through two globals installed before the chunk runs:
//!
//! - `echo(...)` appends each argument's string form, no separators
//! - `print(...)` appends arguments joined by tabs, then a newline
//!
//! `null` is bound to the sentinel JSON nulls convert to, so templates can
//! test `value == null`.
//!
//! Lua `warn(...)` messages are recorded as warning faults on the current
//! thread (see [`stupidly_core::fault`]).

use mlua::{Function, Lua, LuaSerdeExt, MultiValue, Value};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use stupidly_core::{fault, Fault, RenderScope};

use crate::error::RenderError;

/// Marker Lua appends before a traceback in runtime error messages.
const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Executes templates against a [`RenderScope`].
#[derive(Debug, Clone, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a template file and return its captured output.
    pub fn render(&self, path: &Path, scope: &RenderScope) -> Result<String, RenderError> {
        let source = fs::read_to_string(path).map_err(|e| RenderError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.render_source(&path.display().to_string(), &source, scope)
    }

    /// Render in-memory template source. `name` is used in error locations.
    pub fn render_source(
        &self,
        name: &str,
        source: &str,
        scope: &RenderScope,
    ) -> Result<String, RenderError> {
        let lua = Lua::new();
        let output = Rc::new(RefCell::new(String::new()));

        install_builtins(&lua, output.clone()).map_err(|e| RenderError::Setup(e.to_string()))?;
        install_warnings(&lua, name);
        let args = bind_scope(&lua, scope).map_err(|e| RenderError::Setup(e.to_string()))?;

        lua.load(source)
            .set_name(format!("@{name}"))
            .call::<()>(args)
            .map_err(|e| execution_error(name, &e))?;

        let text = output.borrow().clone();
        log::debug!("rendered {} ({} bytes)", name, text.len());
        Ok(text)
    }
}

/// Install `null`, plus `echo` and `print`, both writing into `output`.
fn install_builtins(lua: &Lua, output: Rc<RefCell<String>>) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("null", lua.null())?;

    {
        let out = output.clone();
        let echo_fn = lua.create_function(move |lua, args: MultiValue| {
            let mut buf = String::new();
            for value in args {
                if value.is_nil() || value.is_null() {
                    continue;
                }
                buf.push_str(&display_value(lua, value)?);
            }
            out.borrow_mut().push_str(&buf);
            Ok(())
        })?;
        globals.set("echo", echo_fn)?;
    }

    {
        let out = output;
        let print_fn = lua.create_function(move |lua, args: MultiValue| {
            let parts = args
                .into_iter()
                .map(|v| display_value(lua, v))
                .collect::<mlua::Result<Vec<String>>>()?;
            let mut out = out.borrow_mut();
            out.push_str(&parts.join("\t"));
            out.push('\n');
            Ok(())
        })?;
        globals.set("print", print_fn)?;
    }

    Ok(())
}

/// Route `warn(...)` into the fault slot. Control messages (`@on`, `@off`)
/// are ignored; multi-part messages are joined before recording.
fn install_warnings(lua: &Lua, name: &str) {
    let template = name.to_string();
    let pending = RefCell::new(String::new());
    lua.set_warning_function(move |_, msg: &str, incomplete: bool| {
        let mut pending = pending.borrow_mut();
        if pending.is_empty() && !incomplete && msg.starts_with('@') {
            return Ok(());
        }
        pending.push_str(msg);
        if !incomplete {
            let message = std::mem::take(&mut *pending);
            log::warn!("{}: {}", template, message);
            fault::record(Fault::warning(message).at(template.clone(), None));
        }
        Ok(())
    });
}

/// Bind the scope: identifier keys become globals, and the full scope is
/// returned as a table for the chunk's `...`.
fn bind_scope(lua: &Lua, scope: &RenderScope) -> mlua::Result<mlua::Table> {
    let globals = lua.globals();
    let table = lua.create_table()?;
    for (name, value) in scope.bindings() {
        let lua_value = lua.to_value(value)?;
        table.set(name.as_str(), lua_value.clone())?;
        if is_identifier(name) {
            globals.set(name.as_str(), lua_value)?;
        } else {
            log::debug!("variable {name:?} is not a Lua identifier; reachable through ... only");
        }
    }
    Ok(table)
}

/// Convert a Lua value to output text.
fn display_value(lua: &Lua, value: Value) -> mlua::Result<String> {
    match value {
        Value::String(s) => Ok(s.to_string_lossy()),
        Value::Integer(i) => Ok(i.to_string()),
        v if v.is_null() => Ok("null".to_string()),
        other => {
            let tostring: Function = lua.globals().get("tostring")?;
            tostring.call::<String>(other)
        }
    }
}

/// True for names Lua accepts as a global variable name.
pub fn is_identifier(name: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
        "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
    ];
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !KEYWORDS.contains(&name)
}

fn execution_error(template: &str, error: &mlua::Error) -> RenderError {
    let raw = lua_error_message(error);
    let trimmed = match raw.find(TRACEBACK_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw.as_str(),
    };
    let (line, message) = split_location(trimmed);
    RenderError::Execution {
        template: template.to_string(),
        line,
        message: message.trim().to_string(),
    }
}

fn lua_error_message(error: &mlua::Error) -> String {
    match error {
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(msg) => msg.clone(),
        mlua::Error::CallbackError { cause, .. } => lua_error_message(cause),
        other => other.to_string(),
    }
}

/// Split `chunk:LINE: message` into the line number and the message.
fn split_location(msg: &str) -> (Option<u32>, &str) {
    for (idx, _) in msg.match_indices(':') {
        let rest = &msg[idx + 1..];
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            continue;
        }
        if let Some(tail) = rest[digits..].strip_prefix(':') {
            if let Ok(line) = rest[..digits].parse() {
                return (Some(line), tail);
            }
        }
    }
    (None, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stupidly_core::Scope;

    fn scope(value: serde_json::Value) -> RenderScope {
        match value {
            serde_json::Value::Object(map) => RenderScope::from(map),
            _ => RenderScope::new(),
        }
    }

    #[test]
    fn echo_and_print_are_captured_in_order() {
        let out = Renderer::new()
            .render_source("t", r#"echo("a", 1, "b") print("x", 2) echo("end")"#, &RenderScope::new())
            .unwrap();
        assert_eq!(out, "a1bx\t2\nend");
    }

    #[test]
    fn scope_keys_are_globals() {
        let out = Renderer::new()
            .render_source(
                "t",
                r#"echo(title, " by ", user.name, " #", user.tags[2])"#,
                &scope(json!({ "title": "Hello", "user": { "name": "ana", "tags": ["x", "y"] } })),
            )
            .unwrap();
        assert_eq!(out, "Hello by ana #y");
    }

    #[test]
    fn non_identifier_keys_reachable_through_varargs() {
        let out = Renderer::new()
            .render_source(
                "t",
                r#"local scope = ... echo(scope["page-title"], "/", tostring(rawget(_G, "page-title")))"#,
                &scope(json!({ "page-title": "Docs" })),
            )
            .unwrap();
        assert_eq!(out, "Docs/nil");
    }

    #[test]
    fn echo_skips_nil_and_null() {
        let out = Renderer::new()
            .render_source("t", r#"echo("[", missing, nothing, "]")"#, &scope(json!({ "nothing": null })))
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn json_null_compares_equal_to_null_global() {
        let out = Renderer::new()
            .render_source("t", r#"echo(tostring(nothing == null), tostring(missing == null))"#, &scope(json!({ "nothing": null })))
            .unwrap();
        assert_eq!(out, "truefalse");
    }

    #[test]
    fn fresh_state_per_render() {
        let r = Renderer::new();
        r.render_source("a", "leaked = 'yes'", &RenderScope::new()).unwrap();
        let out = r.render_source("b", "echo(tostring(leaked))", &RenderScope::new()).unwrap();
        assert_eq!(out, "nil");
    }

    #[test]
    fn runtime_error_reports_line() {
        let err = Renderer::new()
            .render_source("views/broken.lua", "echo('ok')\nlocal x = nil\nx.field = 1\n", &RenderScope::new())
            .unwrap_err();
        match err {
            RenderError::Execution { template, line, message } => {
                assert_eq!(template, "views/broken.lua");
                assert_eq!(line, Some(3));
                assert!(message.contains("nil"), "{message}");
                assert!(!message.contains("stack traceback"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = Renderer::new()
            .render_source("bad.lua", "echo('a')\n\nif then\n", &RenderScope::new())
            .unwrap_err();
        match err {
            RenderError::Execution { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_call_with_string_keeps_message() {
        let err = Renderer::new()
            .render_source("e.lua", "error('custom failure')", &RenderScope::new())
            .unwrap_err();
        match err {
            RenderError::Execution { line, message, .. } => {
                assert_eq!(line, Some(1));
                assert_eq!(message, "custom failure");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn warn_records_warning_fault() {
        fault::clear();
        let out = Renderer::new()
            .render_source("w.lua", "warn('@on') warn('low ', 'disk') echo('done')", &RenderScope::new())
            .unwrap();
        assert_eq!(out, "done");
        let recorded = fault::take_last().expect("warning recorded");
        assert_eq!(recorded.severity, stupidly_core::Severity::Warning);
        assert_eq!(recorded.message, "low disk");
        assert_eq!(recorded.file.as_deref(), Some("w.lua"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Renderer::new()
            .render(&dir.path().join("nope.lua"), &RenderScope::from(Scope::new()))
            .unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("title"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("page-title"));
        assert!(!is_identifier("end"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn split_location_parses_prefix() {
        assert_eq!(split_location("a/b.lua:12: boom"), (Some(12), " boom"));
        assert_eq!(split_location("no location"), (None, "no location"));
        assert_eq!(split_location("C:\\x.lua:4: e"), (Some(4), " e"));
    }
}
