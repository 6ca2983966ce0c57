use std::fs;
use std::path::Path;

use serde_json::Value;
use stupidly_core::Scope;

/// Parse a `--var KEY=VALUE` argument. The value is read as JSON when it
/// parses, otherwise kept as a plain string.
pub(crate) fn parse_var(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("invalid --var \"{}\" (expected KEY=VALUE)", arg))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid --var \"{}\" (empty key)", arg));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Read a JSON object from `path` for use as local view data.
pub(crate) fn read_data_file(path: &Path) -> Result<Scope, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("{}: expected a JSON object", path.display())),
        Err(e) => Err(format!("{}: {}", path.display(), e)),
    }
}

/// Local data for a render: the `--data` file first, `--var` entries on top.
pub(crate) fn build_data(data_file: Option<&Path>, vars: &[String]) -> Result<Scope, String> {
    let mut data = match data_file {
        Some(path) => read_data_file(path)?,
        None => Scope::new(),
    };
    for arg in vars {
        let (key, value) = parse_var(arg)?;
        data.insert(key, value);
    }
    Ok(data)
}
