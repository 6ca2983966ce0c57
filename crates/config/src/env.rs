//! Environment variable overrides.

/// Enables the full error page when truthy.
pub const DEBUG_VAR: &str = "DEBUG";

/// Protocol used in emitted status lines (CGI convention).
pub const SERVER_PROTOCOL_VAR: &str = "SERVER_PROTOCOL";

/// Interpret a flag value. Empty, `0`, `false`, `off` and `no` are falsy
/// (case-insensitive); anything else is truthy.
pub fn parse_flag(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    !matches!(v.as_str(), "" | "0" | "false" | "off" | "no")
}

/// Read a flag from the environment. `None` when the variable is unset.
pub fn flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| parse_flag(&v))
}

/// Read a non-empty string from the environment.
pub fn string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_values() {
        for v in ["", "0", "false", "FALSE", "off", "No", "  0  "] {
            assert!(!parse_flag(v), "{v:?} should be falsy");
        }
    }

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "yes", "on", "2", "debug"] {
            assert!(parse_flag(v), "{v:?} should be truthy");
        }
    }
}
