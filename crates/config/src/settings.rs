// Application settings
// Loaded from <root>/stupidly.toml, falling back to ~/.config/stupidly/settings.toml

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::env;
use crate::error::ConfigError;

/// File name looked up in the application root.
pub const APP_CONFIG_FILE: &str = "stupidly.toml";

/// View lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Extension appended by the third and fourth resolution candidates
    pub template_ext: String,

    /// View served for `/`
    pub index_view: String,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            template_ext: "lua".to_string(),
            index_view: "home".to_string(),
        }
    }
}

/// Error page verbosity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Show the full fault payload instead of a generic message.
    /// The DEBUG environment variable takes precedence when set.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Protocol written in status lines. SERVER_PROTOCOL takes precedence.
    pub protocol: String,

    /// Address for `stupidly serve`
    pub listen: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            protocol: "HTTP/1.1".to_string(),
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub views: ViewSettings,

    pub debug: DebugSettings,

    pub http: HttpSettings,

    /// Variables seeded into the shared store for every render
    pub shared: Map<String, Value>,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The per-user settings file path
    pub fn user_config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stupidly");
        config_dir.join("settings.toml")
    }

    /// The settings file path inside an application root
    pub fn app_config_path(root: &Path) -> PathBuf {
        root.join(APP_CONFIG_FILE)
    }

    /// The first settings file that exists for `root`, if any.
    pub fn config_path(root: &Path) -> Option<PathBuf> {
        let app = Self::app_config_path(root);
        if app.is_file() {
            return Some(app);
        }
        let user = Self::user_config_path();
        if user.is_file() {
            return Some(user);
        }
        None
    }

    /// Load settings for an application root. Missing files give defaults;
    /// unreadable or malformed files are errors.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        match Self::config_path(root) {
            Some(path) => Self::load_from(&path),
            None => {
                log::debug!("no settings file for {}, using defaults", root.display());
                Ok(Self::default())
            }
        }
    }

    /// Load settings from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, logging and falling back to defaults on any error.
    pub fn load_or_default(root: &Path) -> Self {
        match Self::load(root) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Save current settings to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |message: String| ConfigError::Write {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let text = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        fs::write(path, text).map_err(|e| write_err(e.to_string()))
    }

    /// Write a commented default settings file to `path`.
    pub fn write_default_file(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        fs::write(path, Self::default_file_contents()).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Default settings file with comments
    pub fn default_file_contents() -> &'static str {
        r#"# View lookup
[views]
# Extension tried by the resources/views/<name>.<ext> and <name>.<ext> candidates
template_ext = "lua"
# View served for "/" by `stupidly serve`
index_view = "home"

# Error pages
[debug]
# true = full fault payload (message, file, line, severity) on error pages.
# Never enable in production. The DEBUG environment variable overrides this.
enabled = false

[http]
# SERVER_PROTOCOL overrides this
protocol = "HTTP/1.1"
listen = "127.0.0.1:8080"

# Variables visible to every template
[shared]
"#
    }

    /// Whether the full error page is shown, honouring DEBUG when set.
    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled_with(env::flag(env::DEBUG_VAR))
    }

    /// `debug_enabled` with an explicit environment value.
    pub fn debug_enabled_with(&self, env_flag: Option<bool>) -> bool {
        env_flag.unwrap_or(self.debug.enabled)
    }

    /// Protocol for status lines, honouring SERVER_PROTOCOL when set.
    pub fn protocol(&self) -> String {
        env::string(env::SERVER_PROTOCOL_VAR).unwrap_or_else(|| self.http.protocol.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.views.template_ext, "lua");
        assert_eq!(s.views.index_view, "home");
        assert!(!s.debug.enabled);
        assert_eq!(s.http.protocol, "HTTP/1.1");
        assert_eq!(s.http.listen, "127.0.0.1:8080");
        assert!(s.shared.is_empty());
    }

    #[test]
    fn default_file_parses_to_defaults() {
        let parsed = Settings::from_toml(Settings::default_file_contents()).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed = Settings::from_toml(
            r#"
[views]
template_ext = "tpl"

[shared]
site = "Example"
year = 2017
"#,
        )
        .unwrap();
        assert_eq!(parsed.views.template_ext, "tpl");
        assert_eq!(parsed.views.index_view, "home");
        assert_eq!(parsed.shared["site"], "Example");
        assert_eq!(parsed.shared["year"], 2017);
    }

    #[test]
    fn env_flag_overrides_file() {
        let mut s = Settings::default();
        assert!(!s.debug_enabled_with(None));
        assert!(s.debug_enabled_with(Some(true)));
        s.debug.enabled = true;
        assert!(s.debug_enabled_with(None));
        assert!(!s.debug_enabled_with(Some(false)));
    }

    #[test]
    fn load_prefers_app_root_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(APP_CONFIG_FILE),
            "[views]\nindex_view = \"welcome\"\n",
        )
        .unwrap();
        let s = Settings::load(dir.path()).unwrap();
        assert_eq!(s.views.index_view, "welcome");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_CONFIG_FILE);
        fs::write(&path, "[views\n").unwrap();
        match Settings::load_from(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn save_round_trips_shared_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(APP_CONFIG_FILE);
        let mut s = Settings::default();
        s.shared.insert("title".into(), Value::String("Hi".into()));
        s.save(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, s);
    }
}
