//! View name → template file.
//!
//! Candidates, first existing file wins:
//!
//! 1. `<root>/<name>`
//! 2. `<root>/resources/views/<name>`
//! 3. `<root>/resources/views/<name>.<ext>`
//! 4. `<root>/<name>.<ext>`

use std::path::{Component, Path, PathBuf};

/// Directory under the root holding view templates.
pub const VIEWS_DIR: &str = "resources/views";

/// Names that never resolve, whatever exists on disk.
pub const RESERVED_NAMES: [&str; 2] = ["index", "index.hh"];

/// A template file that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    template_ext: String,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, template_ext: impl Into<String>) -> Self {
        let template_ext = template_ext.into();
        Self {
            root: root.into(),
            template_ext: template_ext.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn template_ext(&self) -> &str {
        &self.template_ext
    }

    /// `index`, `index.hh` and `index.<ext>` are the application's own entry
    /// point and are never served as views.
    pub fn is_reserved(&self, name: &str) -> bool {
        RESERVED_NAMES.contains(&name)
            || name
                .strip_prefix("index.")
                .is_some_and(|ext| ext == self.template_ext)
    }

    /// The four candidate paths, in lookup order. A leading `/` or drive
    /// prefix on `name` is dropped, so every candidate sits under the root.
    pub fn candidates(&self, name: &str) -> [PathBuf; 4] {
        let name = relative_name(name).unwrap_or_default();
        let views = self.root.join(VIEWS_DIR);
        let with_ext = format!("{name}.{}", self.template_ext);
        [
            self.root.join(&name),
            views.join(&name),
            views.join(&with_ext),
            self.root.join(&with_ext),
        ]
    }

    /// Find the template for `name`. `None` for reserved names and when no
    /// candidate exists.
    pub fn resolve(&self, name: &str) -> Option<ResolvedTemplate> {
        let Some(relative) = relative_name(name) else {
            log::info!("view {name:?} escapes the application root");
            return None;
        };
        if self.is_reserved(name) || self.is_reserved(&relative) {
            log::info!("view {name:?} is reserved");
            return None;
        }
        let found = self.candidates(&relative).into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => log::debug!("view {name:?} -> {}", path.display()),
            None => log::debug!("view {name:?} not found under {}", self.root.display()),
        }
        found.map(|path| ResolvedTemplate { path })
    }
}

/// `name` as a `/`-joined path relative to the root. Root and prefix
/// components are dropped. `None` for `..` components and for names with
/// nothing left.
fn relative_name(name: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "echo('x')").unwrap();
        path
    }

    #[test]
    fn third_candidate_when_only_views_file_with_ext_exists() {
        let dir = tempfile::tempdir().unwrap();
        let expected = touch(dir.path(), "resources/views/home.lua");
        let resolver = PathResolver::new(dir.path(), "lua");
        assert_eq!(resolver.resolve("home"), Some(ResolvedTemplate { path: expected }));
    }

    #[test]
    fn earlier_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "home.lua");
        touch(dir.path(), "resources/views/home.lua");
        let exact = touch(dir.path(), "resources/views/home");
        let resolver = PathResolver::new(dir.path(), "lua");
        assert_eq!(resolver.resolve("home").unwrap().path, exact);

        let root_exact = touch(dir.path(), "home");
        assert_eq!(resolver.resolve("home").unwrap().path, root_exact);
    }

    #[test]
    fn fourth_candidate_is_root_with_ext() {
        let dir = tempfile::tempdir().unwrap();
        let expected = touch(dir.path(), "about.lua");
        let resolver = PathResolver::new(dir.path(), "lua");
        assert_eq!(resolver.resolve("about").unwrap().path, expected);
    }

    #[test]
    fn reserved_names_never_resolve() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index");
        touch(dir.path(), "index.hh");
        touch(dir.path(), "index.lua");
        touch(dir.path(), "resources/views/index.lua");
        let resolver = PathResolver::new(dir.path(), "lua");
        for name in ["index", "index.hh", "index.lua"] {
            assert!(resolver.is_reserved(name));
            assert_eq!(resolver.resolve(name), None, "{name}");
        }
        assert!(!resolver.is_reserved("indexes"));
    }

    #[test]
    fn absolute_names_stay_under_root() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let outside = touch(elsewhere.path(), "secret.lua");
        let resolver = PathResolver::new(root.path(), "lua");

        assert_eq!(resolver.resolve(outside.to_str().unwrap()), None);
        for candidate in resolver.candidates(outside.to_str().unwrap()) {
            assert!(candidate.starts_with(root.path()), "{}", candidate.display());
        }

        let inside = touch(root.path(), "resources/views/home.lua");
        assert_eq!(resolver.resolve("/home").unwrap().path, inside);
        assert_eq!(resolver.resolve("/index"), None);
    }

    #[test]
    fn parent_components_never_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        touch(dir.path(), "secret.lua");
        touch(&app, "resources/views/home.lua");
        let resolver = PathResolver::new(&app, "lua");

        assert_eq!(resolver.resolve("../secret"), None);
        assert_eq!(resolver.resolve("resources/../../secret"), None);
        assert_eq!(resolver.resolve("./home").unwrap().path, app.join("resources/views/home.lua"));
        assert_eq!(resolver.resolve(""), None);
        assert_eq!(resolver.resolve("/"), None);
    }

    #[test]
    fn missing_view_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path(), "lua");
        assert_eq!(resolver.resolve("nope"), None);
    }

    #[test]
    fn directories_are_not_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("resources/views/blog")).unwrap();
        let expected = touch(dir.path(), "resources/views/blog.lua");
        let resolver = PathResolver::new(dir.path(), "lua");
        assert_eq!(resolver.resolve("blog").unwrap().path, expected);
    }

    #[test]
    fn nested_names_and_leading_dot_in_ext() {
        let dir = tempfile::tempdir().unwrap();
        let expected = touch(dir.path(), "resources/views/admin/users.tpl");
        let resolver = PathResolver::new(dir.path(), ".tpl");
        assert_eq!(resolver.template_ext(), "tpl");
        assert_eq!(resolver.resolve("admin/users").unwrap().path, expected);
    }

    #[test]
    fn candidates_are_in_lookup_order() {
        let resolver = PathResolver::new("/app", "lua");
        let c = resolver.candidates("home");
        assert_eq!(c[0], PathBuf::from("/app/home"));
        assert_eq!(c[1], PathBuf::from("/app/resources/views/home"));
        assert_eq!(c[2], PathBuf::from("/app/resources/views/home.lua"));
        assert_eq!(c[3], PathBuf::from("/app/home.lua"));
    }
}
