//! Template overrides: the registry capability and the localized file
//! resolver.
//!
//! # Design
//! The list server looks up notice and footer texts by template key. A key
//! can be overridden site-wide (no scope) or for a single list (scope is the
//! list id). `TemplateResolver` walks the known keys, maps each to a file in
//! a localized directory and registers only the files that actually exist,
//! so a partial translation never blocks list creation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;

/// Template root used when none is configured.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Key of the notice sent to new members.
pub const WELCOME_TEMPLATE: &str = "list:user:notice:welcome";

/// Every template key the list server knows, with its default file.
///
/// Keys mapped to `None` have no file of their own.
pub const ALL_TEMPLATES: &[(&str, Option<&str>)] = &[
    ("list:admin:action:post", Some("list:admin:action:post.txt")),
    ("list:admin:action:subscribe", Some("list:admin:action:subscribe.txt")),
    ("list:admin:action:unsubscribe", Some("list:admin:action:unsubscribe.txt")),
    ("list:admin:notice:subscribe", Some("list:admin:notice:subscribe.txt")),
    ("list:admin:notice:unrecognized", Some("list:admin:notice:unrecognized.txt")),
    ("list:admin:notice:unsubscribe", Some("list:admin:notice:unsubscribe.txt")),
    ("list:member:digest:footer", Some("list:member:generic:footer.txt")),
    ("list:member:digest:header", None),
    ("list:member:digest:masthead", Some("list:member:digest:masthead.txt")),
    ("list:member:generic:footer", Some("list:member:generic:footer.txt")),
    ("list:member:regular:footer", Some("list:member:generic:footer.txt")),
    ("list:member:regular:header", None),
    ("list:user:action:subscribe", Some("list:user:action:subscribe.txt")),
    ("list:user:action:unsubscribe", Some("list:user:action:unsubscribe.txt")),
    ("list:user:notice:goodbye", None),
    ("list:user:notice:hold", Some("list:user:notice:hold.txt")),
    ("list:user:notice:no-more-today", Some("list:user:notice:no-more-today.txt")),
    ("list:user:notice:post", Some("list:user:notice:post.txt")),
    ("list:user:notice:probe", Some("list:user:notice:probe.txt")),
    ("list:user:notice:refuse", Some("list:user:notice:refuse.txt")),
    ("list:user:notice:rejected", Some("list:user:notice:rejected.txt")),
    ("list:user:notice:welcome", Some("list:user:notice:welcome.txt")),
];

/// Receives template overrides.
pub trait TemplateRegistry {
    /// Point `key` at `uri`, for list `scope` or site-wide when `None`.
    fn set_template(&mut self, key: &str, scope: Option<&str>, uri: &str);
}

/// In-memory `TemplateRegistry`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateManager {
    entries: BTreeMap<(String, Option<String>), String>,
}

impl TemplateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str, scope: Option<&str>) -> Option<&str> {
        self.entries
            .get(&(key.to_string(), scope.map(str::to_string)))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overrides as `(key, scope, uri)`, ordered by key then scope.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>, &str)> {
        self.entries
            .iter()
            .map(|((key, scope), uri)| (key.as_str(), scope.as_deref(), uri.as_str()))
    }

    /// Overrides registered for one list scope, as `(key, uri)`.
    pub fn scoped<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter()
            .filter(move |(_, s, _)| *s == Some(scope))
            .map(|(key, _, uri)| (key, uri))
    }
}

impl TemplateRegistry for TemplateManager {
    fn set_template(&mut self, key: &str, scope: Option<&str>, uri: &str) {
        self.entries
            .insert((key.to_string(), scope.map(str::to_string)), uri.to_string());
    }
}

/// Maps template keys to files under one localized directory.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    base_dir: PathBuf,
}

impl TemplateResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolver for `root/language`, e.g. `templates/de`.
    pub fn localized(root: impl AsRef<Path>, language: &str) -> Self {
        Self::new(root.as_ref().join(language))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `file://` URI of `relative_path`, if that file exists.
    pub fn resolve(&self, relative_path: &str) -> Option<String> {
        let candidate = self.base_dir.join(relative_path);
        let absolute = match fs::canonicalize(&candidate) {
            Ok(path) => path,
            Err(err) => {
                debug!(path = %candidate.display(), error = %err, "template file not found");
                return None;
            }
        };
        if !absolute.is_file() {
            debug!(path = %absolute.display(), "template path is not a file");
            return None;
        }
        Url::from_file_path(&absolute).ok().map(String::from)
    }

    /// Register every resolvable entry site-wide; returns how many were set.
    pub fn apply(&self, templates: &[(&str, Option<&str>)], registry: &mut dyn TemplateRegistry) -> usize {
        let mut registered = 0;
        for (key, relative_path) in templates {
            let Some(relative_path) = relative_path else {
                continue;
            };
            if let Some(uri) = self.resolve(relative_path) {
                info!(%key, %uri, "registering template");
                registry.set_template(key, None, &uri);
                registered += 1;
            }
        }
        registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Option<String>, String)>,
    }

    impl TemplateRegistry for Recorder {
        fn set_template(&mut self, key: &str, scope: Option<&str>, uri: &str) {
            self.calls
                .push((key.to_string(), scope.map(str::to_string), uri.to_string()));
        }
    }

    #[test]
    fn only_existing_files_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("present.txt"), "Hallo").unwrap();
        let resolver = TemplateResolver::new(dir.path());
        let registry = [
            ("list:user:notice:welcome", Some("present.txt")),
            ("list:user:notice:hold", Some("absent.txt")),
            ("list:member:regular:header", None),
        ];
        let mut recorder = Recorder::default();

        let registered = resolver.apply(&registry, &mut recorder);

        assert_eq!(registered, 1);
        assert_eq!(recorder.calls.len(), 1);
        let (key, scope, uri) = &recorder.calls[0];
        assert_eq!(key, "list:user:notice:welcome");
        assert!(scope.is_none());
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("/present.txt"));
    }

    #[test]
    fn localized_appends_language() {
        let resolver = TemplateResolver::localized("/srv/templates", "de");
        assert_eq!(resolver.base_dir(), Path::new("/srv/templates/de"));
    }

    #[test]
    fn directories_are_not_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let resolver = TemplateResolver::new(dir.path());
        assert!(resolver.resolve("nested").is_none());
    }

    #[test]
    fn colons_in_file_names_resolve() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("list:user:notice:welcome.txt"), "Willkommen").unwrap();
        let resolver = TemplateResolver::new(dir.path());
        let mut manager = TemplateManager::new();

        let registered = resolver.apply(ALL_TEMPLATES, &mut manager);

        assert_eq!(registered, 1);
        assert!(manager.get(WELCOME_TEMPLATE, None).is_some());
    }

    #[test]
    fn manager_separates_scopes() {
        let mut manager = TemplateManager::new();
        manager.set_template(WELCOME_TEMPLATE, None, "file:///site.txt");
        manager.set_template(WELCOME_TEMPLATE, Some("klasse-6a.school.example"), "file:///6a.txt");

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.get(WELCOME_TEMPLATE, None), Some("file:///site.txt"));
        let scoped: Vec<_> = manager.scoped("klasse-6a.school.example").collect();
        assert_eq!(scoped, vec![(WELCOME_TEMPLATE, "file:///6a.txt")]);
    }
}
