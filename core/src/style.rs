//! List styles: layered default configuration for new mailing lists.
//!
//! # Design
//! A style writes configuration values into a `StyleTarget`. Styles can
//! build on each other: the class-list style first applies its base style
//! (looked up through the `StyleRegistry` it is handed) and then overrides
//! identity, archiving and subscription settings. Registries are passed in
//! explicitly through `StyleContext` rather than looked up globally.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StyleError;
use crate::templates::{TemplateRegistry, TemplateResolver, DEFAULT_TEMPLATE_DIR, WELCOME_TEMPLATE};
use crate::types::{ArchivePolicy, Settings, SubscriptionPolicy};

pub const LEGACY_DEFAULT_STYLE: &str = "legacy-default";
pub const CLASS_LIST_STYLE: &str = "brandwerder-style";
pub const CLASS_WELCOME_TEMPLATE: &str = "list:user:notice:welcome-klasse.txt";

static CLASS_LIST_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"klasse-(.*)").expect("valid class list pattern"));

/// A named bundle of configuration values.
pub trait Style {
    fn name(&self) -> &str;

    fn apply(&self, target: &mut StyleTarget, context: &mut StyleContext<'_>) -> Result<(), StyleError>;
}

/// Looks up and registers styles by name.
pub trait StyleRegistry {
    fn get(&self, name: &str) -> Option<&dyn Style>;

    /// Fails with `AlreadyRegistered` if the name is taken.
    fn register(&mut self, style: Box<dyn Style>) -> Result<(), StyleError>;

    /// Register unless a style of the same name exists; returns whether it
    /// was added.
    fn register_if_absent(&mut self, style: Box<dyn Style>) -> bool {
        if self.get(style.name()).is_some() {
            return false;
        }
        self.register(style).is_ok()
    }
}

/// Capabilities a style may use while applying itself.
pub struct StyleContext<'a> {
    pub styles: &'a dyn StyleRegistry,
    pub templates: &'a mut dyn TemplateRegistry,
}

/// The list a style is applied to, and the configuration it accumulates.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTarget {
    list_name: String,
    mail_host: String,
    list_id: String,
    settings: Settings,
}

impl StyleTarget {
    pub fn new(list_name: &str, mail_host: &str) -> Self {
        Self {
            list_name: list_name.to_string(),
            mail_host: mail_host.to_string(),
            list_id: format!("{list_name}.{mail_host}"),
            settings: Settings::new(),
        }
    }

    pub fn with_list_id(mut self, list_id: &str) -> Self {
        self.list_id = list_id.to_string();
        self
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    pub fn mail_host(&self) -> &str {
        &self.mail_host
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.settings.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }
}

/// In-memory `StyleRegistry`.
#[derive(Default)]
pub struct StyleManager {
    styles: BTreeMap<String, Box<dyn Style>>,
}

impl StyleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager holding the legacy default style.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.register_if_absent(Box::new(LegacyDefaultStyle));
        manager
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }
}

impl StyleRegistry for StyleManager {
    fn get(&self, name: &str) -> Option<&dyn Style> {
        self.styles.get(name).map(|style| style.as_ref())
    }

    fn register(&mut self, style: Box<dyn Style>) -> Result<(), StyleError> {
        let name = style.name().to_string();
        if self.styles.contains_key(&name) {
            return Err(StyleError::AlreadyRegistered(name));
        }
        info!(style = %name, "registering style");
        self.styles.insert(name, style);
        Ok(())
    }
}

impl std::fmt::Debug for StyleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.styles.keys()).finish()
    }
}

/// The server's stock discussion-list defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyDefaultStyle;

impl Style for LegacyDefaultStyle {
    fn name(&self) -> &str {
        LEGACY_DEFAULT_STYLE
    }

    fn apply(&self, target: &mut StyleTarget, _context: &mut StyleContext<'_>) -> Result<(), StyleError> {
        let display_name = capitalize(target.list_name());
        target.set("display_name", display_name.clone());
        target.set("preferred_language", "en");
        target.set("subject_prefix", format!("[{display_name}] "));
        target.set("description", "");
        target.set("info", "");
        target.set("advertised", true);
        target.set("anonymous_list", false);
        target.set("send_welcome_message", true);
        target.set("send_goodbye_message", true);
        target.set("max_message_size", 40);
        target.set("reply_goes_to_list", "no_munging");
        target.set("first_strip_reply_to", false);
        target.set("include_rfc2369_headers", true);
        target.set("allow_list_posts", true);
        target.set("collapse_alternatives", true);
        target.set("convert_html_to_plaintext", false);
        target.set("digest_size_threshold", 30);
        target.set("admin_immed_notify", true);
        target.set("admin_notify_mchanges", false);
        target.set("default_member_action", "defer");
        target.set("default_nonmember_action", "hold");
        target.set("posting_pipeline", "default-posting-pipeline");
        target.set("archive_policy", ArchivePolicy::Public);
        target.set("subscription_policy", SubscriptionPolicy::Confirm);
        Ok(())
    }
}

/// Style for per-class school lists such as `klasse-6a`.
///
/// Lists get a German display name ("Klasse 6a"), stay off the public index,
/// are never archived, and confirm then moderate new subscriptions. Lists
/// whose name starts with `klasse` also get their own welcome notice, if
/// `welcome_template` exists under the style's template directory.
#[derive(Debug, Clone)]
pub struct ClassListStyle {
    base: String,
    language: String,
    welcome_template: String,
    templates: TemplateResolver,
}

impl Default for ClassListStyle {
    fn default() -> Self {
        Self::new(LEGACY_DEFAULT_STYLE, "de", CLASS_WELCOME_TEMPLATE)
    }
}

impl ClassListStyle {
    /// Welcome templates are looked up under `templates/<language>` unless
    /// another resolver is set with [`with_templates`](Self::with_templates).
    pub fn new(base: &str, language: &str, welcome_template: &str) -> Self {
        Self {
            base: base.to_string(),
            language: language.to_string(),
            welcome_template: welcome_template.to_string(),
            templates: TemplateResolver::localized(DEFAULT_TEMPLATE_DIR, language),
        }
    }

    pub fn with_templates(mut self, templates: TemplateResolver) -> Self {
        self.templates = templates;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn templates(&self) -> &TemplateResolver {
        &self.templates
    }
}

impl Style for ClassListStyle {
    fn name(&self) -> &str {
        CLASS_LIST_STYLE
    }

    fn apply(&self, target: &mut StyleTarget, context: &mut StyleContext<'_>) -> Result<(), StyleError> {
        let styles = context.styles;
        let base = styles
            .get(&self.base)
            .ok_or_else(|| StyleError::UnknownBaseStyle(self.base.clone()))?;
        base.apply(target, context)?;

        let display_name = class_display_name(target.list_name());
        target.set("display_name", display_name.clone());
        target.set("preferred_language", self.language.clone());
        target.set("subject_prefix", format!("[{display_name}] "));
        target.set("description", format!("Die Mailingliste der {display_name}"));
        target.set("info", format!("Die Mailingliste der {display_name}"));
        target.set("advertised", false);
        target.set("archive_policy", ArchivePolicy::Never);
        target.set("subscription_policy", SubscriptionPolicy::ConfirmThenModerate);

        if target.list_name().starts_with("klasse") {
            match self.templates.resolve(&self.welcome_template) {
                Some(uri) => {
                    debug!(list_id = %target.list_id(), %uri, "adding class welcome template");
                    context
                        .templates
                        .set_template(WELCOME_TEMPLATE, Some(target.list_id()), &uri);
                }
                None => debug!(
                    list_id = %target.list_id(),
                    template = %self.welcome_template,
                    "class welcome template missing, keeping the default"
                ),
            }
        }
        Ok(())
    }
}

/// Display name for a list: `klasse-a3` becomes `Klasse A3`, `klasse-6a`
/// becomes `Klasse 6a`, anything else is returned unchanged.
pub fn class_display_name(list_name: &str) -> String {
    CLASS_LIST_NAME
        .replace_all(list_name, |caps: &Captures<'_>| {
            format!("Klasse {}", capitalize(&caps[1].to_lowercase()))
        })
        .into_owned()
}

/// Uppercase the first character if it is alphabetic.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateManager;
    use serde_json::json;

    fn apply(style: &dyn Style, target: &mut StyleTarget) -> Result<TemplateManager, StyleError> {
        let styles = StyleManager::with_defaults();
        let mut templates = TemplateManager::new();
        let mut context = StyleContext {
            styles: &styles,
            templates: &mut templates,
        };
        style.apply(target, &mut context)?;
        Ok(templates)
    }

    /// A class style whose template directory holds the welcome file.
    fn class_style_with_welcome() -> (tempfile::TempDir, ClassListStyle) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CLASS_WELCOME_TEMPLATE), "Willkommen in der Klasse").unwrap();
        let style = ClassListStyle::default().with_templates(TemplateResolver::new(dir.path()));
        (dir, style)
    }

    #[test]
    fn digit_suffix_keeps_case() {
        assert_eq!(class_display_name("klasse-6a"), "Klasse 6a");
    }

    #[test]
    fn letter_suffix_is_capitalized() {
        assert_eq!(class_display_name("klasse-a3"), "Klasse A3");
    }

    #[test]
    fn suffix_is_lowercased_first() {
        assert_eq!(class_display_name("klasse-6A"), "Klasse 6a");
    }

    #[test]
    fn empty_suffix_does_not_panic() {
        assert_eq!(class_display_name("klasse-"), "Klasse ");
    }

    #[test]
    fn other_names_are_unchanged() {
        assert_eq!(class_display_name("eltern"), "eltern");
        assert_eq!(class_display_name("klasse6a"), "klasse6a");
    }

    #[test]
    fn capitalize_handles_edge_cases() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("ä1"), "Ä1");
        assert_eq!(capitalize("1a"), "1a");
    }

    #[test]
    fn class_style_overrides_base() {
        let (_dir, style) = class_style_with_welcome();
        let mut target = StyleTarget::new("klasse-a3", "school.example");
        let templates = apply(&style, &mut target).unwrap();

        let settings = target.settings();
        assert_eq!(settings["display_name"], json!("Klasse A3"));
        assert_eq!(settings["preferred_language"], json!("de"));
        assert_eq!(settings["subject_prefix"], json!("[Klasse A3] "));
        assert_eq!(settings["description"], json!("Die Mailingliste der Klasse A3"));
        assert_eq!(settings["info"], json!("Die Mailingliste der Klasse A3"));
        assert_eq!(settings["advertised"], json!(false));
        assert_eq!(settings["archive_policy"], json!("never"));
        assert_eq!(settings["subscription_policy"], json!("confirm_then_moderate"));
        // Untouched base defaults survive.
        assert_eq!(settings["max_message_size"], json!(40));
        assert_eq!(settings["default_nonmember_action"], json!("hold"));

        assert!(templates.get(WELCOME_TEMPLATE, Some("klasse-a3.school.example")).is_some());
    }

    #[test]
    fn welcome_override_is_a_file_uri() {
        let (dir, style) = class_style_with_welcome();
        let mut target = StyleTarget::new("klasse-6a", "school.example");
        let templates = apply(&style, &mut target).unwrap();

        let uri = templates
            .get(WELCOME_TEMPLATE, Some("klasse-6a.school.example"))
            .unwrap();
        assert!(uri.starts_with("file://"), "not a URI: {uri}");
        assert!(uri.ends_with("/list:user:notice:welcome-klasse.txt"));
        let expected = std::fs::canonicalize(dir.path().join(CLASS_WELCOME_TEMPLATE)).unwrap();
        assert_eq!(url::Url::parse(uri).unwrap().to_file_path().unwrap(), expected);
    }

    #[test]
    fn missing_welcome_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let style = ClassListStyle::default().with_templates(TemplateResolver::new(dir.path()));
        let mut target = StyleTarget::new("klasse-6a", "school.example");
        let templates = apply(&style, &mut target).unwrap();

        assert!(templates.is_empty());
        assert_eq!(target.get("display_name"), Some(&json!("Klasse 6a")));
    }

    #[test]
    fn non_class_list_gets_no_template() {
        let mut target = StyleTarget::new("eltern", "school.example");
        let templates = apply(&ClassListStyle::default(), &mut target).unwrap();

        assert_eq!(target.get("display_name"), Some(&json!("eltern")));
        assert!(templates.is_empty());
    }

    #[test]
    fn explicit_list_id_scopes_template() {
        let (_dir, style) = class_style_with_welcome();
        let mut target = StyleTarget::new("klasse-6a", "school.example").with_list_id("6a.lists");
        let templates = apply(&style, &mut target).unwrap();
        assert!(templates.get(WELCOME_TEMPLATE, Some("6a.lists")).is_some());
    }

    #[test]
    fn unknown_base_style_fails() {
        let style = ClassListStyle::new("no-such-style", "de", CLASS_WELCOME_TEMPLATE);
        let mut target = StyleTarget::new("klasse-6a", "school.example");
        let err = apply(&style, &mut target).unwrap_err();
        assert_eq!(err, StyleError::UnknownBaseStyle("no-such-style".to_string()));
    }

    #[test]
    fn legacy_default_capitalizes_name() {
        let mut target = StyleTarget::new("eltern", "school.example");
        apply(&LegacyDefaultStyle, &mut target).unwrap();
        assert_eq!(target.get("display_name"), Some(&json!("Eltern")));
        assert_eq!(target.get("subject_prefix"), Some(&json!("[Eltern] ")));
        assert_eq!(target.get("archive_policy"), Some(&json!("public")));
    }

    #[test]
    fn registering_twice_fails() {
        let mut manager = StyleManager::with_defaults();
        let err = manager.register(Box::new(LegacyDefaultStyle)).unwrap_err();
        assert_eq!(err, StyleError::AlreadyRegistered(LEGACY_DEFAULT_STYLE.to_string()));
        assert!(!manager.register_if_absent(Box::new(LegacyDefaultStyle)));
        assert!(manager.register_if_absent(Box::new(ClassListStyle::default())));
        assert_eq!(manager.names().collect::<Vec<_>>(), [CLASS_LIST_STYLE, LEGACY_DEFAULT_STYLE]);
    }
}
