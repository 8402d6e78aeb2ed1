//! Hooks run by the list server when it loads the class-list plugin.

use tracing::info;

use crate::config::ClientConfig;
use crate::style::{ClassListStyle, StyleRegistry};
use crate::templates::{TemplateRegistry, TemplateResolver, ALL_TEMPLATES};

/// Registers the class-list style and the localized template set.
#[derive(Debug, Clone)]
pub struct Plugin {
    style: ClassListStyle,
    templates: TemplateResolver,
}

impl Plugin {
    pub fn new(style: ClassListStyle, templates: TemplateResolver) -> Self {
        Self { style, templates }
    }

    /// The style and the site-wide templates share one template directory.
    pub fn from_config(config: &ClientConfig) -> Self {
        let templates = TemplateResolver::localized(&config.templates.dir, &config.templates.language);
        let style = ClassListStyle::new(
            &config.style.base,
            &config.style.language,
            &config.style.welcome_template,
        )
        .with_templates(templates.clone());
        Self::new(style, templates)
    }

    pub fn style(&self) -> &ClassListStyle {
        &self.style
    }

    /// Register the style unless one with its name is already present.
    pub fn pre_hook(&self, styles: &mut dyn StyleRegistry) -> bool {
        let added = styles.register_if_absent(Box::new(self.style.clone()));
        if !added {
            info!("class-list style already registered");
        }
        added
    }

    /// Register every localized template file that exists.
    pub fn post_hook(&self, templates: &mut dyn TemplateRegistry) -> usize {
        self.templates.apply(ALL_TEMPLATES, templates)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::style::{
        Style, StyleContext, StyleManager, StyleTarget, CLASS_LIST_STYLE, CLASS_WELCOME_TEMPLATE,
    };
    use crate::templates::{TemplateManager, WELCOME_TEMPLATE};

    #[test]
    fn pre_hook_registers_once() {
        let plugin = Plugin::from_config(&ClientConfig::default());
        let mut styles = StyleManager::with_defaults();

        assert!(plugin.pre_hook(&mut styles));
        assert!(!plugin.pre_hook(&mut styles));
        assert!(styles.get(CLASS_LIST_STYLE).is_some());
    }

    #[test]
    fn registered_style_resolves_welcome_from_config_dir() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("de")).unwrap();
        fs::write(root.path().join("de").join(CLASS_WELCOME_TEMPLATE), "Willkommen").unwrap();
        let mut config = ClientConfig::default();
        config.templates.dir = root.path().to_path_buf();
        let plugin = Plugin::from_config(&config);
        let mut styles = StyleManager::with_defaults();
        plugin.pre_hook(&mut styles);

        let style = styles.get(CLASS_LIST_STYLE).unwrap();
        let mut target = StyleTarget::new("klasse-6a", "school.example");
        let mut templates = TemplateManager::new();
        let mut context = StyleContext {
            styles: &styles,
            templates: &mut templates,
        };
        style.apply(&mut target, &mut context).unwrap();

        let uri = templates
            .get(WELCOME_TEMPLATE, Some("klasse-6a.school.example"))
            .unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("/de/list:user:notice:welcome-klasse.txt"));
        assert_eq!(plugin.style().templates().base_dir(), root.path().join("de"));
    }

    #[test]
    fn post_hook_registers_existing_templates() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("de")).unwrap();
        fs::write(root.path().join("de/list:user:notice:welcome.txt"), "Willkommen").unwrap();
        fs::write(root.path().join("de/list:member:generic:footer.txt"), "--").unwrap();
        let mut config = ClientConfig::default();
        config.templates.dir = root.path().to_path_buf();
        let plugin = Plugin::from_config(&config);
        let mut templates = TemplateManager::new();

        let registered = plugin.post_hook(&mut templates);

        // The generic footer also backs the digest and regular footers.
        assert_eq!(registered, 4);
        assert!(templates.get("list:member:regular:footer", None).is_some());
        assert!(templates.iter().all(|(_, scope, _)| scope.is_none()));
    }
}
