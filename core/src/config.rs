//! Client configuration: an optional TOML file with environment overrides.
//!
//! Environment variables use the `LISTMAN` prefix and `__` as the section
//! separator, so `LISTMAN__REST__HOST` overrides `rest.host`.

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::rest::DEFAULT_API_VERSION;
use crate::style::{CLASS_WELCOME_TEMPLATE, LEGACY_DEFAULT_STYLE};
use crate::templates::DEFAULT_TEMPLATE_DIR;

pub const ENV_PREFIX: &str = "LISTMAN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rest: RestSettings,
    pub style: StyleSettings,
    pub templates: TemplateSettings,
}

/// Where the REST API lives and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub api_version: String,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:9001".to_string(),
            username: "restadmin".to_string(),
            password: "restpass".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub base: String,
    pub language: String,
    pub welcome_template: String,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            base: LEGACY_DEFAULT_STYLE.to_string(),
            language: "de".to_string(),
            welcome_template: CLASS_WELCOME_TEMPLATE.to_string(),
        }
    }
}

/// Root of the localized template tree and the language subdirectory used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    pub dir: PathBuf,
    pub language: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            language: "de".to_string(),
        }
    }
}

/// Load settings from `path` (if given) and the environment.
///
/// A given file must exist; without one only defaults and environment
/// overrides apply.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }
    let settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize::<ClientConfig>()?;
    Ok(settings)
}
