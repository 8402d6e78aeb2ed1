//! A mailing list: identity, configuration and roster.

use std::fmt;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::member::{member_path, Member};
use crate::rest::RestClient;
use crate::style::{Style, StyleContext, StyleRegistry, StyleTarget};
use crate::templates::TemplateRegistry;
use crate::types::{sorted_entries, string_field, Settings};

/// A mailing list, identified by its `fqdn_listname` (`name@host`).
///
/// `info` holds the list resource and `config` its configuration
/// sub-resource, both fetched once on construction. Successful updates are
/// merged into the local copy; nothing is refreshed in the background.
#[derive(Debug, Clone)]
pub struct MailingList {
    rest: RestClient,
    fqdn_listname: String,
    info: Settings,
    config: Settings,
}

impl MailingList {
    /// Fetch `/lists/{fqdn}` and `/lists/{fqdn}/config`.
    pub fn fetch(rest: RestClient, fqdn_listname: &str) -> Result<Self, ApiError> {
        let info = rest.get_object(&format!("/lists/{fqdn_listname}"))?;
        let config = rest.get_object(&format!("/lists/{fqdn_listname}/config"))?;
        Ok(Self {
            rest,
            fqdn_listname: fqdn_listname.to_string(),
            info,
            config,
        })
    }

    pub fn fqdn_listname(&self) -> &str {
        &self.fqdn_listname
    }

    /// Local part of the list address.
    pub fn list_name(&self) -> &str {
        self.fqdn_listname
            .split_once('@')
            .map_or(self.fqdn_listname.as_str(), |(name, _)| name)
    }

    pub fn mail_host(&self) -> &str {
        self.fqdn_listname
            .split_once('@')
            .map_or("", |(_, host)| host)
    }

    /// The server's list id, or `name.host` if it did not send one.
    pub fn list_id(&self) -> String {
        match string_field(&self.info, "list_id") {
            Some(list_id) => list_id.to_string(),
            None => format!("{}.{}", self.list_name(), self.mail_host()),
        }
    }

    pub fn info(&self) -> &Settings {
        &self.info
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }

    pub fn subscribe(&self, address: &str, real_name: Option<&str>) -> Result<u16, ApiError> {
        let mut data = Settings::new();
        data.insert("fqdn_listname".to_string(), Value::String(self.fqdn_listname.clone()));
        data.insert("address".to_string(), Value::String(address.to_string()));
        if let Some(real_name) = real_name {
            data.insert("real_name".to_string(), Value::String(real_name.to_string()));
        }
        self.rest.mutate(HttpMethod::Post, "/members", Some(&data), &[201])
    }

    pub fn unsubscribe(&self, address: &str) -> Result<u16, ApiError> {
        let path = member_path(&self.fqdn_listname, address);
        self.rest.mutate(HttpMethod::Delete, &path, None, &[200, 204])
    }

    /// The roster, sorted by `self_link`.
    pub fn get_members(&self) -> Result<Vec<Settings>, ApiError> {
        let roster = self
            .rest
            .get(&format!("/lists/{}/roster/members", self.fqdn_listname))?;
        sorted_entries(roster, "self_link")
    }

    pub fn get_member(&self, address: &str) -> Result<Member, ApiError> {
        Member::fetch(self.rest.clone(), address, &self.fqdn_listname)
    }

    /// Whether `address` is a member. Only a 404 counts as "no"; every
    /// other failure is returned.
    pub fn is_subscribed(&self, address: &str) -> Result<bool, ApiError> {
        match self.get_member(address) {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// PATCH the list resource; merges `data` into `info` on success.
    pub fn update_list(&mut self, data: &Settings) -> Result<u16, ApiError> {
        let path = format!("/lists/{}", self.fqdn_listname);
        let status = self.rest.mutate(HttpMethod::Patch, &path, Some(data), &[200])?;
        self.info.extend(data.clone());
        Ok(status)
    }

    /// PATCH the configuration; merges `data` into `config` only on 200.
    pub fn update_config(&mut self, data: &Settings) -> Result<u16, ApiError> {
        let path = format!("/lists/{}/config", self.fqdn_listname);
        let status = self.rest.mutate(HttpMethod::Patch, &path, Some(data), &[200])?;
        self.config.extend(data.clone());
        Ok(status)
    }

    /// Point template `key` at `uri` for this list only.
    pub fn set_template_uri(&self, key: &str, uri: &str) -> Result<u16, ApiError> {
        let mut data = Settings::new();
        data.insert(key.to_string(), Value::String(uri.to_string()));
        let path = format!("/lists/{}/uris", self.fqdn_listname);
        self.rest.mutate(HttpMethod::Patch, &path, Some(&data), &[200, 204])
    }

    /// Derive this list's configuration from `style` and push it.
    ///
    /// Template overrides the style asks for go to `templates`. Returns the
    /// configuration that was written.
    pub fn apply_style(
        &mut self,
        style: &dyn Style,
        styles: &dyn StyleRegistry,
        templates: &mut dyn TemplateRegistry,
    ) -> Result<Settings, ApiError> {
        let mut target = StyleTarget::new(self.list_name(), self.mail_host()).with_list_id(&self.list_id());
        let mut context = StyleContext { styles, templates };
        style.apply(&mut target, &mut context)?;

        let derived = target.into_settings();
        self.update_config(&derived)?;
        Ok(derived)
    }
}

impl fmt::Display for MailingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A list object for the list '{}'.", self.fqdn_listname)
    }
}
