//! A single list membership.

use std::fmt;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::rest::RestClient;
use crate::types::Settings;

/// One address's membership in one list.
///
/// The address and list are kept out of `info` so that `info` can be sent
/// back to the server unchanged as an update payload.
#[derive(Debug, Clone)]
pub struct Member {
    rest: RestClient,
    email_address: String,
    fqdn_listname: String,
    info: Settings,
}

pub(crate) fn member_path(fqdn_listname: &str, email_address: &str) -> String {
    format!("/lists/{fqdn_listname}/member/{email_address}")
}

impl Member {
    /// Fetch the membership of `email_address` in `fqdn_listname`.
    pub fn fetch(rest: RestClient, email_address: &str, fqdn_listname: &str) -> Result<Self, ApiError> {
        let info = rest.get_object(&member_path(fqdn_listname, email_address))?;
        Ok(Self {
            rest,
            email_address: email_address.to_string(),
            fqdn_listname: fqdn_listname.to_string(),
            info,
        })
    }

    pub fn email_address(&self) -> &str {
        &self.email_address
    }

    pub fn fqdn_listname(&self) -> &str {
        &self.fqdn_listname
    }

    pub fn info(&self) -> &Settings {
        &self.info
    }

    /// PATCH the membership with `data`, or with the cached `info` if `None`.
    ///
    /// On success the payload is merged into `info`, the same way list
    /// configuration updates reconcile their cache.
    pub fn update(&mut self, data: Option<&Settings>) -> Result<u16, ApiError> {
        let payload = match data {
            Some(data) => data.clone(),
            None => self.info.clone(),
        };
        let path = member_path(&self.fqdn_listname, &self.email_address);
        let status = self.rest.mutate(HttpMethod::Patch, &path, Some(&payload), &[200])?;
        self.info.extend(payload);
        Ok(status)
    }

    /// Remove this membership.
    pub fn unsubscribe(self) -> Result<u16, ApiError> {
        let path = member_path(&self.fqdn_listname, &self.email_address);
        self.rest.mutate(HttpMethod::Delete, &path, None, &[200, 204])
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A member object for '{}', subscribed to '{}'.",
            self.email_address, self.fqdn_listname
        )
    }
}
