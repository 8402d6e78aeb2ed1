//! Entry point to the mailing-list REST API.
//!
//! # Design
//! `MailmanClient` owns a `RestClient` and hands clones of it to every
//! wrapper it creates. Each wrapper fetches its representation when it is
//! built and is otherwise independent, so wrappers for different lists can
//! be used side by side. Collections come back as plain maps, sorted by a
//! stable key so callers see the same order no matter what the server sends.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::RestSettings;
use crate::credentials::Credentials;
use crate::domain::Domain;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::list::MailingList;
use crate::member::Member;
use crate::rest::RestClient;
use crate::transport::{Transport, UreqTransport};
use crate::types::{sorted_entries, Settings};

#[derive(Debug, Clone)]
pub struct MailmanClient {
    rest: RestClient,
}

impl MailmanClient {
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            rest: RestClient::new(credentials, transport),
        }
    }

    /// A client talking over `ureq`, configured from `settings`.
    pub fn connect(settings: &RestSettings) -> Self {
        let credentials = Credentials::new(&settings.host, &settings.username, &settings.password);
        let rest = RestClient::new(credentials, Arc::new(UreqTransport::new()))
            .with_api_version(&settings.api_version);
        Self { rest }
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Create a domain and return it once the server answered 201.
    pub fn create_domain(&self, email_host: &str) -> Result<Domain, ApiError> {
        let mut data = Settings::new();
        data.insert("email_host".to_string(), Value::String(email_host.to_string()));
        self.rest.mutate(HttpMethod::Post, "/domains", Some(&data), &[201])?;
        self.get_domain(email_host)
    }

    pub fn get_domain(&self, email_host: &str) -> Result<Domain, ApiError> {
        Domain::fetch(self.rest.clone(), email_host)
    }

    /// All domains, sorted by `email_host`.
    pub fn get_domains(&self) -> Result<Vec<Settings>, ApiError> {
        sorted_entries(self.rest.get("/domains")?, "email_host")
    }

    /// All lists, sorted by `fqdn_listname`.
    pub fn get_lists(&self) -> Result<Vec<Settings>, ApiError> {
        sorted_entries(self.rest.get("/lists")?, "fqdn_listname")
    }

    pub fn get_list(&self, fqdn_listname: &str) -> Result<MailingList, ApiError> {
        MailingList::fetch(self.rest.clone(), fqdn_listname)
    }

    /// Memberships across all lists, sorted by `self_link`.
    pub fn get_members(&self) -> Result<Vec<Settings>, ApiError> {
        sorted_entries(self.rest.get("/members")?, "self_link")
    }

    pub fn get_member(&self, email_address: &str, fqdn_listname: &str) -> Result<Member, ApiError> {
        Member::fetch(self.rest.clone(), email_address, fqdn_listname)
    }
}

impl fmt::Display for MailmanClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<MailmanClient: {}>", self.rest.credentials().host())
    }
}
