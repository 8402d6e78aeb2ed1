//! A mail domain and the lists created under it.

use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::list::MailingList;
use crate::rest::RestClient;
use crate::types::{string_field, Settings};

/// A mail domain, identified by its `email_host`.
#[derive(Debug, Clone)]
pub struct Domain {
    rest: RestClient,
    email_host: String,
    info: Settings,
}

impl Domain {
    /// Fetch `/domains/{email_host}`.
    pub fn fetch(rest: RestClient, email_host: &str) -> Result<Self, ApiError> {
        let info = rest.get_object(&format!("/domains/{email_host}"))?;
        Ok(Self {
            rest,
            email_host: email_host.to_string(),
            info,
        })
    }

    pub fn email_host(&self) -> &str {
        string_field(&self.info, "email_host").unwrap_or(&self.email_host)
    }

    pub fn info(&self) -> &Settings {
        &self.info
    }

    pub fn fqdn_listname(&self, list_name: &str) -> String {
        format!("{list_name}@{}", self.email_host())
    }

    /// Create `list_name@email_host` and return the hydrated list.
    ///
    /// The list is only fetched once the server answered 201.
    pub fn create_list(&self, list_name: &str) -> Result<MailingList, ApiError> {
        let fqdn_listname = self.fqdn_listname(list_name);
        let mut data = Settings::new();
        data.insert("fqdn_listname".to_string(), Value::String(fqdn_listname.clone()));
        self.rest.mutate(HttpMethod::Post, "/lists", Some(&data), &[201])?;
        MailingList::fetch(self.rest.clone(), &fqdn_listname)
    }

    pub fn delete_list(&self, list_name: &str) -> Result<u16, ApiError> {
        let path = format!("/lists/{}", self.fqdn_listname(list_name));
        self.rest.mutate(HttpMethod::Delete, &path, None, &[200, 204])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::credentials::Credentials;
    use crate::http::HttpResponse;
    use crate::testing::ScriptedTransport;

    fn domain(transport: &Arc<ScriptedTransport>) -> Domain {
        transport.push_json(200, json!({"email_host": "school.example", "description": ""}));
        let rest = RestClient::new(Credentials::new("localhost:9001", "u", "p"), transport.clone());
        Domain::fetch(rest, "school.example").unwrap()
    }

    #[test]
    fn fetch_reads_domain() {
        let transport = Arc::new(ScriptedTransport::new());
        let domain = domain(&transport);
        assert_eq!(transport.last_request().path, "http://localhost:9001/3.0/domains/school.example");
        assert_eq!(domain.email_host(), "school.example");
    }

    #[test]
    fn missing_domain_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::new(404, ""));
        let rest = RestClient::new(Credentials::new("localhost:9001", "u", "p"), transport.clone());
        let err = Domain::fetch(rest, "nowhere.example").unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[test]
    fn create_list_posts_then_fetches() {
        let transport = Arc::new(ScriptedTransport::new());
        let domain = domain(&transport);
        transport.push(HttpResponse::new(201, ""));
        transport.push_json(200, json!({"fqdn_listname": "klasse-6a@school.example"}));
        transport.push_json(200, json!({"display_name": "Klasse-6a"}));

        let list = domain.create_list("klasse-6a").unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].method, HttpMethod::Post);
        assert_eq!(sent[1].path, "http://localhost:9001/3.0/lists");
        assert_eq!(sent[1].body.as_deref(), Some("fqdn_listname=klasse-6a%40school.example"));
        assert_eq!(list.fqdn_listname(), "klasse-6a@school.example");
        assert_eq!(list.config()["display_name"], "Klasse-6a");
    }

    #[test]
    fn failed_create_does_not_fetch_list() {
        let transport = Arc::new(ScriptedTransport::new());
        let domain = domain(&transport);
        transport.push(HttpResponse::new(400, "Mailing list exists"));

        let err = domain.create_list("klasse-6a").unwrap_err();

        assert!(matches!(err, ApiError::RejectedMutation { status: 400, .. }));
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn delete_list_accepts_no_content() {
        let transport = Arc::new(ScriptedTransport::new());
        let domain = domain(&transport);
        transport.push(HttpResponse::new(204, ""));

        assert_eq!(domain.delete_list("klasse-6a").unwrap(), 204);
        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(sent.path, "http://localhost:9001/3.0/lists/klasse-6a@school.example");
    }
}
