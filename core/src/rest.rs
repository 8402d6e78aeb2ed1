//! Authenticated request building and response interpretation.
//!
//! # Design
//! `RestClient` holds the credentials, the API version and a shared
//! `Transport`. Every call is split the same way: `build_request` produces
//! an `HttpRequest`, the transport executes it, and `parse_read` or
//! `check_mutation` turns the `HttpResponse` into a result. The build and
//! parse halves are pure and are what the unit tests and test vectors pin
//! down.
//!
//! Reads and writes get different result types. A read yields the decoded
//! JSON body. A write yields the accepted status code, and only if it is in
//! the set the caller declared; anything else is `RejectedMutation`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::Settings;

pub const DEFAULT_API_VERSION: &str = "3.0";

const USER_AGENT: &str = "listman";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Cheaply clonable handle shared by every resource wrapper.
#[derive(Clone)]
pub struct RestClient {
    credentials: Arc<Credentials>,
    api_version: String,
    transport: Arc<dyn Transport>,
}

impl RestClient {
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            api_version: DEFAULT_API_VERSION.to_string(),
            transport,
        }
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.trim_matches('/').to_string();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Absolute URL for an API path such as `/lists`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.credentials.host(), self.api_version, path)
    }

    pub fn build_request(&self, method: HttpMethod, path: &str, data: Option<&Settings>) -> HttpRequest {
        let mut headers = vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), self.credentials.authorization()),
        ];
        let body = data.map(|data| {
            headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
            encode_form(data)
        });
        HttpRequest {
            method,
            path: self.url(path),
            headers,
            body,
        }
    }

    /// GET `path` and decode the JSON body.
    pub fn get(&self, path: &str) -> Result<Value, ApiError> {
        let request = self.build_request(HttpMethod::Get, path, None);
        debug!(url = %request.path, "GET");
        let response = self.transport.execute(&request)?;
        parse_read(&request.path, response)
    }

    /// GET `path` and require the body to be a JSON object.
    pub fn get_object(&self, path: &str) -> Result<Settings, ApiError> {
        match self.get(path)? {
            Value::Object(map) => Ok(map),
            other => Err(ApiError::Deserialization(format!(
                "expected a JSON object from {path}, got {other}"
            ))),
        }
    }

    /// Send a write and require its status to be one of `expected`.
    ///
    /// `data` is sent form-encoded. Returns the accepted status code.
    pub fn mutate(
        &self,
        method: HttpMethod,
        path: &str,
        data: Option<&Settings>,
        expected: &[u16],
    ) -> Result<u16, ApiError> {
        let request = self.build_request(method, path, data);
        debug!(%method, url = %request.path, "sending mutation");
        let response = self.transport.execute(&request)?;
        match check_mutation(method, &request.path, response, expected) {
            Ok(status) => {
                info!(%method, url = %request.path, status, "mutation accepted");
                Ok(status)
            }
            Err(err) => {
                warn!(%method, url = %request.path, error = %err, "mutation rejected");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("credentials", &self.credentials)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Encode a settings map as an `application/x-www-form-urlencoded` body.
///
/// Arrays become repeated keys and nulls are left out.
pub fn encode_form(data: &Settings) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in data {
        append_value(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append_value(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => {
            serializer.append_pair(key, if *flag { "true" } else { "false" });
        }
        Value::Number(number) => {
            serializer.append_pair(key, &number.to_string());
        }
        Value::String(text) => {
            serializer.append_pair(key, text);
        }
        Value::Array(items) => {
            for item in items {
                append_value(serializer, key, item);
            }
        }
        Value::Object(_) => {
            serializer.append_pair(key, &value.to_string());
        }
    }
}

/// Interpret the response to a read.
pub fn parse_read(url: &str, response: HttpResponse) -> Result<Value, ApiError> {
    if response.status == 404 {
        return Err(ApiError::NotFound { url: url.to_string() });
    }
    if !response.is_success() {
        return Err(ApiError::Transport {
            url: url.to_string(),
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Interpret the response to a write against its expected statuses.
pub fn check_mutation(
    method: HttpMethod,
    url: &str,
    response: HttpResponse,
    expected: &[u16],
) -> Result<u16, ApiError> {
    if expected.contains(&response.status) {
        return Ok(response.status);
    }
    Err(ApiError::RejectedMutation {
        method,
        url: url.to_string(),
        expected: expected.to_vec(),
        status: response.status,
        body: response.body,
    })
}
