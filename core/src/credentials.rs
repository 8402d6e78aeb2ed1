//! REST API credentials.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const DEFAULT_SCHEME: &str = "http://";

/// Host URL and Basic-auth credentials for the REST API.
///
/// The host is normalized once at construction: trailing slashes are
/// stripped, and a bare `host:port` gets a plain `http://` scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    host: String,
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http") {
            host.to_string()
        } else {
            format!("{DEFAULT_SCHEME}{host}")
        };
        Self {
            host,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
