//! Error types for the mailing-list REST client.
//!
//! # Design
//! Reads and writes fail differently. A read that comes back 404 is
//! `NotFound`, because callers routinely turn that into "no such list" or
//! "not subscribed"; any other failed read is `Transport`. Every write names
//! the status codes it accepts, and anything else is `RejectedMutation`, so a
//! 409 on create can never be mistaken for success.

use thiserror::Error;

use crate::http::HttpMethod;

/// Errors returned by the REST client and the resource wrappers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A read returned 404: the domain, list or membership does not exist.
    #[error("resource not found: {url}")]
    NotFound { url: String },

    /// A read returned a non-2xx status other than 404.
    #[error("HTTP {status} from {url}: {body}")]
    Transport { url: String, status: u16, body: String },

    /// A write returned a status outside its expected set.
    #[error("{method} {url} returned {status}, expected one of {expected:?}: {body}")]
    RejectedMutation {
        method: HttpMethod,
        url: String,
        expected: Vec<u16>,
        status: u16,
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body was not the JSON shape we expected.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A resource representation lacked a field we rely on.
    #[error("missing field `{0}` in resource representation")]
    MissingField(&'static str),

    #[error(transparent)]
    Style(#[from] StyleError),
}

/// Errors raised while registering or applying list styles.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleError {
    #[error("unknown base style `{0}`")]
    UnknownBaseStyle(String),

    #[error("style `{0}` is already registered")]
    AlreadyRegistered(String),
}

/// Errors raised while loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),
}
