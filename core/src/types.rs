//! Shared data types for REST resources.
//!
//! # Design
//! Resource representations are kept as JSON maps rather than fixed structs.
//! The server owns the schema, list configuration alone has dozens of keys,
//! and a cached map can be sent back verbatim as an update payload.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A resource representation or a partial update: key to JSON value.
pub type Settings = Map<String, Value>;

/// Whether and how a list's posts are archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    Never,
    Private,
    Public,
}

impl ArchivePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchivePolicy::Never => "never",
            ArchivePolicy::Private => "private",
            ArchivePolicy::Public => "public",
        }
    }
}

impl From<ArchivePolicy> for Value {
    fn from(policy: ArchivePolicy) -> Self {
        Value::String(policy.as_str().to_string())
    }
}

/// What a prospective member has to go through before joining a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPolicy {
    Open,
    Confirm,
    Moderate,
    ConfirmThenModerate,
}

impl SubscriptionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionPolicy::Open => "open",
            SubscriptionPolicy::Confirm => "confirm",
            SubscriptionPolicy::Moderate => "moderate",
            SubscriptionPolicy::ConfirmThenModerate => "confirm_then_moderate",
        }
    }
}

impl From<SubscriptionPolicy> for Value {
    fn from(policy: SubscriptionPolicy) -> Self {
        Value::String(policy.as_str().to_string())
    }
}

/// Extract the `entries` of a collection response, sorted by `sort_key`.
///
/// The server omits `entries` entirely for an empty collection, which yields
/// an empty vector. Entries missing the sort key order before all others.
pub(crate) fn sorted_entries(collection: Value, sort_key: &str) -> Result<Vec<Settings>, ApiError> {
    let mut collection = match collection {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::Deserialization(format!(
                "expected a collection object, got {other}"
            )))
        }
    };
    let entries = match collection.remove("entries") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(ApiError::Deserialization(format!(
                "expected `entries` to be an array, got {other}"
            )))
        }
    };

    let mut entries = entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(map) => Ok(map),
            other => Err(ApiError::Deserialization(format!(
                "expected collection entry to be an object, got {other}"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|a, b| compare_by_key(a, b, sort_key));
    Ok(entries)
}

fn compare_by_key(a: &Settings, b: &Settings, key: &str) -> Ordering {
    let a = a.get(key).and_then(Value::as_str);
    let b = b.get(key).and_then(Value::as_str);
    a.cmp(&b)
}

/// Read a string field from a representation.
pub(crate) fn string_field<'a>(settings: &'a Settings, key: &'static str) -> Option<&'a str> {
    settings.get(key).and_then(Value::as_str)
}
