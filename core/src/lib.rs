//! Blocking client for a mailing-list server's REST API, plus the class-list
//! style and template overrides applied to the lists it manages.
//!
//! # Overview
//! `MailmanClient` hands out `Domain`, `MailingList` and `Member` wrappers.
//! Each wrapper fetches its representation when constructed and keeps a
//! local copy, which successful updates reconcile. Requests and responses
//! are plain data (`HttpRequest` / `HttpResponse`); a `Transport` performs
//! the round-trip, `UreqTransport` over the network or a scripted one in
//! tests.
//!
//! # Design
//! - Reads fail with `NotFound` or `Transport`; writes declare the statuses
//!   they accept and fail with `RejectedMutation` otherwise.
//! - Styles and template overrides receive their registries explicitly
//!   through `StyleContext` instead of looking up global singletons.
//! - Nothing is retried and nothing runs in the background.

pub mod client;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod http;
pub mod list;
pub mod member;
pub mod plugin;
pub mod rest;
pub mod style;
pub mod templates;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::MailmanClient;
pub use self::config::{load_config, ClientConfig};
pub use credentials::Credentials;
pub use domain::Domain;
pub use error::{ApiError, ConfigError, StyleError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use list::MailingList;
pub use member::Member;
pub use plugin::Plugin;
pub use rest::RestClient;
pub use style::{ClassListStyle, LegacyDefaultStyle, Style, StyleContext, StyleManager, StyleRegistry, StyleTarget};
pub use templates::{TemplateManager, TemplateRegistry, TemplateResolver};
pub use transport::{Transport, UreqTransport};
pub use types::{ArchivePolicy, Settings, SubscriptionPolicy};
