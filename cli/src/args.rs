//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "listman",
    about = "Manage school mailing lists over the list server's REST API",
    version
)]
pub struct Opt {
    /// Configuration file to use.
    #[arg(short, long, value_parser)]
    pub config: Option<PathBuf>,
    /// Verbose mode (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the effective configuration as JSON.
    ShowConfig,
    /// List all domains.
    Domains,
    /// Create a domain.
    CreateDomain {
        /// Mail host, e.g. school.example.
        email_host: String,
    },
    /// List all mailing lists.
    Lists,
    /// Create a list in an existing domain.
    CreateList {
        /// Mail host of the domain.
        email_host: String,
        /// Local part of the list address.
        list_name: String,
    },
    /// Delete a list.
    DeleteList {
        email_host: String,
        list_name: String,
    },
    /// Show one list with its configuration.
    Show {
        /// Posting address of the list.
        fqdn_listname: String,
    },
    /// List memberships, of one list or of every list.
    Members {
        fqdn_listname: Option<String>,
    },
    /// Subscribe an address to a list.
    Subscribe {
        fqdn_listname: String,
        address: String,
        /// Display name of the subscriber.
        #[arg(long)]
        real_name: Option<String>,
    },
    /// Remove an address from a list.
    Unsubscribe {
        fqdn_listname: String,
        address: String,
    },
    /// Change list settings.
    ///
    /// Values are read as JSON when they parse, otherwise as plain strings:
    /// listman set klasse-6a@school.example advertised=false
    Set {
        fqdn_listname: String,
        /// One or more KEY=VALUE pairs.
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
    /// Apply the class-list style to a list and push its template overrides.
    ApplyStyle {
        fqdn_listname: String,
    },
    /// Print the template files found under the configured template directory.
    Templates,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
