mod args;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use listman_core::style::CLASS_LIST_STYLE;
use listman_core::templates::TemplateManager;
use listman_core::{
    load_config, ClientConfig, MailmanClient, Plugin, Settings, StyleManager, StyleRegistry,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::args::{Command, Opt};

fn main() -> Result<()> {
    let opt = Opt::parse();
    init_logging(opt.verbose)?;

    let config = load_config(opt.config.as_deref()).context("loading configuration")?;
    run(&config, opt.cmd)
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("parsing RUST_LOG")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("installing log subscriber")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(config: &ClientConfig, cmd: Command) -> Result<()> {
    // Constructing the client does no IO; the first request happens below.
    let client = MailmanClient::connect(&config.rest);
    info!(%client, "using REST API");

    match cmd {
        Command::ShowConfig => print_json(config)?,
        Command::Templates => {
            let mut templates = TemplateManager::new();
            let count = Plugin::from_config(config).post_hook(&mut templates);
            info!(count, "templates resolved");
            for (key, _, uri) in templates.iter() {
                println!("{key}\t{uri}");
            }
        }
        Command::Domains => print_json(&client.get_domains()?)?,
        Command::CreateDomain { email_host } => {
            let domain = client
                .create_domain(&email_host)
                .with_context(|| format!("creating domain {email_host}"))?;
            print_json(domain.info())?;
        }
        Command::Lists => print_json(&client.get_lists()?)?,
        Command::CreateList { email_host, list_name } => {
            let list = client
                .get_domain(&email_host)?
                .create_list(&list_name)
                .with_context(|| format!("creating list {list_name}@{email_host}"))?;
            println!("{list}");
        }
        Command::DeleteList { email_host, list_name } => {
            client
                .get_domain(&email_host)?
                .delete_list(&list_name)
                .with_context(|| format!("deleting list {list_name}@{email_host}"))?;
        }
        Command::Show { fqdn_listname } => {
            let list = client.get_list(&fqdn_listname)?;
            print_json(&serde_json::json!({ "info": list.info(), "config": list.config() }))?;
        }
        Command::Members { fqdn_listname: Some(fqdn) } => {
            print_json(&client.get_list(&fqdn)?.get_members()?)?;
        }
        Command::Members { fqdn_listname: None } => print_json(&client.get_members()?)?,
        Command::Subscribe { fqdn_listname, address, real_name } => {
            client
                .get_list(&fqdn_listname)?
                .subscribe(&address, real_name.as_deref())
                .with_context(|| format!("subscribing {address} to {fqdn_listname}"))?;
        }
        Command::Unsubscribe { fqdn_listname, address } => {
            client
                .get_list(&fqdn_listname)?
                .unsubscribe(&address)
                .with_context(|| format!("unsubscribing {address} from {fqdn_listname}"))?;
        }
        Command::Set { fqdn_listname, assignments } => {
            let mut list = client.get_list(&fqdn_listname)?;
            let data: Settings = assignments
                .into_iter()
                .map(|(key, raw)| {
                    let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                    (key, value)
                })
                .collect();
            list.update_config(&data)
                .with_context(|| format!("updating {fqdn_listname}"))?;
            print_json(list.config())?;
        }
        Command::ApplyStyle { fqdn_listname } => {
            let mut styles = StyleManager::with_defaults();
            Plugin::from_config(config).pre_hook(&mut styles);
            let style = styles
                .get(CLASS_LIST_STYLE)
                .context("class-list style is not registered")?;

            let mut templates = TemplateManager::new();
            let mut list = client.get_list(&fqdn_listname)?;
            let applied = list
                .apply_style(style, &styles, &mut templates)
                .with_context(|| format!("applying style to {fqdn_listname}"))?;

            let list_id = list.list_id();
            for (key, uri) in templates.scoped(&list_id) {
                list.set_template_uri(key, uri)
                    .with_context(|| format!("setting template {key} on {fqdn_listname}"))?;
            }
            print_json(&applied)?;
        }
    }
    Ok(())
}
