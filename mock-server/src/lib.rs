//! In-memory stand-in for the mailing-list server's `/3.0` REST API.
//!
//! Mirrors the parts of the real API the client uses: domains, lists and
//! their configuration, rosters, memberships and per-list template URIs.
//! Requests need HTTP Basic auth and send form-encoded bodies; status codes
//! follow the real server (201 on create, 204 on delete, 400 on bad
//! attributes, 409 on duplicate memberships).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_USERNAME: &str = "restadmin";
pub const DEFAULT_PASSWORD: &str = "restpass";

/// Base used in `self_link` fields.
pub const SELF_BASE: &str = "http://localhost:9001/3.0";

const READ_ONLY_CONFIG: &[&str] = &["fqdn_listname", "list_name", "mail_host"];
const READ_ONLY_LIST: &[&str] = &[
    "fqdn_listname",
    "list_id",
    "list_name",
    "mail_host",
    "member_count",
    "self_link",
];
const READ_ONLY_MEMBER: &[&str] = &["address", "list_id", "member_id", "role", "self_link"];

const ARCHIVE_POLICIES: &[&str] = &["never", "private", "public"];
const SUBSCRIPTION_POLICIES: &[&str] = &["open", "confirm", "moderate", "confirm_then_moderate"];
const DELIVERY_MODES: &[&str] = &["regular", "plaintext_digests", "mime_digests", "summary_digests"];

type Fields = Map<String, Value>;
type Failure = (StatusCode, String);

#[derive(Debug, Clone, Default)]
pub struct ListRecord {
    pub info: Fields,
    pub config: Fields,
    pub uris: Fields,
}

#[derive(Debug, Default)]
pub struct Db {
    pub domains: BTreeMap<String, Fields>,
    pub lists: BTreeMap<String, ListRecord>,
    /// Keyed by (fqdn_listname, address).
    pub members: BTreeMap<(String, String), Fields>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<Db>>,
    authorization: Arc<String>,
}

pub fn app() -> Router {
    app_with_credentials(DEFAULT_USERNAME, DEFAULT_PASSWORD)
}

pub fn app_with_credentials(username: &str, password: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Db::default())),
        authorization: Arc::new(format!(
            "Basic {}",
            STANDARD.encode(format!("{username}:{password}"))
        )),
    };
    Router::new()
        .route("/3.0/domains", get(list_domains).post(create_domain))
        .route("/3.0/domains/{host}", get(get_domain).delete(delete_domain))
        .route("/3.0/lists", get(list_lists).post(create_list))
        .route(
            "/3.0/lists/{fqdn}",
            get(get_list).patch(update_list).delete(delete_list),
        )
        .route("/3.0/lists/{fqdn}/config", get(get_config).patch(update_config))
        .route("/3.0/lists/{fqdn}/uris", get(get_uris).patch(update_uris))
        .route("/3.0/lists/{fqdn}/roster/members", get(list_roster))
        .route(
            "/3.0/lists/{fqdn}/member/{address}",
            get(get_member).patch(update_member).delete(delete_member),
        )
        .route("/3.0/members", get(list_members).post(create_member))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

/// Serve an already-built router, e.g. one with non-default credentials.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == state.authorization.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response();
    }
    next.run(request).await
}

fn bad_request(message: impl Into<String>) -> Failure {
    (StatusCode::BAD_REQUEST, message.into())
}

fn not_found() -> Failure {
    (StatusCode::NOT_FOUND, "404 Not Found".to_string())
}

fn required<'a>(form: &'a HashMap<String, String>, key: &str) -> Result<&'a str, Failure> {
    form.get(key)
        .map(String::as_str)
        .ok_or_else(|| bad_request(format!("Missing parameters: {key}")))
}

/// A collection body. Empty collections carry no `entries` key.
fn collection(entries: Vec<Value>) -> Value {
    if entries.is_empty() {
        return json!({"start": 0, "total_size": 0});
    }
    let total = entries.len();
    json!({"entries": entries, "start": 0, "total_size": total})
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Convert a form value to the JSON type of the attribute it replaces.
fn coerce(key: &str, current: &Value, raw: &str) -> Result<Value, Failure> {
    let invalid = || bad_request(format!("Invalid value for {key}: {raw}"));
    let value = match current {
        Value::Bool(_) => Value::Bool(parse_bool(raw).ok_or_else(invalid)?),
        Value::Number(_) => Value::from(raw.parse::<i64>().map_err(|_| invalid())?),
        _ => Value::String(raw.to_string()),
    };
    let allowed = match key {
        "archive_policy" => Some(ARCHIVE_POLICIES),
        "subscription_policy" => Some(SUBSCRIPTION_POLICIES),
        "delivery_mode" => Some(DELIVERY_MODES),
        _ => None,
    };
    if let Some(allowed) = allowed {
        if !allowed.contains(&raw) {
            return Err(invalid());
        }
    }
    Ok(value)
}

/// Validate every field of a PATCH before applying any of them.
///
/// Read-only attributes may be resubmitted unchanged and are skipped.
fn patch(fields: &mut Fields, form: HashMap<String, String>, read_only: &[&str]) -> Result<(), Failure> {
    let mut updates = Vec::with_capacity(form.len());
    for (key, raw) in form {
        let current = fields
            .get(&key)
            .ok_or_else(|| bad_request(format!("Unknown attribute: {key}")))?;
        if read_only.contains(&key.as_str()) {
            let unchanged = match current {
                Value::String(text) => *text == raw,
                other => other.to_string() == raw,
            };
            if unchanged {
                continue;
            }
            return Err(bad_request(format!("Read-only attribute: {key}")));
        }
        let value = coerce(&key, current, &raw)?;
        updates.push((key, value));
    }
    fields.extend(updates);
    Ok(())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn default_config(list_name: &str, mail_host: &str, fqdn: &str) -> Fields {
    let display_name = capitalize(list_name);
    let config = json!({
        "fqdn_listname": fqdn,
        "list_name": list_name,
        "mail_host": mail_host,
        "display_name": display_name,
        "preferred_language": "en",
        "subject_prefix": format!("[{display_name}] "),
        "description": "",
        "info": "",
        "advertised": true,
        "anonymous_list": false,
        "send_welcome_message": true,
        "send_goodbye_message": true,
        "max_message_size": 40,
        "reply_goes_to_list": "no_munging",
        "first_strip_reply_to": false,
        "include_rfc2369_headers": true,
        "allow_list_posts": true,
        "collapse_alternatives": true,
        "convert_html_to_plaintext": false,
        "digest_size_threshold": 30,
        "admin_immed_notify": true,
        "admin_notify_mchanges": false,
        "default_member_action": "defer",
        "default_nonmember_action": "hold",
        "posting_pipeline": "default-posting-pipeline",
        "archive_policy": "public",
        "subscription_policy": "confirm",
    });
    match config {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

// --- domains ---

async fn list_domains(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    let entries = db.domains.values().cloned().map(Value::Object).collect();
    Json(collection(entries))
}

async fn create_domain(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, Failure> {
    let host = required(&form, "email_host")?.to_string();
    let mut db = state.db.write().await;
    if db.domains.contains_key(&host) {
        return Err(bad_request("Domain exists"));
    }
    let link = format!("{SELF_BASE}/domains/{host}");
    let domain = json!({
        "email_host": host,
        "description": form.get("description").cloned().unwrap_or_default(),
        "base_url": format!("http://{host}"),
        "self_link": link,
    });
    if let Value::Object(domain) = domain {
        db.domains.insert(host, domain);
    }
    Ok((StatusCode::CREATED, [(header::LOCATION, link)]))
}

async fn get_domain(State(state): State<AppState>, Path(host): Path<String>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.domains
        .get(&host)
        .cloned()
        .map(|domain| Json(Value::Object(domain)))
        .ok_or_else(not_found)
}

async fn delete_domain(State(state): State<AppState>, Path(host): Path<String>) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    db.domains.remove(&host).ok_or_else(not_found)?;
    let doomed: Vec<String> = db
        .lists
        .keys()
        .filter(|fqdn| fqdn.ends_with(&format!("@{host}")))
        .cloned()
        .collect();
    for fqdn in doomed {
        db.lists.remove(&fqdn);
        db.members.retain(|(list, _), _| *list != fqdn);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- lists ---

async fn list_lists(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    let entries = db
        .lists
        .values()
        .map(|list| Value::Object(list.info.clone()))
        .collect();
    Json(collection(entries))
}

async fn create_list(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, Failure> {
    let fqdn = required(&form, "fqdn_listname")?.to_string();
    let (list_name, mail_host) = fqdn
        .split_once('@')
        .filter(|(name, host)| !name.is_empty() && !host.is_empty())
        .ok_or_else(|| bad_request(format!("Invalid list posting address: {fqdn}")))?;
    let mut db = state.db.write().await;
    if !db.domains.contains_key(mail_host) {
        return Err(bad_request(format!("Domain does not exist: {mail_host}")));
    }
    if db.lists.contains_key(&fqdn) {
        return Err(bad_request("Mailing list exists"));
    }
    let link = format!("{SELF_BASE}/lists/{fqdn}");
    let info = json!({
        "fqdn_listname": fqdn,
        "list_name": list_name,
        "mail_host": mail_host,
        "list_id": format!("{list_name}.{mail_host}"),
        "display_name": capitalize(list_name),
        "member_count": 0,
        "self_link": link,
    });
    let record = ListRecord {
        info: match info {
            Value::Object(map) => map,
            _ => Fields::new(),
        },
        config: default_config(list_name, mail_host, &fqdn),
        uris: Fields::new(),
    };
    db.lists.insert(fqdn.clone(), record);
    Ok((StatusCode::CREATED, [(header::LOCATION, link)]))
}

async fn get_list(State(state): State<AppState>, Path(fqdn): Path<String>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    let list = db.lists.get(&fqdn).ok_or_else(not_found)?;
    Ok(Json(Value::Object(list.info.clone())))
}

async fn update_list(
    State(state): State<AppState>,
    Path(fqdn): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    let list = db.lists.get_mut(&fqdn).ok_or_else(not_found)?;
    patch(&mut list.info, form, READ_ONLY_LIST)?;
    Ok(StatusCode::OK)
}

async fn delete_list(State(state): State<AppState>, Path(fqdn): Path<String>) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    db.lists.remove(&fqdn).ok_or_else(not_found)?;
    db.members.retain(|(list, _), _| *list != fqdn);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_config(State(state): State<AppState>, Path(fqdn): Path<String>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    let list = db.lists.get(&fqdn).ok_or_else(not_found)?;
    Ok(Json(Value::Object(list.config.clone())))
}

async fn update_config(
    State(state): State<AppState>,
    Path(fqdn): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    let list = db.lists.get_mut(&fqdn).ok_or_else(not_found)?;
    patch(&mut list.config, form, READ_ONLY_CONFIG)?;
    Ok(StatusCode::OK)
}

async fn get_uris(State(state): State<AppState>, Path(fqdn): Path<String>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    let list = db.lists.get(&fqdn).ok_or_else(not_found)?;
    Ok(Json(Value::Object(list.uris.clone())))
}

async fn update_uris(
    State(state): State<AppState>,
    Path(fqdn): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    let list = db.lists.get_mut(&fqdn).ok_or_else(not_found)?;
    if let Some(key) = form.keys().find(|key| !key.starts_with("list:")) {
        return Err(bad_request(format!("Unknown template: {key}")));
    }
    if let Some(uri) = form.values().find(|uri| !has_uri_scheme(uri)) {
        return Err(bad_request(format!("Not a URI: {uri}")));
    }
    list.uris
        .extend(form.into_iter().map(|(key, uri)| (key, Value::String(uri))));
    Ok(StatusCode::NO_CONTENT)
}

/// `scheme://rest`, with a scheme as in RFC 3986.
fn has_uri_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

// --- memberships ---

fn members_of(db: &Db, fqdn: Option<&str>) -> Vec<Value> {
    db.members
        .iter()
        .filter(|((list, _), _)| fqdn.map_or(true, |fqdn| fqdn == list.as_str()))
        .map(|(_, member)| Value::Object(member.clone()))
        .collect()
}

async fn list_roster(State(state): State<AppState>, Path(fqdn): Path<String>) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    if !db.lists.contains_key(&fqdn) {
        return Err(not_found());
    }
    Ok(Json(collection(members_of(&db, Some(&fqdn)))))
}

async fn list_members(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    Json(collection(members_of(&db, None)))
}

async fn create_member(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, Failure> {
    let fqdn = required(&form, "fqdn_listname")?.to_string();
    let address = required(&form, "address")?.to_string();
    let mut db = state.db.write().await;
    let list_id = {
        let list = db
            .lists
            .get(&fqdn)
            .ok_or_else(|| bad_request(format!("No such list: {fqdn}")))?;
        list.info
            .get("list_id")
            .cloned()
            .unwrap_or(Value::String(fqdn.clone()))
    };
    let key = (fqdn.clone(), address.clone());
    if db.members.contains_key(&key) {
        return Err((StatusCode::CONFLICT, "Member already subscribed".to_string()));
    }
    let member_id = Uuid::new_v4().simple().to_string();
    let link = format!("{SELF_BASE}/members/{member_id}");
    let member = json!({
        "address": address,
        "display_name": form.get("real_name").cloned().unwrap_or_default(),
        "delivery_mode": "regular",
        "list_id": list_id,
        "member_id": member_id,
        "role": "member",
        "self_link": link,
    });
    if let Value::Object(member) = member {
        db.members.insert(key, member);
    }
    if let Some(list) = db.lists.get_mut(&fqdn) {
        let count = list.info.get("member_count").and_then(Value::as_u64).unwrap_or(0);
        list.info.insert("member_count".to_string(), Value::from(count + 1));
    }
    Ok((StatusCode::CREATED, [(header::LOCATION, link)]))
}

async fn get_member(
    State(state): State<AppState>,
    Path((fqdn, address)): Path<(String, String)>,
) -> Result<Json<Value>, Failure> {
    let db = state.db.read().await;
    db.members
        .get(&(fqdn, address))
        .cloned()
        .map(|member| Json(Value::Object(member)))
        .ok_or_else(not_found)
}

async fn update_member(
    State(state): State<AppState>,
    Path((fqdn, address)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    let member = db.members.get_mut(&(fqdn, address)).ok_or_else(not_found)?;
    patch(member, form, READ_ONLY_MEMBER)?;
    Ok(StatusCode::OK)
}

async fn delete_member(
    State(state): State<AppState>,
    Path((fqdn, address)): Path<(String, String)>,
) -> Result<StatusCode, Failure> {
    let mut db = state.db.write().await;
    db.members.remove(&(fqdn.clone(), address)).ok_or_else(not_found)?;
    if let Some(list) = db.lists.get_mut(&fqdn) {
        let count = list.info.get("member_count").and_then(Value::as_u64).unwrap_or(0);
        list.info
            .insert("member_count".to_string(), Value::from(count.saturating_sub(1)));
    }
    Ok(StatusCode::NO_CONTENT)
}
