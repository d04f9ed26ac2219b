//! In-memory Wididit federation.
//!
//! [`FakeFederation`] implements [`HttpClient`] by answering requests from
//! an in-process model of any number of Wididit hosts. It keeps accounts,
//! entries, subscriptions and shares, checks basic authentication, assigns
//! entry ids per author and stamps entries with a deterministic clock.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use wididit_core::{
    HttpClient, HttpRequest, HttpResponse, Method, StatusCode, TransportError, TIME_FORMAT,
};

/// Editable entry fields stored as text.
const TEXT_FIELDS: [&str; 8] = [
    "content",
    "category",
    "generator",
    "rights",
    "source",
    "subtitle",
    "summary",
    "title",
];

struct Account {
    password: String,
    email: Option<String>,
    biography: String,
    subscriptions: BTreeSet<String>,
}

struct StoredEntry {
    fields: Map<String, Value>,
    contributors: Vec<String>,
    published: NaiveDateTime,
    updated: NaiveDateTime,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<String, Account>,
    entries: BTreeMap<(String, u64), StoredEntry>,
    next_ids: HashMap<String, u64>,
    shares: BTreeSet<(String, String, u64)>,
    unreachable: HashSet<String>,
    ticks: i64,
    requests: Vec<HttpRequest>,
}

/// Stateful fake of a set of Wididit hosts.
pub struct FakeFederation {
    state: Mutex<State>,
    epoch: NaiveDateTime,
}

impl Default for FakeFederation {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFederation {
    /// Creates an empty federation.
    pub fn new() -> Self {
        let epoch = NaiveDate::from_ymd_opt(2012, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            state: Mutex::new(State::default()),
            epoch,
        }
    }

    /// Creates an account; its biography is `biography of user {userid}`.
    pub fn add_user(&self, username: &str, hostname: &str, password: &str) -> String {
        let userid = format!("{username}@{hostname}");
        self.state.lock().accounts.insert(
            userid.clone(),
            Account {
                password: password.to_string(),
                email: None,
                biography: format!("biography of user {userid}"),
                subscriptions: BTreeSet::new(),
            },
        );
        userid
    }

    /// Stores an entry directly, bypassing authentication.
    pub fn add_entry(&self, author: &str, fields: Value) -> u64 {
        let mut state = self.state.lock();
        let now = self.tick(&mut state);
        let id = next_id(&mut state, author);
        let entry = stored_entry(&fields, now);
        state.entries.insert((author.to_string(), id), entry);
        id
    }

    /// Makes `subscriber` follow `target`.
    pub fn subscribe(&self, subscriber: &str, target: &str) {
        if let Some(account) = self.state.lock().accounts.get_mut(subscriber) {
            account.subscriptions.insert(target.to_string());
        }
    }

    /// Makes `sharer` share the entry `id` of `author`.
    pub fn share(&self, sharer: &str, author: &str, id: u64) {
        self.state
            .lock()
            .shares
            .insert((sharer.to_string(), author.to_string(), id));
    }

    /// Makes every connection to `hostname` fail.
    pub fn set_unreachable(&self, hostname: &str, unreachable: bool) {
        let mut state = self.state.lock();
        if unreachable {
            state.unreachable.insert(hostname.to_string());
        } else {
            state.unreachable.remove(hostname);
        }
    }

    /// Returns the stored biography of a user.
    pub fn biography(&self, userid: &str) -> Option<String> {
        self.state
            .lock()
            .accounts
            .get(userid)
            .map(|a| a.biography.clone())
    }

    /// Returns the stored password of a user.
    pub fn password(&self, userid: &str) -> Option<String> {
        self.state
            .lock()
            .accounts
            .get(userid)
            .map(|a| a.password.clone())
    }

    /// Returns the email a user registered with.
    pub fn email(&self, userid: &str) -> Option<String> {
        self.state
            .lock()
            .accounts
            .get(userid)
            .and_then(|a| a.email.clone())
    }

    /// Returns an entry as the server would list it.
    pub fn entry(&self, author: &str, id: u64) -> Option<Value> {
        let state = self.state.lock();
        state
            .entries
            .get(&(author.to_string(), id))
            .map(|e| row(author, id, e))
    }

    /// Returns the number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns a copy of every request received.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Forgets every recorded request.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    fn tick(&self, state: &mut State) -> NaiveDateTime {
        state.ticks += 1;
        self.epoch + Duration::seconds(state.ticks)
    }

    fn handle(&self, state: &mut State, host: &str, path: &str, request: &HttpRequest) -> HttpResponse {
        let caller = match authenticate(state, host, request) {
            Ok(caller) => caller,
            Err(response) => return response,
        };
        let body = match request.body.as_deref().map(serde_json::from_slice::<Value>) {
            Some(Ok(body)) => Some(body),
            Some(Err(_)) => return HttpResponse::empty(StatusCode::BAD_REQUEST),
            None => None,
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["whoami"]) => match caller {
                Some(userid) => HttpResponse::json(StatusCode::OK, &user_reply(&userid)),
                None => HttpResponse::empty(StatusCode::UNAUTHORIZED),
            },
            (Method::Post, ["people"]) => register(state, host, body.as_ref()),
            (Method::Get, ["people", userid]) => match state.accounts.get(*userid) {
                Some(account) => {
                    let mut reply = user_reply(userid);
                    reply["biography"] = Value::String(account.biography.clone());
                    HttpResponse::json(StatusCode::OK, &reply)
                }
                None => HttpResponse::empty(StatusCode::NOT_FOUND),
            },
            (Method::Put, ["people", userid]) => {
                update_user(state, caller.as_deref(), userid, body.as_ref())
            }
            (Method::Post, ["entry"]) => {
                let now = self.tick(state);
                create_entry(state, caller.as_deref(), body.as_ref(), now)
            }
            (Method::Get, ["entry"]) => list(state, request, |author, sharer| {
                host_of(author) == host || sharer.is_some_and(|s| host_of(s) == host)
            }),
            (Method::Get, ["entry", "timeline"]) => {
                let Some(caller) = caller else {
                    return HttpResponse::empty(StatusCode::FORBIDDEN);
                };
                let subscriptions = state
                    .accounts
                    .get(&caller)
                    .map(|a| a.subscriptions.clone())
                    .unwrap_or_default();
                list(state, request, |author, sharer| {
                    subscriptions.contains(author)
                        || sharer.is_some_and(|s| subscriptions.contains(s))
                })
            }
            (Method::Get, ["entry", author, id]) => match parse_key(author, id) {
                Some(key) => match state.entries.get(&key) {
                    Some(entry) => HttpResponse::json(StatusCode::OK, &row(&key.0, key.1, entry)),
                    None => HttpResponse::empty(StatusCode::NOT_FOUND),
                },
                None => HttpResponse::empty(StatusCode::NOT_FOUND),
            },
            (Method::Put, ["entry", author, id]) => {
                let now = self.tick(state);
                update_entry(state, caller.as_deref(), parse_key(author, id), body.as_ref(), now)
            }
            (Method::Delete, ["entry", author, id]) => {
                delete_entry(state, caller.as_deref(), parse_key(author, id))
            }
            _ => HttpResponse::empty(StatusCode::NOT_FOUND),
        }
    }
}

impl HttpClient for FakeFederation {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = url::Url::parse(&request.url)
            .map_err(|e| TransportError::Other(format!("invalid url {}: {e}", request.url)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(TransportError::Other(format!("no host in {}", request.url))),
        };
        let path = request.api_path().to_string();

        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if state.unreachable.contains(&host) {
            return Err(TransportError::Connect(format!("{host} is unreachable")));
        }
        Ok(self.handle(&mut state, &host, &path, &request))
    }
}

fn host_of(userid: &str) -> &str {
    userid.split_once('@').map_or("", |(_, host)| host)
}

fn user_reply(userid: &str) -> Value {
    let (username, hostname) = userid.split_once('@').unwrap_or((userid, ""));
    json!({"username": username, "server": {"hostname": hostname}})
}

fn next_id(state: &mut State, author: &str) -> u64 {
    let counter = state.next_ids.entry(author.to_string()).or_insert(0);
    *counter += 1;
    *counter
}

fn parse_key(author: &str, id: &str) -> Option<(String, u64)> {
    Some((author.to_string(), id.parse().ok()?))
}

fn authenticate(
    state: &State,
    host: &str,
    request: &HttpRequest,
) -> Result<Option<String>, HttpResponse> {
    let Some(credentials) = &request.credentials else {
        return Ok(None);
    };
    let userid = format!("{}@{host}", credentials.username);
    let password = credentials.password.as_deref().map(String::as_str);
    match state.accounts.get(&userid) {
        Some(account) if password == Some(account.password.as_str()) => Ok(Some(userid)),
        _ => Err(HttpResponse::empty(StatusCode::UNAUTHORIZED)),
    }
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

fn stored_entry(body: &Value, now: NaiveDateTime) -> StoredEntry {
    let mut fields = Map::new();
    for name in TEXT_FIELDS {
        fields.insert(
            name.to_string(),
            Value::String(text(body, name).unwrap_or_default()),
        );
    }
    let contributors = body
        .get("contributors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    StoredEntry {
        fields,
        contributors,
        published: now,
        updated: now,
    }
}

fn row(author: &str, id: u64, entry: &StoredEntry) -> Value {
    let mut map = entry.fields.clone();
    map.insert("id".to_string(), json!(id));
    map.insert("author".to_string(), user_reply(author));
    map.insert("contributors".to_string(), json!(entry.contributors));
    map.insert(
        "published".to_string(),
        Value::String(entry.published.format(TIME_FORMAT).to_string()),
    );
    map.insert(
        "updated".to_string(),
        Value::String(entry.updated.format(TIME_FORMAT).to_string()),
    );
    Value::Object(map)
}

fn register(state: &mut State, host: &str, body: Option<&Value>) -> HttpResponse {
    let Some(body) = body else {
        return HttpResponse::empty(StatusCode::BAD_REQUEST);
    };
    let (Some(username), Some(password), Some(email)) = (
        text(body, "username"),
        text(body, "password"),
        text(body, "email"),
    ) else {
        return HttpResponse::empty(StatusCode::BAD_REQUEST);
    };
    let userid = format!("{username}@{host}");
    if state.accounts.contains_key(&userid) {
        return HttpResponse::empty(StatusCode::CONFLICT);
    }
    state.accounts.insert(
        userid.clone(),
        Account {
            password,
            email: Some(email),
            biography: String::new(),
            subscriptions: BTreeSet::new(),
        },
    );
    HttpResponse::json(StatusCode::CREATED, &user_reply(&userid))
}

fn update_user(
    state: &mut State,
    caller: Option<&str>,
    userid: &str,
    body: Option<&Value>,
) -> HttpResponse {
    let Some(caller) = caller else {
        return HttpResponse::empty(StatusCode::UNAUTHORIZED);
    };
    if caller != userid {
        return HttpResponse::empty(StatusCode::FORBIDDEN);
    }
    let (Some(account), Some(body)) = (state.accounts.get_mut(userid), body) else {
        return HttpResponse::empty(StatusCode::NOT_FOUND);
    };
    if let Some(password) = text(body, "password") {
        account.password = password;
    }
    if let Some(biography) = text(body, "biography") {
        account.biography = biography;
    }
    HttpResponse::empty(StatusCode::OK)
}

fn create_entry(
    state: &mut State,
    caller: Option<&str>,
    body: Option<&Value>,
    now: NaiveDateTime,
) -> HttpResponse {
    let (Some(caller), Some(body)) = (caller, body) else {
        return HttpResponse::empty(StatusCode::FORBIDDEN);
    };
    if text(body, "author").as_deref() != Some(caller) {
        return HttpResponse::empty(StatusCode::FORBIDDEN);
    }
    let id = next_id(state, caller);
    let entry = stored_entry(body, now);
    state.entries.insert((caller.to_string(), id), entry);
    HttpResponse::new(StatusCode::CREATED, id.to_string())
}

fn update_entry(
    state: &mut State,
    caller: Option<&str>,
    key: Option<(String, u64)>,
    body: Option<&Value>,
    now: NaiveDateTime,
) -> HttpResponse {
    let Some(key) = key else {
        return HttpResponse::empty(StatusCode::NOT_FOUND);
    };
    if caller != Some(key.0.as_str()) {
        return HttpResponse::empty(StatusCode::FORBIDDEN);
    }
    let (Some(entry), Some(body)) = (state.entries.get_mut(&key), body) else {
        return HttpResponse::empty(StatusCode::NOT_FOUND);
    };
    let fresh = stored_entry(body, now);
    entry.fields = fresh.fields;
    entry.contributors = fresh.contributors;
    entry.updated = now;
    HttpResponse::empty(StatusCode::OK)
}

fn delete_entry(state: &mut State, caller: Option<&str>, key: Option<(String, u64)>) -> HttpResponse {
    let Some(key) = key else {
        return HttpResponse::empty(StatusCode::NOT_FOUND);
    };
    if caller != Some(key.0.as_str()) {
        return HttpResponse::empty(StatusCode::FORBIDDEN);
    }
    match state.entries.remove(&key) {
        Some(_) => HttpResponse::empty(StatusCode::OK),
        None => HttpResponse::empty(StatusCode::NOT_FOUND),
    }
}

/// Lists entries. `visible(author, sharer)` selects native entries (no
/// sharer) and shared ones.
fn list<F>(state: &State, request: &HttpRequest, visible: F) -> HttpResponse
where
    F: Fn(&str, Option<&str>) -> bool,
{
    let authors = request.query_values("author");
    let contents = request.query_values("content");
    let native = !request.has_query("nonative");
    let shared = request.has_query("shared");

    let matches = |author: &str, entry: &StoredEntry| {
        let content = entry
            .fields
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        (authors.is_empty() || authors.contains(&author))
            && contents.iter().all(|c| content.contains(c))
    };

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    if native {
        for ((author, id), entry) in &state.entries {
            if visible(author.as_str(), None)
                && matches(author.as_str(), entry)
                && seen.insert((author, *id))
            {
                rows.push(row(author, *id, entry));
            }
        }
    }
    if shared {
        for (sharer, author, id) in &state.shares {
            let Some(entry) = state.entries.get(&(author.clone(), *id)) else {
                continue;
            };
            if visible(author.as_str(), Some(sharer.as_str()))
                && matches(author.as_str(), entry)
                && seen.insert((author, *id))
            {
                rows.push(row(author, *id, entry));
            }
        }
    }
    HttpResponse::json(StatusCode::OK, &Value::Array(rows))
}
