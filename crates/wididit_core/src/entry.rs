//! Entry entity.
//!
//! An [`Entry`] is a post, identified by its author's userid and a numeric
//! id the author's server assigns. All nine content fields are cached
//! locally and written through one at a time: each write PUTs the whole
//! serialized state with one field replaced, then re-reads the entry to
//! pick up the new `updated` timestamp.

use crate::error::{ClientError, ClientResult};
use crate::field::{push, FieldKind, FieldValue, FieldWrite};
use crate::http::{HttpResponse, StatusCode};
use crate::people::{resolve_user, User, UserRef};
use crate::registry::{identity_semantics, Identity};
use crate::server::Server;
use crate::session::Context;
use crate::validation::{
    check_length, MAX_GENERATOR_LENGTH, MAX_SUBTITLE_LENGTH, MAX_TAG_LENGTH, MAX_TITLE_LENGTH,
    TIME_FORMAT,
};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Editable fields of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryField {
    /// Body of the entry.
    Content,
    /// Category tag.
    Category,
    /// Users credited besides the author.
    Contributors,
    /// Software that produced the entry.
    Generator,
    /// Copyright statement.
    Rights,
    /// Where the entry comes from.
    Source,
    /// Subtitle.
    Subtitle,
    /// Summary.
    Summary,
    /// Title.
    Title,
}

impl EntryField {
    /// Every editable field.
    pub const ALL: [EntryField; 9] = [
        EntryField::Content,
        EntryField::Category,
        EntryField::Contributors,
        EntryField::Generator,
        EntryField::Rights,
        EntryField::Source,
        EntryField::Subtitle,
        EntryField::Summary,
        EntryField::Title,
    ];

    /// Returns the wire name.
    pub fn name(&self) -> &'static str {
        match self {
            EntryField::Content => "content",
            EntryField::Category => "category",
            EntryField::Contributors => "contributors",
            EntryField::Generator => "generator",
            EntryField::Rights => "rights",
            EntryField::Source => "source",
            EntryField::Subtitle => "subtitle",
            EntryField::Summary => "summary",
            EntryField::Title => "title",
        }
    }

    /// Returns the kind of value the field holds.
    pub fn kind(&self) -> FieldKind {
        match self {
            EntryField::Contributors => FieldKind::People,
            _ => FieldKind::Text,
        }
    }

    /// Returns the longest accepted text, if bounded.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            EntryField::Category => Some(MAX_TAG_LENGTH),
            EntryField::Generator => Some(MAX_GENERATOR_LENGTH),
            EntryField::Subtitle => Some(MAX_SUBTITLE_LENGTH),
            EntryField::Title => Some(MAX_TITLE_LENGTH),
            _ => None,
        }
    }

    /// Checks a value locally before it is sent.
    pub fn validate(&self, value: &FieldValue) -> ClientResult<()> {
        if value.kind() != self.kind() {
            return Err(ClientError::invalid_value(format!(
                "{} expects {}, not {}",
                self.name(),
                self.kind(),
                value.kind()
            )));
        }
        if let (Some(max), Some(text)) = (self.max_len(), value.as_text()) {
            check_length(self.name(), text, max)?;
        }
        Ok(())
    }
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
struct EntryState {
    content: String,
    category: String,
    contributors: Vec<Arc<User>>,
    generator: String,
    rights: String,
    source: String,
    subtitle: String,
    summary: String,
    title: String,
    published: NaiveDateTime,
    updated: NaiveDateTime,
}

impl EntryState {
    fn text(&self, field: EntryField) -> Option<&String> {
        match field {
            EntryField::Content => Some(&self.content),
            EntryField::Category => Some(&self.category),
            EntryField::Generator => Some(&self.generator),
            EntryField::Rights => Some(&self.rights),
            EntryField::Source => Some(&self.source),
            EntryField::Subtitle => Some(&self.subtitle),
            EntryField::Summary => Some(&self.summary),
            EntryField::Title => Some(&self.title),
            EntryField::Contributors => None,
        }
    }

    fn text_mut(&mut self, field: EntryField) -> Option<&mut String> {
        match field {
            EntryField::Content => Some(&mut self.content),
            EntryField::Category => Some(&mut self.category),
            EntryField::Generator => Some(&mut self.generator),
            EntryField::Rights => Some(&mut self.rights),
            EntryField::Source => Some(&mut self.source),
            EntryField::Subtitle => Some(&mut self.subtitle),
            EntryField::Summary => Some(&mut self.summary),
            EntryField::Title => Some(&mut self.title),
            EntryField::Contributors => None,
        }
    }

    fn get(&self, field: EntryField) -> FieldValue {
        match self.text(field) {
            Some(text) => FieldValue::Text(text.clone()),
            None => FieldValue::People(self.contributors.clone()),
        }
    }

    // Kinds are checked by EntryField::validate beforehand.
    fn set(&mut self, field: EntryField, value: FieldValue) {
        match (self.text_mut(field), value) {
            (Some(slot), FieldValue::Text(text)) => *slot = text,
            (None, FieldValue::People(people)) => self.contributors = people,
            _ => {}
        }
    }

    fn from_reply(ctx: &Arc<Context>, reply: EntryReply, default_host: &str) -> ClientResult<Self> {
        let contributors = reply
            .contributors
            .into_iter()
            .map(|c| resolve_user(ctx, UserRef::Reply(c), Some(default_host)))
            .collect::<ClientResult<Vec<_>>>()?;
        Ok(Self {
            content: reply.content,
            category: reply.category,
            contributors,
            generator: reply.generator,
            rights: reply.rights,
            source: reply.source,
            subtitle: reply.subtitle,
            summary: reply.summary,
            title: reply.title,
            published: parse_time(&reply.published)?,
            updated: parse_time(&reply.updated)?,
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EntryReply {
    content: String,
    category: String,
    contributors: Vec<Value>,
    generator: String,
    rights: String,
    source: String,
    subtitle: String,
    summary: String,
    title: String,
    published: String,
    updated: String,
}

fn parse_time(text: &str) -> ClientResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .map_err(|e| ClientError::invalid_response(format!("bad timestamp {text:?}: {e}")))
}

fn id_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("id").and_then(id_from_value),
        _ => None,
    }
}

fn entry_path(userid: &str, id: u64) -> String {
    format!("/entry/{userid}/{id}/")
}

/// A Wididit entry.
pub struct Entry {
    author: Arc<User>,
    id: u64,
    state: RwLock<EntryState>,
}

impl Identity for Entry {
    type Key = (String, u64);
    const NAMESPACE: &'static str = "wididit.entry";
    const TYPE_NAME: &'static str = "Entry";

    fn identity_key(&self) -> Self::Key {
        (self.author.userid(), self.id)
    }

    fn refresh_from(&self, fresh: Self) {
        *self.state.write() = fresh.state.into_inner();
    }
}

identity_semantics!(Entry);

impl Entry {
    /// Fetches an existing entry by id.
    pub(crate) fn fetch(ctx: &Arc<Context>, author: Arc<User>, id: u64) -> ClientResult<Arc<Self>> {
        let path = entry_path(&author.userid(), id);
        let response = author.server().get(&path, &[])?;
        let reply = read_entry(author.server(), &response, || {
            format!("{}/{id}", author.userid())
        })?;
        let state = EntryState::from_reply(ctx, reply, author.hostname())?;
        let entry = Entry {
            author,
            id,
            state: RwLock::new(state),
        };
        Ok(ctx.entries.resolve(entry.identity_key(), entry))
    }

    /// Creates an entry remotely, then fetches what the server stored.
    pub(crate) fn create(
        ctx: &Arc<Context>,
        author: Arc<User>,
        initial: NewEntry,
    ) -> ClientResult<Arc<Self>> {
        initial.validate()?;
        let payload = initial.to_payload(&author.userid(), &ctx.config.default_generator);

        let server = author.server();
        let response = server.post("/entry/", &payload)?;
        match response.status {
            StatusCode::CREATED => {}
            StatusCode::FORBIDDEN => return Err(ClientError::forbidden("create an entry")),
            status => return Err(ClientError::server(status)),
        }
        let id = parse_created_id(server, &response)?;
        debug!(author = %author.userid(), id, "entry created");

        Self::fetch(ctx, author, id)
    }

    /// Builds an entry from one row of a listing, without refetching.
    pub(crate) fn from_row(ctx: &Arc<Context>, server: &Server, row: Value) -> ClientResult<Arc<Self>> {
        let id = row
            .get("id")
            .and_then(id_from_value)
            .ok_or_else(|| ClientError::invalid_response("entry row without an id"))?;
        let author = row
            .get("author")
            .cloned()
            .ok_or_else(|| ClientError::invalid_response("entry row without an author"))?;
        let author = resolve_user(ctx, UserRef::Reply(author), Some(server.hostname()))?;

        let reply: EntryReply = serde_json::from_value(row)
            .map_err(|e| ClientError::invalid_response(e.to_string()))?;
        let state = EntryState::from_reply(ctx, reply, author.hostname())?;
        let entry = Entry {
            author,
            id,
            state: RwLock::new(state),
        };
        Ok(ctx.entries.resolve(entry.identity_key(), entry))
    }

    /// Returns the author.
    pub fn author(&self) -> &Arc<User> {
        &self.author
    }

    /// Returns the id, unique per author.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `userid/id`.
    pub fn entryid(&self) -> String {
        format!("{}/{}", self.author.userid(), self.id)
    }

    /// Returns the path of this entry in the API.
    pub fn api_path(&self) -> String {
        entry_path(&self.author.userid(), self.id)
    }

    /// Returns the cached value of a field.
    pub fn get(&self, field: EntryField) -> FieldValue {
        self.state.read().get(field)
    }

    /// Returns the users credited besides the author.
    pub fn contributors(&self) -> Vec<Arc<User>> {
        self.state.read().contributors.clone()
    }

    /// Returns when the entry was first published.
    pub fn published(&self) -> NaiveDateTime {
        self.state.read().published
    }

    /// Returns when the entry was last modified.
    pub fn updated(&self) -> NaiveDateTime {
        self.state.read().updated
    }

    /// Writes one field through to the server.
    ///
    /// The value is checked locally first. Once the server accepts the write
    /// the cache holds the new value, and the entry is re-read to refresh
    /// [`Entry::updated`]. A rejected write leaves the cache untouched.
    ///
    /// An error from the re-read does not undo anything: the server and the
    /// cache both hold the written value, and only [`Entry::updated`] is
    /// stale.
    pub fn set(&self, field: EntryField, value: impl Into<FieldValue>) -> ClientResult<()> {
        let value = value.into();
        field.validate(&value)?;

        let mut payload = self.as_serializable();
        if let Value::Object(map) = &mut payload {
            map.insert(field.name().to_string(), value.to_wire());
        }
        let server = self.author.server();
        push(
            server,
            FieldWrite {
                path: &self.api_path(),
                payload,
                action: "edit this entry",
                denied: &[StatusCode::FORBIDDEN],
            },
        )?;
        self.state.write().set(field, value);

        let response = server.get(&self.api_path(), &[])?;
        let reply = read_entry(server, &response, || self.entryid())?;
        self.state.write().updated = parse_time(&reply.updated)?;
        Ok(())
    }

    /// Writes the contributors through to the server.
    pub fn set_contributors(&self, contributors: Vec<Arc<User>>) -> ClientResult<()> {
        self.set(EntryField::Contributors, FieldValue::People(contributors))
    }

    /// Re-reads every field from the server, discarding the cache.
    pub fn sync(&self) -> ClientResult<()> {
        let server = self.author.server();
        let response = server.get(&self.api_path(), &[])?;
        let reply = read_entry(server, &response, || self.entryid())?;
        let state = EntryState::from_reply(server.context(), reply, self.author.hostname())?;
        *self.state.write() = state;
        Ok(())
    }

    /// Returns the full field state as sent on the wire.
    pub fn as_serializable(&self) -> Value {
        let state = self.state.read();
        let mut map = Map::new();
        for field in EntryField::ALL {
            map.insert(field.name().to_string(), state.get(field).to_wire());
        }
        map.insert("author".to_string(), Value::String(self.author.userid()));
        map.insert(
            "published".to_string(),
            Value::String(state.published.format(TIME_FORMAT).to_string()),
        );
        map.insert(
            "updated".to_string(),
            Value::String(state.updated.format(TIME_FORMAT).to_string()),
        );
        Value::Object(map)
    }
}

fn read_entry<F>(server: &Server, response: &HttpResponse, entryid: F) -> ClientResult<EntryReply>
where
    F: FnOnce() -> String,
{
    match response.status {
        StatusCode::OK => server.decode(response),
        StatusCode::NOT_FOUND => Err(ClientError::not_found(entryid())),
        status => Err(ClientError::server(status)),
    }
}

fn parse_created_id(server: &Server, response: &HttpResponse) -> ClientResult<u64> {
    if let Some(id) = std::str::from_utf8(&response.body)
        .ok()
        .and_then(|text| text.trim().parse().ok())
    {
        return Ok(id);
    }
    let value = server.unserialize(&response.body)?;
    id_from_value(&value).ok_or_else(|| {
        ClientError::invalid_response(format!("no entry id in creation reply: {value}"))
    })
}

macro_rules! text_fields {
    ($($field:ident: $get:ident / $set:ident),* $(,)?) => {
        impl Entry {
            $(
                #[doc = concat!("Returns the cached ", stringify!($get), ".")]
                pub fn $get(&self) -> String {
                    self.state.read().$get.clone()
                }

                #[doc = concat!("Writes the ", stringify!($get), " through to the server.")]
                pub fn $set(&self, value: impl Into<String>) -> ClientResult<()> {
                    self.set(EntryField::$field, FieldValue::Text(value.into()))
                }
            )*
        }

        impl NewEntry {
            $(
                #[doc = concat!("Sets the initial ", stringify!($get), ".")]
                pub fn $get(self, value: impl Into<String>) -> Self {
                    self.with(EntryField::$field, FieldValue::Text(value.into()))
                }
            )*
        }
    };
}

text_fields! {
    Content: content / set_content,
    Category: category / set_category,
    Generator: generator / set_generator,
    Rights: rights / set_rights,
    Source: source / set_source,
    Subtitle: subtitle / set_subtitle,
    Summary: summary / set_summary,
    Title: title / set_title,
}

/// Initial fields of an entry to create.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct NewEntry {
    values: BTreeMap<EntryField, FieldValue>,
}

impl NewEntry {
    /// Creates an empty set of initial fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one initial field.
    pub fn with(mut self, field: EntryField, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    /// Sets the initial contributors.
    pub fn contributors(self, contributors: Vec<Arc<User>>) -> Self {
        self.with(EntryField::Contributors, FieldValue::People(contributors))
    }

    /// Returns the value set for a field, if any.
    pub fn value(&self, field: EntryField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    fn validate(&self) -> ClientResult<()> {
        for (field, value) in &self.values {
            field.validate(value)?;
        }
        Ok(())
    }

    fn to_payload(&self, author: &str, default_generator: &str) -> Value {
        let mut map: Map<String, Value> = self
            .values
            .iter()
            .map(|(field, value)| (field.name().to_string(), value.to_wire()))
            .collect();
        map.insert("author".to_string(), Value::String(author.to_string()));
        map.entry("generator")
            .or_insert_with(|| Value::String(default_generator.to_string()));
        Value::Object(map)
    }
}
