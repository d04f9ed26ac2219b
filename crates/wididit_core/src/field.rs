//! Remote-backed fields.
//!
//! Every editable attribute of a User or an Entry is written the same way:
//! the new value is validated locally, PUT to the entity's resource, and
//! only cached once the server accepted it. [`push`] implements the remote
//! half of that protocol; the entities own their caches.

use crate::error::{ClientError, ClientResult};
use crate::http::StatusCode;
use crate::people::User;
use crate::server::Server;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// A list of users.
    People,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => f.write_str("text"),
            FieldKind::People => f.write_str("a list of people"),
        }
    }
}

/// A value assigned to, or read from, a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// A list of users.
    People(Vec<Arc<User>>),
}

impl FieldValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::People(_) => FieldKind::People,
        }
    }

    /// Returns the text, for text values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::People(_) => None,
        }
    }

    /// Returns the users, for people values.
    pub fn as_people(&self) -> Option<&[Arc<User>]> {
        match self {
            FieldValue::People(people) => Some(people),
            FieldValue::Text(_) => None,
        }
    }

    /// Returns the wire representation: a string, or a list of userids.
    pub fn to_wire(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::People(people) => {
                Value::Array(people.iter().map(|u| Value::String(u.userid())).collect())
            }
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<Vec<Arc<User>>> for FieldValue {
    fn from(people: Vec<Arc<User>>) -> Self {
        FieldValue::People(people)
    }
}

/// One write of a remote-backed field.
pub(crate) struct FieldWrite<'a> {
    /// API path of the owning entity.
    pub path: &'a str,
    /// Body of the PUT.
    pub payload: Value,
    /// Action named in the permission error.
    pub action: &'static str,
    /// Statuses that mean the caller lacks the right to write.
    pub denied: &'static [StatusCode],
}

/// PUTs a field write and maps the reply status.
///
/// Only 200 is a success. The caller updates its cache afterwards.
pub(crate) fn push(server: &Server, write: FieldWrite<'_>) -> ClientResult<()> {
    let response = server.put(write.path, &write.payload)?;
    let status = response.status;
    if status == StatusCode::OK {
        debug!(path = write.path, "field written");
        Ok(())
    } else if write.denied.contains(&status) {
        Err(ClientError::forbidden(write.action))
    } else {
        Err(ClientError::server(status))
    }
}
