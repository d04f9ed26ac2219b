//! Lazy entry queries.
//!
//! An [`EntryQuery`] accumulates filters without touching the network;
//! [`EntryQuery::fetch`] issues exactly one GET and materializes every row
//! into an [`Entry`].

use crate::entry::Entry;
use crate::error::{ClientError, ClientResult};
use crate::http::StatusCode;
use crate::server::Server;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which set of entries a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Every entry the server knows.
    All,
    /// Entries from the users the connected user subscribed to.
    Timeline,
}

impl QueryMode {
    /// Returns the API path of the listing.
    pub fn path(&self) -> &'static str {
        match self {
            QueryMode::All => "/entry/",
            QueryMode::Timeline => "/entry/timeline/",
        }
    }
}

/// A chainable, lazily evaluated entry listing.
#[derive(Debug, Clone)]
#[must_use]
pub struct EntryQuery {
    server: Arc<Server>,
    mode: QueryMode,
    authors: Vec<String>,
    contents: Vec<String>,
    native: bool,
    shared: bool,
}

impl EntryQuery {
    /// Lists every entry of `server`.
    pub fn all(server: Arc<Server>) -> Self {
        Self::with_mode(server, QueryMode::All)
    }

    /// Lists the subscribed timeline of the user `server` is connected as.
    ///
    /// Fails with `Forbidden` when nobody is connected.
    pub fn timeline(server: Arc<Server>) -> ClientResult<Self> {
        if server.connected_as().is_none() {
            return Err(ClientError::forbidden("read the timeline"));
        }
        Ok(Self::with_mode(server, QueryMode::Timeline))
    }

    fn with_mode(server: Arc<Server>, mode: QueryMode) -> Self {
        Self {
            server,
            mode,
            authors: Vec::new(),
            contents: Vec::new(),
            native: true,
            shared: false,
        }
    }

    /// Keeps entries by this author. Repeated calls widen the match.
    pub fn filter_author(mut self, author: impl fmt::Display) -> Self {
        self.authors.push(author.to_string());
        self
    }

    /// Keeps entries containing this text. Repeated calls narrow the match.
    pub fn filter_content(mut self, content: impl Into<String>) -> Self {
        self.contents.push(content.into());
        self
    }

    /// Includes entries written by their authors.
    pub fn allow_native(mut self, allow: bool) -> Self {
        self.native = allow;
        self
    }

    /// Includes entries shared by other users.
    pub fn allow_shared(mut self, allow: bool) -> Self {
        self.shared = allow;
        self
    }

    /// Returns the mode.
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Returns the query parameters the fetch will send.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .authors
            .iter()
            .map(|a| ("author".to_string(), a.clone()))
            .chain(self.contents.iter().map(|c| ("content".to_string(), c.clone())))
            .collect();
        if !self.native {
            params.push(("nonative".to_string(), String::new()));
        }
        if self.shared {
            params.push(("shared".to_string(), String::new()));
        }
        params
    }

    /// Runs the query.
    pub fn fetch(&self) -> ClientResult<Vec<Arc<Entry>>> {
        let response = self.server.get(self.mode.path(), &self.params())?;
        if response.status != StatusCode::OK {
            return Err(ClientError::server(response.status));
        }
        let rows = match self.server.unserialize(&response.body)? {
            Value::Array(rows) => rows,
            other => {
                return Err(ClientError::invalid_response(format!(
                    "expected a list of entries, got {other}"
                )))
            }
        };
        debug!(server = %self.server.hostname(), rows = rows.len(), "entries fetched");

        let ctx = self.server.context();
        rows.into_iter()
            .map(|row| Entry::from_row(ctx, &self.server, row))
            .collect()
    }
}
