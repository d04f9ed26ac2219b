//! Transport adapter for one Wididit host.
//!
//! A [`Server`] resolves paths against the host's API base, attaches basic
//! authentication from the user it is connected as, and hands raw responses
//! back to the calling entity. Status codes are not interpreted here.

use crate::error::{ClientError, ClientResult};
use crate::http::{Credentials, HttpRequest, HttpResponse, Method, StatusCode, TransportError};
use crate::people::User;
use crate::registry::{identity_semantics, Identity};
use crate::session::Context;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Authentication attached to a single request.
#[derive(Debug, Clone)]
pub(crate) enum Auth {
    /// Use the server's `connected_as` user, if any.
    Connected,
    /// Use these credentials regardless of `connected_as`.
    As(Credentials),
    /// Send no credentials.
    Anonymous,
}

/// A Wididit host, as seen from this session.
pub struct Server {
    hostname: String,
    api_base: RwLock<String>,
    connected_as: RwLock<Option<Arc<User>>>,
    ctx: Arc<Context>,
}

impl Identity for Server {
    type Key = String;
    const NAMESPACE: &'static str = "wididit.server";
    const TYPE_NAME: &'static str = "Server";

    fn identity_key(&self) -> String {
        self.hostname.clone()
    }

    // Nothing to pull: the only state is the local connected_as binding.
    fn refresh_from(&self, _fresh: Self) {}
}

identity_semantics!(Server);

#[derive(Deserialize)]
struct WhoamiReply {
    username: String,
    server: HostReply,
}

#[derive(Deserialize)]
pub(crate) struct HostReply {
    pub(crate) hostname: String,
}

impl Server {
    pub(crate) fn new(hostname: &str, ctx: Arc<Context>) -> Self {
        Self {
            hostname: hostname.to_string(),
            api_base: RwLock::new(ctx.config.api_base_for(hostname)),
            connected_as: RwLock::new(None),
            ctx,
        }
    }

    /// Returns the hostname, unique across the federation.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the base URL every API path is appended to.
    pub fn api_base(&self) -> String {
        self.api_base.read().clone()
    }

    /// Replaces the API base of this server.
    pub fn force_api_base(&self, base: impl Into<String>) {
        *self.api_base.write() = base.into();
    }

    /// Returns the user requests are authenticated as.
    pub fn connected_as(&self) -> Option<Arc<User>> {
        self.connected_as.read().clone()
    }

    /// Authenticates later requests as `user`.
    ///
    /// Nothing is checked until a request is made. The binding is undone
    /// when the session is dropped.
    pub fn set_connected_as(self: &Arc<Self>, user: Arc<User>) {
        debug!(server = %self.hostname, user = %user.userid(), "connected");
        self.ctx.track_bound(self);
        *self.connected_as.write() = Some(user);
    }

    /// Makes later requests unauthenticated.
    pub fn clear_connected_as(&self) {
        *self.connected_as.write() = None;
    }

    pub(crate) fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Performs a GET request.
    pub fn get(&self, path: &str, params: &[(String, String)]) -> ClientResult<HttpResponse> {
        self.send(Method::Get, path, params.to_vec(), None, Auth::Connected)
    }

    /// Performs a POST request with a serialized body.
    pub fn post(&self, path: &str, body: &Value) -> ClientResult<HttpResponse> {
        self.send(Method::Post, path, Vec::new(), Some(body), Auth::Connected)
    }

    /// Performs a PUT request with a serialized body.
    pub fn put(&self, path: &str, body: &Value) -> ClientResult<HttpResponse> {
        self.send(Method::Put, path, Vec::new(), Some(body), Auth::Connected)
    }

    /// Performs a DELETE request.
    pub fn delete(&self, path: &str) -> ClientResult<HttpResponse> {
        self.send(Method::Delete, path, Vec::new(), None, Auth::Connected)
    }

    /// Serializes data with the session's wire codec.
    pub fn serialize(&self, data: &Value) -> ClientResult<Vec<u8>> {
        Ok(self.ctx.codec.serialize(data)?)
    }

    /// Unserializes data with the session's wire codec.
    pub fn unserialize(&self, bytes: &[u8]) -> ClientResult<Value> {
        Ok(self.ctx.codec.unserialize(bytes)?)
    }

    /// Asks the server who the current credentials belong to.
    ///
    /// Returns `None` when the server does not answer 200.
    pub fn whoami(&self) -> ClientResult<Option<String>> {
        let response = self.get("/whoami/", &[])?;
        if response.status != StatusCode::OK {
            return Ok(None);
        }
        let reply: WhoamiReply = self.decode(&response)?;
        Ok(Some(format!("{}@{}", reply.username, reply.server.hostname)))
    }

    /// Decodes a reply body into a typed shape.
    pub(crate) fn decode<T: DeserializeOwned>(&self, response: &HttpResponse) -> ClientResult<T> {
        let value = self.unserialize(&response.body)?;
        serde_json::from_value(value).map_err(|e| ClientError::invalid_response(e.to_string()))
    }

    pub(crate) fn send(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<&Value>,
        auth: Auth,
    ) -> ClientResult<HttpResponse> {
        let credentials = match auth {
            Auth::Connected => self.connected_as().map(|user| user.credentials()),
            Auth::As(credentials) => Some(credentials),
            Auth::Anonymous => None,
        };
        let body = body.map(|data| self.serialize(data)).transpose()?;

        let request = HttpRequest {
            method,
            url: format!("{}{}", self.api_base(), path),
            query,
            content_type: body.as_ref().map(|_| self.ctx.codec.content_type()),
            body,
            credentials,
        };
        let url = request.url.clone();

        match self.ctx.client.execute(request) {
            Ok(response) => {
                debug!(%method, %url, status = response.status.as_u16(), "request");
                Ok(response)
            }
            Err(TransportError::Connect(reason)) => {
                warn!(server = %self.hostname, %reason, "server unreachable");
                Err(ClientError::unreachable(&self.hostname))
            }
            Err(TransportError::Other(reason)) => Err(ClientError::transport(reason)),
        }
    }
}
