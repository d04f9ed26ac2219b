//! HTTP client abstraction.
//!
//! The object model never talks to the network directly. Every request goes
//! through an [`HttpClient`] injected into the [`crate::Wididit`] session, so
//! the production [`ReqwestClient`] can be replaced by [`crate::MockClient`]
//! or an in-memory server in tests.

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
pub use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// HTTP verbs used by the Wididit API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the verb as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Basic-auth credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password, if known.
    pub password: Option<Zeroizing<String>>,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: Option<&str>) -> Self {
        Self {
            username: username.into(),
            password: password.map(|p| Zeroizing::new(p.to_string())),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A request as handed to an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL, without query string.
    pub url: String,
    /// Query parameters, in order; keys may repeat.
    pub query: Vec<(String, String)>,
    /// Serialized body.
    pub body: Option<Vec<u8>>,
    /// MIME type of the body.
    pub content_type: Option<&'static str>,
    /// Authentication to attach.
    pub credentials: Option<Credentials>,
}

impl HttpRequest {
    /// Creates a bodyless, unauthenticated request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
            credentials: None,
        }
    }

    /// Returns the part of the URL that follows the API base marker
    /// (`/api/json` by default), or the whole URL when it is absent.
    pub fn api_path(&self) -> &str {
        self.api_path_after("/api/json")
    }

    /// Returns the part of the URL that follows `marker`.
    pub fn api_path_after(&self, marker: &str) -> &str {
        match self.url.find(marker) {
            Some(i) => &self.url[i + marker.len()..],
            None => &self.url,
        }
    }

    /// Returns every value of a query parameter.
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checks whether a query parameter is present.
    pub fn has_query(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k == key)
    }
}

/// A raw response: status and body, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with an empty body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Vec::new())
    }

    /// Creates a response whose body is the JSON encoding of `value`.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The host could not be connected to.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Anything else (TLS, protocol, body read).
    #[error("{0}")]
    Other(String),
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Status codes
/// are returned as-is; interpreting them is the caller's job.
pub trait HttpClient: Send + Sync {
    /// Executes one request, blocking until the response is complete.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking HTTP client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client honoring the timeout and user agent of `config`.
    pub fn new(config: &Config) -> ClientResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut url = url::Url::parse(&request.url)
            .map_err(|e| TransportError::Other(format!("invalid url {}: {e}", request.url)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let mut builder = self.client.request(request.method.into(), url);
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, credentials.password.as_deref());
        }
        if let Some(body) = request.body {
            if let Some(content_type) = request.content_type {
                builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
            }
            builder = builder.body(body);
        }

        let response = builder.send().map_err(classify)?;
        let status = response.status();
        let body = response.bytes().map_err(classify)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
