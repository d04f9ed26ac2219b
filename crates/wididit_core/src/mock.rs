//! Scripted HTTP client for tests.

use crate::http::{HttpClient, HttpRequest, HttpResponse, StatusCode, TransportError};
use parking_lot::Mutex;

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// An [`HttpClient`] that answers through a handler closure and records
/// every request it sees.
pub struct MockClient {
    handler: Mutex<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockClient {
    /// Creates a mock answering every request with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Mutex::new(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock answering every request with the same status and an
    /// empty body.
    pub fn with_status(status: StatusCode) -> Self {
        Self::new(move |_| Ok(HttpResponse::empty(status)))
    }

    /// Creates a mock for which no host can be reached.
    pub fn unreachable() -> Self {
        Self::new(|request| {
            Err(TransportError::Connect(format!(
                "cannot connect to {}",
                request.url
            )))
        })
    }

    /// Replaces the handler.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        *self.handler.lock() = Box::new(handler);
    }

    /// Returns a copy of every recorded request.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns and forgets every recorded request.
    pub fn take_requests(&self) -> Vec<HttpRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// Returns the number of recorded requests.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl HttpClient for MockClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = (self.handler.lock())(&request);
        self.requests.lock().push(request);
        result
    }
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClient")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}
