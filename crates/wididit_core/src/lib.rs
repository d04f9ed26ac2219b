//! # Wididit Core
//!
//! Client-side object model for the Wididit federated microblogging API.
//!
//! This crate provides:
//! - Users ([`User`]) and entries ([`Entry`]) mapped from remote resources
//! - A per-host transport adapter ([`Server`]) with basic authentication
//! - Lazy, chainable entry queries ([`EntryQuery`])
//! - Identity registries sharing one instance per remote resource
//! - An injectable blocking HTTP client ([`HttpClient`])
//!
//! ## Architecture
//!
//! A [`Wididit`] session is the root of everything: it owns the
//! configuration, the HTTP client, the wire codec and the registries.
//! Entities reach the network through the server of their host:
//! 1. The entity builds a path and a payload
//! 2. The server attaches credentials and performs the request
//! 3. The entity maps the status to success or a [`ClientError`]
//! 4. On success the entity updates its cached fields
//!
//! ## Key Invariants
//!
//! - The server is authoritative; local state is a cache
//! - A field is cached only after the server accepted it
//! - Local validation happens before any request
//! - Entities with equal identity keys are equal
//! - No retries; every error reaches the immediate caller

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entry;
mod error;
mod field;
mod http;
mod mock;
mod people;
mod query;
mod registry;
mod server;
mod session;
mod validation;

pub use config::{Config, IdentityModes, HOSTNAME_PLACEHOLDER};
pub use entry::{Entry, EntryField, NewEntry};
pub use error::{ClientError, ClientResult};
pub use field::{FieldKind, FieldValue};
pub use http::{
    Credentials, HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient, StatusCode,
    TransportError,
};
pub use mock::MockClient;
pub use people::{User, UserBuilder, UserRef};
pub use query::{EntryQuery, QueryMode};
pub use registry::{canonical_repr, Identity, IdentityKey, IdentityMode, Registry};
pub use server::Server;
pub use session::Wididit;
pub use validation::{
    is_valid_username, usermask_to_tuple, validate_hostname, validate_known_username,
    validate_username,
    MAX_GENERATOR_LENGTH, MAX_HOSTNAME_LENGTH, MAX_SUBTITLE_LENGTH, MAX_TAG_LENGTH,
    MAX_TITLE_LENGTH, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH, TIME_FORMAT,
};
pub use wididit_codec::{CborCodec, CodecError, JsonCodec, WireCodec};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
