//! Session: the scope of identity sharing.

use crate::config::Config;
use crate::entry::{Entry, NewEntry};
use crate::error::ClientResult;
use crate::http::{HttpClient, ReqwestClient};
use crate::people::{resolve_user, User, UserBuilder, UserRef};
use crate::query::EntryQuery;
use crate::registry::Registry;
use crate::server::Server;
use crate::validation::validate_hostname;
use std::fmt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;
use wididit_codec::{JsonCodec, WireCodec};

/// State shared by every entity of a session.
pub(crate) struct Context {
    pub(crate) config: Config,
    pub(crate) client: Arc<dyn HttpClient>,
    pub(crate) codec: Arc<dyn WireCodec>,
    pub(crate) servers: Registry<Server>,
    pub(crate) users: Registry<User>,
    pub(crate) entries: Registry<Entry>,
    /// Servers that had a user connected, shared or not.
    bound: Mutex<Vec<Weak<Server>>>,
}

impl Context {
    /// Remembers that `server` holds a connected user.
    pub(crate) fn track_bound(&self, server: &Arc<Server>) {
        let mut bound = self.bound.lock();
        bound.retain(|weak| weak.strong_count() > 0);
        if !bound.iter().any(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(server))) {
            bound.push(Arc::downgrade(server));
        }
    }

    /// Returns the server for `hostname`, creating it if needed.
    pub(crate) fn server(self: &Arc<Self>, hostname: &str) -> ClientResult<Arc<Server>> {
        validate_hostname(hostname)?;
        self.servers
            .get_or_create(hostname.to_string(), || Ok(Server::new(hostname, Arc::clone(self))))
    }
}

/// A Wididit client session.
///
/// The session owns the configuration, the HTTP client, the wire codec and
/// the identity registries. Every entity reached through it shares them.
/// Dropping the session unbinds the connected user of every server it
/// reached, shared or not, and empties the registries; entities still held by the caller keep working with the
/// session's client but are no longer shared.
///
/// ```no_run
/// use wididit_core::{Config, NewEntry, Wididit};
///
/// let wididit = Wididit::with_reqwest(Config::default())?;
/// let me = wididit
///     .user("tester", "test.wididit.net")
///     .password("secret")
///     .connect(true)
///     .build()?;
/// let entry = wididit.create_entry(&me, NewEntry::new().title("Hello"))?;
/// println!("{}", entry.entryid());
/// # Ok::<(), wididit_core::ClientError>(())
/// ```
pub struct Wididit {
    ctx: Arc<Context>,
}

impl Wididit {
    /// Creates a session speaking JSON through `client`.
    pub fn new<C: HttpClient + 'static>(config: Config, client: C) -> Self {
        Self::with_codec(config, client, JsonCodec)
    }

    /// Creates a session with an explicit wire codec.
    pub fn with_codec<C, K>(config: Config, client: C, codec: K) -> Self
    where
        C: HttpClient + 'static,
        K: WireCodec + 'static,
    {
        let identity = config.identity;
        Self {
            ctx: Arc::new(Context {
                config,
                client: Arc::new(client),
                codec: Arc::new(codec),
                servers: Registry::new(identity.server),
                users: Registry::new(identity.user),
                entries: Registry::new(identity.entry),
                bound: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a session over the network with the blocking `reqwest`
    /// client.
    pub fn with_reqwest(config: Config) -> ClientResult<Self> {
        let client = ReqwestClient::new(&config)?;
        Ok(Self::new(config, client))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Returns the server for `hostname`.
    pub fn server(&self, hostname: &str) -> ClientResult<Arc<Server>> {
        self.ctx.server(hostname)
    }

    /// Starts building the user `username@hostname`.
    pub fn user(&self, username: &str, hostname: &str) -> UserBuilder {
        UserBuilder::new(Arc::clone(&self.ctx), username, hostname)
    }

    /// Returns the user for any supported representation.
    ///
    /// A bare username is completed with `default_host`.
    pub fn user_from_anything(
        &self,
        data: impl Into<UserRef>,
        default_host: Option<&str>,
    ) -> ClientResult<Arc<User>> {
        resolve_user(&self.ctx, data.into(), default_host)
    }

    /// Fetches the entry `id` of `author`.
    pub fn entry(&self, author: impl Into<UserRef>, id: u64) -> ClientResult<Arc<Entry>> {
        let author = self.user_from_anything(author, None)?;
        Entry::fetch(&self.ctx, author, id)
    }

    /// Creates an entry authored by `author`.
    pub fn create_entry(
        &self,
        author: impl Into<UserRef>,
        initial: NewEntry,
    ) -> ClientResult<Arc<Entry>> {
        let author = self.user_from_anything(author, None)?;
        Entry::create(&self.ctx, author, initial)
    }

    /// Starts a query over every entry of `hostname`.
    pub fn query(&self, hostname: &str) -> ClientResult<EntryQuery> {
        Ok(EntryQuery::all(self.server(hostname)?))
    }

    /// Starts a query over the timeline of the user connected to
    /// `hostname`.
    pub fn timeline(&self, hostname: &str) -> ClientResult<EntryQuery> {
        EntryQuery::timeline(self.server(hostname)?)
    }

    /// Number of shared servers.
    pub fn registered_servers(&self) -> usize {
        self.ctx.servers.len()
    }

    /// Number of shared users.
    pub fn registered_users(&self) -> usize {
        self.ctx.users.len()
    }

    /// Number of shared entries.
    pub fn registered_entries(&self) -> usize {
        self.ctx.entries.len()
    }
}

impl Drop for Wididit {
    fn drop(&mut self) {
        // Connected users point back at their server; unbinding every
        // server ever connected breaks those cycles.
        let servers = self.ctx.servers.close();
        for server in &servers {
            server.clear_connected_as();
        }
        let bound = std::mem::take(&mut *self.ctx.bound.lock());
        for server in bound.iter().filter_map(Weak::upgrade) {
            server.clear_connected_as();
        }
        let users = self.ctx.users.close().len();
        let entries = self.ctx.entries.close().len();
        debug!(servers = servers.len(), users, entries, "session closed");
    }
}

impl fmt::Debug for Wididit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wididit")
            .field("config", &self.ctx.config)
            .field("servers", &self.ctx.servers)
            .field("users", &self.ctx.users)
            .field("entries", &self.ctx.entries)
            .finish_non_exhaustive()
    }
}
