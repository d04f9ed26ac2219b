//! CLI command implementations.

pub mod entry;
pub mod user;
pub mod whoami;

use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;
use wididit_core::{Entry, User, Wididit, TIME_FORMAT};

/// Result of a command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// What every command runs against.
pub struct Session<'a> {
    /// The client session.
    pub wididit: &'a Wididit,
    /// Host given on the command line.
    pub host: String,
    /// The authenticated user, when credentials were given.
    pub me: Option<Arc<User>>,
}

impl<'a> Session<'a> {
    /// Opens a session on `host`, connecting as `user` if given.
    pub fn open(
        wididit: &'a Wididit,
        host: &str,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let me = match user {
            Some(username) => {
                let mut builder = wididit.user(username, host).connect(true);
                if let Some(password) = password {
                    builder = builder.password(password);
                }
                let me = builder.build()?;
                debug!(userid = %me.userid(), "connected");
                Some(me)
            }
            None => None,
        };
        Ok(Self {
            wididit,
            host: host.to_string(),
            me,
        })
    }

    /// Returns the authenticated user or fails.
    pub fn me(&self) -> Result<&Arc<User>, Box<dyn std::error::Error>> {
        Ok(self
            .me
            .as_ref()
            .ok_or("Authentication required (--user and --password)")?)
    }
}

/// A user as printed.
#[derive(Debug, Serialize)]
pub struct UserView {
    /// `username@hostname`.
    pub userid: String,
    /// Username.
    pub username: String,
    /// Hostname.
    pub hostname: String,
    /// Biography.
    pub biography: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            userid: user.userid(),
            username: user.username().to_string(),
            hostname: user.hostname().to_string(),
            biography: user.biography(),
        }
    }
}

/// An entry as printed.
#[derive(Debug, Serialize)]
pub struct EntryView {
    /// `userid/id`.
    pub entryid: String,
    /// Author userid.
    pub author: String,
    /// Id, unique per author.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Subtitle.
    pub subtitle: String,
    /// Summary.
    pub summary: String,
    /// Content.
    pub content: String,
    /// Category.
    pub category: String,
    /// Generator.
    pub generator: String,
    /// Rights.
    pub rights: String,
    /// Source.
    pub source: String,
    /// Contributor userids.
    pub contributors: Vec<String>,
    /// Publication time.
    pub published: String,
    /// Last update time.
    pub updated: String,
}

impl From<&Entry> for EntryView {
    fn from(entry: &Entry) -> Self {
        Self {
            entryid: entry.entryid(),
            author: entry.author().userid(),
            id: entry.id(),
            title: entry.title(),
            subtitle: entry.subtitle(),
            summary: entry.summary(),
            content: entry.content(),
            category: entry.category(),
            generator: entry.generator(),
            rights: entry.rights(),
            source: entry.source(),
            contributors: entry.contributors().iter().map(|u| u.userid()).collect(),
            published: entry.published().format(TIME_FORMAT).to_string(),
            updated: entry.updated().format(TIME_FORMAT).to_string(),
        }
    }
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> CommandResult {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn write_user(out: &mut dyn Write, user: &UserView, format: &str) -> CommandResult {
    match format {
        "json" => write_json(out, user),
        _ => {
            writeln!(out, "{}", user.userid)?;
            if !user.biography.is_empty() {
                writeln!(out, "  {}", user.biography)?;
            }
            Ok(())
        }
    }
}

fn write_entry_text(out: &mut dyn Write, entry: &EntryView) -> CommandResult {
    if entry.title.is_empty() {
        writeln!(out, "{}", entry.entryid)?;
    } else {
        writeln!(out, "{}  {}", entry.entryid, entry.title)?;
    }
    writeln!(out, "  published {}, updated {}", entry.published, entry.updated)?;
    if !entry.contributors.is_empty() {
        writeln!(out, "  with {}", entry.contributors.join(", "))?;
    }
    for line in entry.content.lines() {
        writeln!(out, "  | {line}")?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Session;
    use wididit_testkit::{TestFederation, TEST_HOST, TEST_PASSWORD};

    /// Opens a CLI session on the test host, optionally connected.
    pub fn session<'a>(test: &'a TestFederation, user: Option<&str>) -> Session<'a> {
        Session::open(&test.wididit, TEST_HOST, user, Some(TEST_PASSWORD)).unwrap()
    }

    /// Runs a command into a string.
    pub fn capture<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> super::CommandResult,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }
}
