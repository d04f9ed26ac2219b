//! Entry command implementations.

use super::{write_entry_text, write_json, CommandResult, EntryView, Session};
use std::io::Write;
use std::sync::Arc;
use wididit_core::{Entry, NewEntry};

/// Filters of the list command.
#[derive(Debug, Default)]
pub struct ListOptions {
    /// Authors to keep; empty keeps everyone.
    pub authors: Vec<String>,
    /// Texts every entry must contain.
    pub contents: Vec<String>,
    /// Read the timeline instead of every entry.
    pub timeline: bool,
    /// Include entries written by their authors.
    pub native: bool,
    /// Include entries shared by other users.
    pub shared: bool,
}

/// Shows one entry.
pub fn show(
    session: &Session<'_>,
    userid: &str,
    id: u64,
    format: &str,
    out: &mut dyn Write,
) -> CommandResult {
    let author = session
        .wididit
        .user_from_anything(userid, Some(&session.host))?;
    let entry = session.wididit.entry(author, id)?;
    write_entries(out, &[entry], format)
}

/// Publishes an entry as the authenticated user.
pub fn post(
    session: &Session<'_>,
    title: &str,
    content: &str,
    format: &str,
    out: &mut dyn Write,
) -> CommandResult {
    let me = session.me()?;
    let entry = session
        .wididit
        .create_entry(me, NewEntry::new().title(title).content(content))?;
    write_entries(out, &[entry], format)
}

/// Lists entries of the session's host.
pub fn list(
    session: &Session<'_>,
    options: &ListOptions,
    format: &str,
    out: &mut dyn Write,
) -> CommandResult {
    let mut query = if options.timeline {
        session.wididit.timeline(&session.host)?
    } else {
        session.wididit.query(&session.host)?
    };
    for author in &options.authors {
        let author = session
            .wididit
            .user_from_anything(author.as_str(), Some(&session.host))?;
        query = query.filter_author(author);
    }
    for content in &options.contents {
        query = query.filter_content(content.as_str());
    }
    let entries = query
        .allow_native(options.native)
        .allow_shared(options.shared)
        .fetch()?;
    write_entries(out, &entries, format)
}

fn write_entries(out: &mut dyn Write, entries: &[Arc<Entry>], format: &str) -> CommandResult {
    let views: Vec<EntryView> = entries.iter().map(|e| EntryView::from(e.as_ref())).collect();
    match format {
        "json" => write_json(out, &views),
        _ => {
            for (i, view) in views.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                write_entry_text(out, view)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{capture, session};
    use serde_json::Value;
    use wididit_testkit::{scenarios, TestFederation};

    fn all() -> ListOptions {
        ListOptions {
            native: true,
            ..ListOptions::default()
        }
    }

    #[test]
    fn test_show() {
        let test = scenarios::populated_federation(1);
        let anonymous = session(&test, None);
        let text = capture(|out| show(&anonymous, "bob", 1, "text", out));
        assert_eq!(
            text,
            "bob@test.wididit.net/1  entry 1\n  published 2012-01-01 00:00:03, updated 2012-01-01 00:00:03\n  | bob entry 1\n"
        );
    }

    #[test]
    fn test_post() {
        let test = TestFederation::new();
        let connected = session(&test, Some("tester"));
        let text = capture(|out| post(&connected, "Hi", "hello world", "json", out));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["entryid"], "tester@test.wididit.net/1");
        assert_eq!(value[0]["content"], "hello world");
        assert_eq!(test.federation.entry_count(), 1);
    }

    #[test]
    fn test_post_requires_user() {
        let test = TestFederation::new();
        let anonymous = session(&test, None);
        let mut out = Vec::new();
        assert!(post(&anonymous, "", "x", "text", &mut out).is_err());
        assert_eq!(test.federation.entry_count(), 0);
    }

    #[test]
    fn test_list_with_filters() {
        let test = scenarios::populated_federation(2);
        let anonymous = session(&test, None);
        let options = ListOptions {
            authors: vec!["alice".to_string()],
            contents: vec!["entry 2".to_string()],
            ..all()
        };
        let text = capture(|out| list(&anonymous, &options, "json", out));
        let value: Value = serde_json::from_str(&text).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["entryid"], "alice@test.wididit.net/2");
    }

    #[test]
    fn test_list_timeline() {
        let test = scenarios::social_federation(1);
        let connected = session(&test, Some("tester"));
        let options = ListOptions {
            timeline: true,
            ..all()
        };
        let text = capture(|out| list(&connected, &options, "json", out));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
