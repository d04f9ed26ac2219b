//! Whoami command implementation.

use super::{write_json, CommandResult, Session};
use serde_json::json;
use std::io::Write;

/// Runs the whoami command.
pub fn run(session: &Session<'_>, format: &str, out: &mut dyn Write) -> CommandResult {
    let server = session.wididit.server(&session.host)?;
    let userid = server.whoami()?;

    match format {
        "json" => write_json(out, &json!({ "userid": userid })),
        _ => {
            match userid {
                Some(userid) => writeln!(out, "{userid}")?,
                None => writeln!(out, "Not authenticated on {}", session.host)?,
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{capture, session};
    use wididit_testkit::TestFederation;

    #[test]
    fn test_whoami() {
        let test = TestFederation::new();
        let connected = session(&test, Some("tester"));
        let text = capture(|out| run(&connected, "text", out));
        assert_eq!(text, "tester@test.wididit.net\n");
    }

    #[test]
    fn test_whoami_anonymous_json() {
        let test = TestFederation::new();
        let anonymous = session(&test, None);
        let text = capture(|out| run(&anonymous, "json", out));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["userid"].is_null());
    }
}
