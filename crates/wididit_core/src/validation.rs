//! Local validation of identities and field values.
//!
//! Checks here run before any request is built, so a doomed operation never
//! costs a round-trip.

use crate::error::{ClientError, ClientResult};
use regex::Regex;
use std::sync::OnceLock;

/// Longest hostname accepted.
pub const MAX_HOSTNAME_LENGTH: usize = 1023;
/// Shortest username accepted.
pub const MIN_USERNAME_LENGTH: usize = 3;
/// Longest username accepted.
pub const MAX_USERNAME_LENGTH: usize = 255;
/// Longest category tag accepted.
pub const MAX_TAG_LENGTH: usize = 255;
/// Longest generator tag accepted.
pub const MAX_GENERATOR_LENGTH: usize = 1024;
/// Longest entry title accepted.
pub const MAX_TITLE_LENGTH: usize = 4096;
/// Longest entry subtitle accepted.
pub const MAX_SUBTITLE_LENGTH: usize = 4096;

/// Date-time pattern of `published` and `updated` on the wire.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| {
        Regex::new(&format!(
            "^[a-z0-9_-]{{{MIN_USERNAME_LENGTH},{MAX_USERNAME_LENGTH}}}$"
        ))
        .expect("username pattern is a valid regex")
    })
}

/// Checks whether `username` is acceptable to Wididit servers.
pub fn is_valid_username(username: &str) -> bool {
    username_regex().is_match(username)
}

/// Fails with `PeopleNotInstanciable` for a malformed username.
pub fn validate_username(username: &str) -> ClientResult<()> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(ClientError::people_not_instanciable(format!(
            "invalid username {username:?}"
        )))
    }
}

/// Fails with `PeopleNotInstanciable` when `username` cannot be part of a
/// userid at all.
///
/// This is the only check applied to names a server reports; servers may
/// host accounts that predate or ignore the registration pattern.
pub fn validate_known_username(username: &str) -> ClientResult<()> {
    if username.is_empty()
        || username.contains(['@', '/'])
        || username.contains(char::is_whitespace)
    {
        Err(ClientError::people_not_instanciable(format!(
            "invalid username {username:?}"
        )))
    } else {
        Ok(())
    }
}

/// Fails with `InvalidValue` for an empty, oversized or malformed hostname.
pub fn validate_hostname(hostname: &str) -> ClientResult<()> {
    if hostname.is_empty() {
        return Err(ClientError::invalid_value("empty hostname"));
    }
    if hostname.len() > MAX_HOSTNAME_LENGTH {
        return Err(ClientError::invalid_value(format!(
            "hostname longer than {MAX_HOSTNAME_LENGTH} bytes"
        )));
    }
    if hostname.contains(['@', '/', ' ', '?', '#']) {
        return Err(ClientError::invalid_value(format!(
            "invalid hostname {hostname:?}"
        )));
    }
    Ok(())
}

/// Splits a usermask into `(username, hostname)`.
///
/// A usermask is either `username@hostname` or a bare `username`, in which
/// case `default_host` supplies the hostname.
pub fn usermask_to_tuple(
    usermask: &str,
    default_host: Option<&str>,
) -> ClientResult<(String, String)> {
    match usermask.split_once('@') {
        Some((username, hostname)) => {
            if username.is_empty() || hostname.is_empty() || hostname.contains('@') {
                return Err(ClientError::people_not_instanciable(format!(
                    "malformed userid {usermask:?}"
                )));
            }
            Ok((username.to_string(), hostname.to_string()))
        }
        None => match default_host {
            Some(hostname) if !usermask.is_empty() => {
                Ok((usermask.to_string(), hostname.to_string()))
            }
            _ => Err(ClientError::people_not_instanciable(format!(
                "{usermask:?} has no host part and no default host was given"
            ))),
        },
    }
}

/// Fails with `InvalidValue` when `value` exceeds `max` characters.
pub(crate) fn check_length(field: &str, value: &str, max: usize) -> ClientResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(ClientError::invalid_value(format!(
            "{field} is {len} characters long, at most {max} allowed"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn usernames() {
        assert!(is_valid_username("tester"));
        assert!(is_valid_username("a_b-9"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("Tester"));
        assert!(!is_valid_username("tester@host"));
        assert!(!is_valid_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)));
        assert!(validate_username("no spaces").unwrap_err().is_people_error());
    }

    #[test]
    fn known_usernames() {
        assert!(validate_known_username("Tester").is_ok());
        assert!(validate_known_username("Al").is_ok());
        assert!(validate_known_username("").is_err());
        assert!(validate_known_username("a@b").is_err());
        assert!(validate_known_username("a/b").is_err());
        assert!(validate_known_username("no way").unwrap_err().is_people_error());
    }

    #[test]
    fn hostnames() {
        assert!(validate_hostname("test.wididit.net").is_ok());
        assert!(validate_hostname("dev.progval.42").is_ok());
        assert!(validate_hostname("localhost:8080").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("a@b").is_err());
        assert!(validate_hostname(&"h".repeat(MAX_HOSTNAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn usermask_with_host() {
        let (user, host) = usermask_to_tuple("tester@dev.progval.42", None).unwrap();
        assert_eq!(user, "tester");
        assert_eq!(host, "dev.progval.42");
    }

    #[test]
    fn usermask_with_default_host() {
        let (user, host) = usermask_to_tuple("tester", Some("test.wididit.net")).unwrap();
        assert_eq!((user.as_str(), host.as_str()), ("tester", "test.wididit.net"));

        // An explicit host wins over the default
        let (_, host) = usermask_to_tuple("tester@a.b", Some("c.d")).unwrap();
        assert_eq!(host, "a.b");
    }

    #[test]
    fn usermask_without_host() {
        let err = usermask_to_tuple("tester", None).unwrap_err();
        assert!(matches!(err, ClientError::PeopleNotInstanciable { .. }));
        assert!(usermask_to_tuple("tester@", None).is_err());
        assert!(usermask_to_tuple("@host", None).is_err());
        assert!(usermask_to_tuple("a@b@c", None).is_err());
    }

    #[test]
    fn length_limits() {
        assert!(check_length("title", &"x".repeat(MAX_TITLE_LENGTH), MAX_TITLE_LENGTH).is_ok());
        let err = check_length("title", &"x".repeat(MAX_TITLE_LENGTH + 1), MAX_TITLE_LENGTH)
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidValue { .. }));
    }

    proptest! {
        #[test]
        fn userid_splits_back(user in "[a-z0-9_-]{3,20}", host in "[a-z0-9]{1,10}(\\.[a-z0-9]{1,10}){0,3}") {
            let userid = format!("{user}@{host}");
            let (u, h) = usermask_to_tuple(&userid, None).unwrap();
            prop_assert_eq!(u, user);
            prop_assert_eq!(h, host);
        }
    }
}
