//! Error types for the Wididit client.

use reqwest::StatusCode;
use thiserror::Error;
use wididit_codec::CodecError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to Wididit servers.
///
/// Every variant is surfaced to the immediate caller; nothing in this crate
/// swallows or retries them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not connect to the server.
    #[error("server {hostname} cannot be reached")]
    Unreachable {
        /// Hostname that could not be reached.
        hostname: String,
    },

    /// The remote resource does not exist.
    #[error("{object} cannot be found")]
    NotFound {
        /// Identity of the missing object (a userid, an entryid).
        object: String,
    },

    /// The server rejected the action for lack of rights.
    #[error("you are not authorized to {action}")]
    Forbidden {
        /// Description of the attempted action.
        action: String,
    },

    /// Any other non-success status.
    #[error("server replied with unexpected status {status}")]
    Server {
        /// Raw status code of the reply.
        status: StatusCode,
    },

    /// A user representation was incomplete or malformed.
    #[error("people cannot be instantiated: {reason}")]
    PeopleNotInstanciable {
        /// Why the user could not be built.
        reason: String,
    },

    /// Unrecognized representation, or a field assignment that failed
    /// local validation.
    #[error("invalid value: {message}")]
    InvalidValue {
        /// Description of the problem.
        message: String,
    },

    /// A required argument was not supplied.
    #[error("missing argument: {name}")]
    MissingArgument {
        /// Name of the argument.
        name: &'static str,
    },

    /// The transport failed for a reason other than connecting.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// A successful reply did not have the expected shape.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the mismatch.
        message: String,
    },

    /// Wire codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ClientError {
    /// Creates an unreachable error.
    pub fn unreachable(hostname: impl Into<String>) -> Self {
        Self::Unreachable {
            hostname: hostname.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(object: impl Into<String>) -> Self {
        Self::NotFound {
            object: object.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(action: impl Into<String>) -> Self {
        Self::Forbidden {
            action: action.into(),
        }
    }

    /// Creates a generic server error from a status code.
    pub fn server(status: StatusCode) -> Self {
        Self::Server { status }
    }

    /// Creates a people-not-instanciable error.
    pub fn people_not_instanciable(reason: impl Into<String>) -> Self {
        Self::PeopleNotInstanciable {
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns true for errors raised because of the server's answer (or
    /// absence of one).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ClientError::Unreachable { .. }
                | ClientError::NotFound { .. }
                | ClientError::Forbidden { .. }
                | ClientError::Server { .. }
        )
    }

    /// Returns true for errors about building a user.
    pub fn is_people_error(&self) -> bool {
        matches!(self, ClientError::PeopleNotInstanciable { .. })
    }

    /// Returns the raw status code, for errors that carry one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Server { status } => Some(*status),
            ClientError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ClientError::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ClientError::unreachable("test.wididit.net").is_server_error());
        assert!(ClientError::forbidden("edit this entry").is_server_error());
        assert!(ClientError::server(StatusCode::BAD_GATEWAY).is_server_error());
        assert!(!ClientError::invalid_value("bad").is_server_error());
        assert!(ClientError::people_not_instanciable("no host").is_people_error());
        assert!(!ClientError::not_found("x").is_people_error());
    }

    #[test]
    fn error_display() {
        let err = ClientError::forbidden("change the biography");
        assert_eq!(
            err.to_string(),
            "you are not authorized to change the biography"
        );

        let err = ClientError::unreachable("test.wididit.net");
        assert_eq!(err.to_string(), "server test.wididit.net cannot be reached");

        let err = ClientError::server(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ClientError::server(StatusCode::IM_A_TEAPOT).status(),
            Some(StatusCode::IM_A_TEAPOT)
        );
        assert_eq!(
            ClientError::not_found("a@b").status(),
            Some(StatusCode::NOT_FOUND)
        );
        assert_eq!(ClientError::transport("reset").status(), None);
    }
}
