//! [`Error`][std::error::Error] implementations used across the crate

use core::str::Utf8Error;

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result alias defaulting to the crate [`enum@Error`]
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong fetching or synchronising a resource
#[derive(Debug, Error)]
pub enum Error {
    /// The server broke the stream protocol, e.g. `notModified` with nothing to fall back to
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// A prior value was supplied that never had a revision tag attached by this client
    #[error("prior value has no revision tag")]
    MissingRevisionTag,
    /// The request could not be sent or the connection failed
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server answered with a non-success status
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// A payload was not the JSON we expected, carries the path to the offending field
    #[error("decoding payload: {0}")]
    Decode(#[from] serde_path_to_error::Error<serde_json::Error>),
    /// A request body could not be serialised
    #[error("encoding request body: {0}")]
    Encode(#[source] serde_json::Error),
    /// The stream had invalid utf8
    #[error(transparent)]
    Utf8(#[from] Utf8Error),
    /// `find` matched nothing
    #[error("{0}: not found")]
    NotFound(String),
    /// `find` matched more than one resource
    #[error("{0}: multiple found")]
    MultipleFound(String),
}

impl Error {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    /// `true` for [`Error::ProtocolViolation`]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }

    /// The HTTP status if this is a [`Error::Remote`]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Remote(remote) => Some(remote.status),
            _ => None,
        }
    }
}

/// Opaque failure from a [`Transport`][crate::transport::Transport] implementation
#[derive(Debug, Error)]
#[error(transparent)]
pub struct TransportError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl TransportError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(err.into())
    }

    /// Borrow the underlying error
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

/// Non-success response from the server, decoded from a `{"messages": [...]}` body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {}", first_message(.messages))]
pub struct RemoteError {
    pub status: StatusCode,
    pub messages: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    messages: Vec<String>,
}

impl RemoteError {
    /// Decode an error body. Bodies that aren't the JSON error shape become a single message holding the raw text.
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let messages = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(ErrorBody { messages }) => messages,
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_owned();
                if text.is_empty() { Vec::new() } else { vec![text] }
            }
        };
        Self { status, messages }
    }
}

fn first_message(messages: &[String]) -> &str {
    messages.first().map(String::as_str).unwrap_or("error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_json_body() {
        let err = RemoteError::from_body(
            StatusCode::PRECONDITION_FAILED,
            br#"{"messages":["etag mismatch","try again"]}"#,
        );
        assert_eq!(err.status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(err.messages, vec!["etag mismatch", "try again"]);
        assert_eq!(err.to_string(), "412 Precondition Failed: etag mismatch");
    }

    #[test]
    fn remote_error_plain_body() {
        let err = RemoteError::from_body(StatusCode::BAD_GATEWAY, b"upstream down\n");
        assert_eq!(err.messages, vec!["upstream down"]);

        let err = RemoteError::from_body(StatusCode::BAD_GATEWAY, b"");
        assert!(err.messages.is_empty());
        assert_eq!(err.to_string(), "502 Bad Gateway: error");
    }

    #[test]
    fn status_only_for_remote() {
        let err = Error::from(RemoteError::from_body(StatusCode::NOT_FOUND, b""));
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(Error::MissingRevisionTag.status(), None);
        assert!(Error::protocol("bogus").is_protocol_violation());
    }

    #[test]
    fn transport_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let err = TransportError::new(io);
        assert_eq!(err.to_string(), "connection reset");
        assert!(err.inner().is::<std::io::Error>());

        let err = Error::from(TransportError::new("refused"));
        assert!(err.to_string().ends_with("refused"));
    }
}
