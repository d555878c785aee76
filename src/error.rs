//! Crate-level error types.
//!
//! Every failure the engine can report falls into one of four buckets:
//! connection errors, protocol errors (bad inbound frames), sends attempted
//! without an open socket, and failures at the media-upload boundary.
//! Aggregation failures are not errors here; the server reports them as an
//! ordinary `aggregation_error` event.

use crate::commands::CommandKind;
use crate::lifecycle::Phase;
use crate::protocol::EventKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A frame that could not be turned into a [`crate::protocol::ServerEvent`].
///
/// Always recoverable: the transport logs it and drops the frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not JSON, or not a `{type, ...}` envelope.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope names a type outside the inbound catalogue.
    #[error("unknown message type '{0}'")]
    UnknownType(String),

    /// The `data` field does not have the shape registered for its type.
    #[error("invalid '{kind}' payload: {source}")]
    Payload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the synchronization engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The socket could not be opened.
    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// A send was attempted with no open socket. The message was dropped.
    #[error("socket is not connected")]
    NotConnected,

    /// Writing to an open socket failed. The message was dropped.
    #[error("send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The lifecycle does not allow this command in the current phase.
    #[error("'{command}' is not available while {phase}")]
    NotPermitted { command: CommandKind, phase: Phase },

    /// A session-bound command was issued before joining a session.
    #[error("no current session")]
    NoCurrentSession,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The upload endpoint answered with a non-2xx status.
    #[error("upload to {url} failed with HTTP {status}")]
    Upload { status: u16, url: String },

    /// The upload would be rejected by the server's media allowlist.
    #[error("media type '{0}' is not accepted for upload")]
    UnsupportedMedia(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}
