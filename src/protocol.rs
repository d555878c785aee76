//! Wire protocol: the `{type, sessionId?, userId?, username?, data?}` envelope
//! and the closed set of inbound events decoded from it.
//!
//! ## Inbound catalogue
//! | type | `data` |
//! |---|---|
//! | `sessions_list` | `[Session]` (full snapshot, `null` = empty) |
//! | `session_created` | `Session` |
//! | `session_joined` | object with `id` |
//! | `session_updated` | `Session` |
//! | `session_message` | chat text |
//! | `idea_submitted` | `Idea` |
//! | `idea_rating` | `{ideaId, rating}` |
//! | `aggregation_started` | ignored |
//! | `aggregation_result` | summary text |
//! | `aggregation_error` | error text |
//! | `discussion_started` | notice text |
//! | `error` | error text |
//!
//! Decoding happens once, at the transport boundary. A frame that fails here
//! never reaches the dispatcher.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::model::{Idea, IdeaRating, Session};

/// The uniform message unit exchanged in both directions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn user(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inbound message types, used as dispatcher keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionsList,
    SessionCreated,
    SessionJoined,
    SessionUpdated,
    SessionMessage,
    IdeaSubmitted,
    IdeaRating,
    AggregationStarted,
    AggregationResult,
    AggregationError,
    DiscussionStarted,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::SessionsList,
        EventKind::SessionCreated,
        EventKind::SessionJoined,
        EventKind::SessionUpdated,
        EventKind::SessionMessage,
        EventKind::IdeaSubmitted,
        EventKind::IdeaRating,
        EventKind::AggregationStarted,
        EventKind::AggregationResult,
        EventKind::AggregationError,
        EventKind::DiscussionStarted,
        EventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionsList => "sessions_list",
            EventKind::SessionCreated => "session_created",
            EventKind::SessionJoined => "session_joined",
            EventKind::SessionUpdated => "session_updated",
            EventKind::SessionMessage => "session_message",
            EventKind::IdeaSubmitted => "idea_submitted",
            EventKind::IdeaRating => "idea_rating",
            EventKind::AggregationStarted => "aggregation_started",
            EventKind::AggregationResult => "aggregation_result",
            EventKind::AggregationError => "aggregation_error",
            EventKind::DiscussionStarted => "discussion_started",
            EventKind::Error => "error",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chat line relayed by the server, with the sender metadata the
/// envelope carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub text: String,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SessionsList(Vec<Session>),
    SessionCreated(Session),
    SessionJoined { session_id: String },
    SessionUpdated(Session),
    SessionMessage(ChatLine),
    IdeaSubmitted(Idea),
    IdeaRated { idea_id: String, rating: IdeaRating },
    AggregationStarted,
    AggregationResult(String),
    AggregationError(String),
    DiscussionStarted(String),
    ServerError(String),
}

#[derive(Deserialize)]
struct SessionRef {
    id: String,
}

#[derive(Deserialize)]
struct RatingPayload {
    #[serde(rename = "ideaId")]
    idea_id: String,
    rating: IdeaRating,
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::SessionsList(_) => EventKind::SessionsList,
            ServerEvent::SessionCreated(_) => EventKind::SessionCreated,
            ServerEvent::SessionJoined { .. } => EventKind::SessionJoined,
            ServerEvent::SessionUpdated(_) => EventKind::SessionUpdated,
            ServerEvent::SessionMessage(_) => EventKind::SessionMessage,
            ServerEvent::IdeaSubmitted(_) => EventKind::IdeaSubmitted,
            ServerEvent::IdeaRated { .. } => EventKind::IdeaRating,
            ServerEvent::AggregationStarted => EventKind::AggregationStarted,
            ServerEvent::AggregationResult(_) => EventKind::AggregationResult,
            ServerEvent::AggregationError(_) => EventKind::AggregationError,
            ServerEvent::DiscussionStarted(_) => EventKind::DiscussionStarted,
            ServerEvent::ServerError(_) => EventKind::Error,
        }
    }

    /// Validate an envelope's payload against the shape registered for its type.
    pub fn from_envelope(env: Envelope) -> Result<Self, ProtocolError> {
        let kind = EventKind::from_type_name(&env.kind)
            .ok_or_else(|| ProtocolError::UnknownType(env.kind.clone()))?;

        let event = match kind {
            EventKind::SessionsList => {
                let list: Option<Vec<Session>> = payload(kind, env.data)?;
                ServerEvent::SessionsList(list.unwrap_or_default())
            }
            EventKind::SessionCreated => ServerEvent::SessionCreated(payload(kind, env.data)?),
            EventKind::SessionJoined => {
                // Older servers only set the envelope's sessionId.
                let session_id = match (env.data, env.session_id) {
                    (Some(data), _) => payload::<SessionRef>(kind, Some(data))?.id,
                    (None, Some(id)) => id,
                    (None, None) => {
                        return Err(ProtocolError::Payload {
                            kind,
                            source: serde::de::Error::missing_field("id"),
                        })
                    }
                };
                ServerEvent::SessionJoined { session_id }
            }
            EventKind::SessionUpdated => ServerEvent::SessionUpdated(payload(kind, env.data)?),
            EventKind::SessionMessage => ServerEvent::SessionMessage(ChatLine {
                session_id: env.session_id,
                user_id: env.user_id,
                username: env.username,
                text: text_of(env.data),
            }),
            EventKind::IdeaSubmitted => ServerEvent::IdeaSubmitted(payload(kind, env.data)?),
            EventKind::IdeaRating => {
                let RatingPayload { idea_id, mut rating } = payload(kind, env.data)?;
                if rating.user_id.is_empty() {
                    rating.user_id = env.user_id.unwrap_or_default();
                }
                ServerEvent::IdeaRated { idea_id, rating }
            }
            EventKind::AggregationStarted => ServerEvent::AggregationStarted,
            EventKind::AggregationResult => ServerEvent::AggregationResult(text_of(env.data)),
            EventKind::AggregationError => ServerEvent::AggregationError(text_of(env.data)),
            EventKind::DiscussionStarted => ServerEvent::DiscussionStarted(text_of(env.data)),
            EventKind::Error => ServerEvent::ServerError(text_of(env.data)),
        };
        Ok(event)
    }
}

/// Parse one text frame into an event.
pub fn decode_frame(text: &str) -> Result<ServerEvent, ProtocolError> {
    let env: Envelope = serde_json::from_str(text)?;
    ServerEvent::from_envelope(env)
}

fn payload<T: DeserializeOwned>(kind: EventKind, data: Option<Value>) -> Result<T, ProtocolError> {
    serde_json::from_value(data.unwrap_or(Value::Null))
        .map_err(|source| ProtocolError::Payload { kind, source })
}

/// Text payloads are usually JSON strings; anything else is kept as its JSON text.
fn text_of(data: Option<Value>) -> String {
    match data {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}
