//! Outbound command encoding.
//!
//! One pure function per user intent, each returning exactly one [`Envelope`].
//! Nothing here validates or transmits; gating lives in
//! [`crate::lifecycle`] and transmission in [`crate::transport`].

use serde_json::json;

use crate::model::RatingScores;
use crate::protocol::Envelope;

/// Outbound message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    ListSessions,
    CreateSession,
    JoinSession,
    LeaveSession,
    SessionMessage,
    IdeaSubmission,
    IdeaRating,
    AggregateIdeas,
    StartDiscussion,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::ListSessions => "list_sessions",
            CommandKind::CreateSession => "create_session",
            CommandKind::JoinSession => "join_session",
            CommandKind::LeaveSession => "leave_session",
            CommandKind::SessionMessage => "session_message",
            CommandKind::IdeaSubmission => "idea_submission",
            CommandKind::IdeaRating => "idea_rating",
            CommandKind::AggregateIdeas => "aggregate_ideas",
            CommandKind::StartDiscussion => "start_discussion",
        }
    }

    /// Commands addressed to the current session.
    pub fn is_session_bound(&self) -> bool {
        matches!(
            self,
            CommandKind::SessionMessage
                | CommandKind::IdeaSubmission
                | CommandKind::IdeaRating
                | CommandKind::AggregateIdeas
                | CommandKind::StartDiscussion
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user intent before it is bound to a username and session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListSessions,
    CreateSession {
        name: String,
        guiding_questions: Vec<String>,
    },
    JoinSession {
        session_id: String,
    },
    LeaveSession,
    Chat {
        text: String,
    },
    SubmitIdea {
        content: String,
        media_type: String,
        media_url: Option<String>,
    },
    RateIdea {
        idea_id: String,
        scores: RatingScores,
    },
    AggregateIdeas,
    StartDiscussion,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ListSessions => CommandKind::ListSessions,
            Command::CreateSession { .. } => CommandKind::CreateSession,
            Command::JoinSession { .. } => CommandKind::JoinSession,
            Command::LeaveSession => CommandKind::LeaveSession,
            Command::Chat { .. } => CommandKind::SessionMessage,
            Command::SubmitIdea { .. } => CommandKind::IdeaSubmission,
            Command::RateIdea { .. } => CommandKind::IdeaRating,
            Command::AggregateIdeas => CommandKind::AggregateIdeas,
            Command::StartDiscussion => CommandKind::StartDiscussion,
        }
    }

    /// A plain text idea.
    pub fn text_idea(content: impl Into<String>) -> Self {
        Command::SubmitIdea {
            content: content.into(),
            media_type: "text".to_string(),
            media_url: None,
        }
    }

    /// Bind the intent to a sender and (for session-bound kinds) a session.
    ///
    /// `session_id` is ignored by kinds that are not session-bound.
    pub fn encode(&self, username: &str, session_id: &str) -> Envelope {
        match self {
            Command::ListSessions => list_sessions(),
            Command::CreateSession {
                name,
                guiding_questions,
            } => create_session(username, name, guiding_questions),
            Command::JoinSession { session_id } => join_session(session_id, username),
            Command::LeaveSession => leave_session(),
            Command::Chat { text } => session_message(session_id, text),
            Command::SubmitIdea {
                content,
                media_type,
                media_url,
            } => submit_idea(session_id, username, content, media_type, media_url.as_deref()),
            Command::RateIdea { idea_id, scores } => rate_idea(session_id, idea_id, scores),
            Command::AggregateIdeas => aggregate_ideas(session_id),
            Command::StartDiscussion => start_discussion(session_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

pub fn list_sessions() -> Envelope {
    Envelope::new(CommandKind::ListSessions.as_str())
}

pub fn create_session(username: &str, name: &str, guiding_questions: &[String]) -> Envelope {
    Envelope::new(CommandKind::CreateSession.as_str())
        .user(username)
        .data(json!({
            "name": name,
            "guidingQuestions": guiding_questions,
        }))
}

pub fn join_session(session_id: &str, username: &str) -> Envelope {
    Envelope::new(CommandKind::JoinSession.as_str())
        .session(session_id)
        .user(username)
}

pub fn leave_session() -> Envelope {
    Envelope::new(CommandKind::LeaveSession.as_str())
}

pub fn session_message(session_id: &str, text: &str) -> Envelope {
    Envelope::new(CommandKind::SessionMessage.as_str())
        .session(session_id)
        .data(json!(text))
}

/// `media_url` is omitted from the payload when `None`.
pub fn submit_idea(
    session_id: &str,
    username: &str,
    content: &str,
    media_type: &str,
    media_url: Option<&str>,
) -> Envelope {
    let mut data = json!({
        "content": content,
        "mediaType": media_type,
    });
    if let Some(url) = media_url {
        data["mediaURL"] = json!(url);
    }
    Envelope::new(CommandKind::IdeaSubmission.as_str())
        .session(session_id)
        .user(username)
        .data(data)
}

pub fn rate_idea(session_id: &str, idea_id: &str, scores: &RatingScores) -> Envelope {
    Envelope::new(CommandKind::IdeaRating.as_str())
        .session(session_id)
        .data(json!({
            "ideaId": idea_id,
            "rating": scores,
        }))
}

pub fn aggregate_ideas(session_id: &str) -> Envelope {
    Envelope::new(CommandKind::AggregateIdeas.as_str()).session(session_id)
}

pub fn start_discussion(session_id: &str) -> Envelope {
    Envelope::new(CommandKind::StartDiscussion.as_str()).session(session_id)
}
