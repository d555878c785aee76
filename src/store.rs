//! Session store: the locally mirrored copy of server-authoritative state.
//!
//! ## Merge rules
//! - `sessions_list` replaces the whole list (snapshot, never merged).
//! - `session_created` makes the session current and moves it to the head of
//!   the list, replacing any entry with the same id.
//! - `session_joined` only sets the current session id.
//! - `session_updated` replaces the matching entry in place, else no-op.
//! - `idea_submitted` and `idea_rating` merge into the *current* session,
//!   not a session named by the payload: a connection holds at most one
//!   joined session.
//! - Aggregation events toggle the busy flag and record the summary or error.
//! - `discussion_started` is sticky until [`SessionStore::leave`].
//! - Aggregation and discussion events are ignored while no session is current.
//!
//! The store is UI-agnostic: [`SessionStore::apply`] is a plain reducer, and
//! [`StoreBinding`] wires it to a [`Dispatcher`].

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::dispatcher::{handler, Dispatcher, Handler};
use crate::model::{Idea, IdeaRating, Session};
use crate::protocol::{ChatLine, EventKind, ServerEvent};

/// One line of the in-session activity feed.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Chat(ChatLine),
    IdeaSubmitted {
        idea_id: String,
        author: String,
        content: String,
    },
    Discussion(String),
    AggregationFailed(String),
    ServerError(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStore {
    sessions: Vec<Session>,
    current_session_id: Option<String>,
    is_aggregating: bool,
    aggregation_summary: Option<String>,
    aggregation_error: Option<String>,
    discussion_started: bool,
    transcript: Vec<TranscriptEntry>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    /// The current session's mirrored data, if the list holds it yet.
    pub fn current_session(&self) -> Option<&Session> {
        self.session(self.current_session_id.as_deref()?)
    }

    pub fn is_aggregating(&self) -> bool {
        self.is_aggregating
    }

    pub fn aggregation_summary(&self) -> Option<&str> {
        self.aggregation_summary.as_deref()
    }

    pub fn aggregation_error(&self) -> Option<&str> {
        self.aggregation_error.as_deref()
    }

    pub fn discussion_started(&self) -> bool {
        self.discussion_started
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Fold one inbound event into the mirror. Returns whether anything changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::SessionsList(list) => {
                self.sessions = list.clone();
                true
            }
            ServerEvent::SessionCreated(session) => {
                self.enter(&session.id);
                self.sessions.retain(|s| s.id != session.id);
                self.sessions.insert(0, session.clone());
                true
            }
            ServerEvent::SessionJoined { session_id } => {
                self.enter(session_id);
                true
            }
            ServerEvent::SessionUpdated(session) => {
                match self.sessions.iter_mut().find(|s| s.id == session.id) {
                    Some(slot) => {
                        *slot = session.clone();
                        true
                    }
                    None => {
                        debug!(session = %session.id, "update for unknown session ignored");
                        false
                    }
                }
            }
            ServerEvent::SessionMessage(line) => {
                self.transcript.push(TranscriptEntry::Chat(line.clone()));
                true
            }
            ServerEvent::IdeaSubmitted(idea) => self.add_idea(idea),
            ServerEvent::IdeaRated { idea_id, rating } => self.add_rating(idea_id, rating),
            ServerEvent::AggregationStarted
            | ServerEvent::AggregationResult(_)
            | ServerEvent::AggregationError(_)
            | ServerEvent::DiscussionStarted(_)
                if self.current_session_id.is_none() =>
            {
                debug!(event = %event.kind(), "session event with no current session ignored");
                false
            }
            ServerEvent::AggregationStarted => {
                self.is_aggregating = true;
                self.aggregation_error = None;
                true
            }
            ServerEvent::AggregationResult(summary) => {
                self.is_aggregating = false;
                self.aggregation_summary = Some(summary.clone());
                self.aggregation_error = None;
                true
            }
            ServerEvent::AggregationError(message) => {
                self.is_aggregating = false;
                self.aggregation_error = Some(message.clone());
                self.transcript
                    .push(TranscriptEntry::AggregationFailed(message.clone()));
                true
            }
            ServerEvent::DiscussionStarted(notice) => {
                self.discussion_started = true;
                self.transcript
                    .push(TranscriptEntry::Discussion(notice.clone()));
                true
            }
            ServerEvent::ServerError(message) => {
                self.transcript
                    .push(TranscriptEntry::ServerError(message.clone()));
                true
            }
        }
    }

    /// Drop the current session and every piece of per-session state.
    /// The session list itself is kept.
    pub fn leave(&mut self) {
        self.current_session_id = None;
        self.reset_session_state();
    }

    fn enter(&mut self, session_id: &str) {
        if self.current_session_id.as_deref() != Some(session_id) {
            self.reset_session_state();
            self.current_session_id = Some(session_id.to_string());
        }
    }

    fn reset_session_state(&mut self) {
        self.is_aggregating = false;
        self.aggregation_summary = None;
        self.aggregation_error = None;
        self.discussion_started = false;
        self.transcript.clear();
    }

    fn current_session_mut(&mut self) -> Option<&mut Session> {
        let id = self.current_session_id.as_deref()?;
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    fn add_idea(&mut self, idea: &Idea) -> bool {
        let Some(session) = self.current_session_mut() else {
            debug!(idea = %idea.id, "idea outside a mirrored current session ignored");
            return false;
        };
        // Idea ids are unique per session; a repeat replaces the old copy.
        match session.idea_mut(&idea.id) {
            Some(existing) => *existing = idea.clone(),
            None => session.ideas.push(idea.clone()),
        }
        self.transcript.push(TranscriptEntry::IdeaSubmitted {
            idea_id: idea.id.clone(),
            author: idea.submitted_by.username.clone(),
            content: idea.content.clone(),
        });
        true
    }

    fn add_rating(&mut self, idea_id: &str, rating: &IdeaRating) -> bool {
        let Some(idea) = self
            .current_session_mut()
            .and_then(|s| s.idea_mut(idea_id))
        else {
            debug!(idea = %idea_id, "rating for unknown idea ignored");
            return false;
        };
        idea.ratings.push(rating.clone());
        true
    }
}

/// A store subscribed to every inbound event kind on a dispatcher.
pub struct StoreBinding {
    handler: Handler,
}

impl StoreBinding {
    pub fn attach(store: &Rc<RefCell<SessionStore>>, dispatcher: &Dispatcher) -> Self {
        let h = {
            let store = Rc::clone(store);
            handler(move |event| {
                store.borrow_mut().apply(event);
            })
        };
        for kind in EventKind::ALL {
            dispatcher.subscribe(kind, &h);
        }
        Self { handler: h }
    }

    pub fn detach(&self, dispatcher: &Dispatcher) {
        for kind in EventKind::ALL {
            dispatcher.unsubscribe(kind, &self.handler);
        }
    }
}
