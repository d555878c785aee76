//! Connection and session lifecycle.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Lobby
//! Lobby ──session_created / session_joined──▶ InSession
//! InSession ──aggregation_started──▶ Aggregating ──result / error──▶ InSession
//! InSession | Aggregating ──discussion_started──▶ DiscussionActive
//! InSession | Aggregating | DiscussionActive ──leave──▶ Lobby
//! any ──socket closed──▶ Disconnected
//! ```
//!
//! `DiscussionActive` is terminal for a session: only leaving (or losing the
//! connection) exits it. A repeated `session_created` / `session_joined` for
//! the session already joined keeps the current phase; a different id starts
//! over in `InSession`.

use crate::commands::CommandKind;
use crate::protocol::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Disconnected,
    Connecting,
    Lobby,
    InSession,
    Aggregating,
    DiscussionActive,
}

impl Phase {
    pub fn is_connected(&self) -> bool {
        !matches!(self, Phase::Disconnected | Phase::Connecting)
    }

    pub fn in_session(&self) -> bool {
        matches!(
            self,
            Phase::InSession | Phase::Aggregating | Phase::DiscussionActive
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Disconnected => "disconnected",
            Phase::Connecting => "connecting",
            Phase::Lobby => "in the lobby",
            Phase::InSession => "in a session",
            Phase::Aggregating => "aggregating",
            Phase::DiscussionActive => "in discussion",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifecycle {
    phase: Phase,
    session_id: Option<String>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Id of the session the phase refers to, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn connecting(&mut self) {
        self.phase = Phase::Connecting;
        self.session_id = None;
    }

    pub fn connected(&mut self) {
        self.phase = Phase::Lobby;
        self.session_id = None;
    }

    pub fn disconnected(&mut self) {
        self.phase = Phase::Disconnected;
        self.session_id = None;
    }

    /// Forced by a local `leave_session`; no server confirmation exists.
    pub fn left(&mut self) {
        if self.phase.in_session() {
            self.phase = Phase::Lobby;
        }
        self.session_id = None;
    }

    /// Advance on an inbound event. Returns the new phase.
    pub fn on_event(&mut self, event: &ServerEvent) -> Phase {
        use Phase::*;
        let entered = match event {
            ServerEvent::SessionCreated(session) => Some(session.id.as_str()),
            ServerEvent::SessionJoined { session_id } => Some(session_id.as_str()),
            _ => None,
        };
        if let Some(id) = entered.filter(|_| self.phase.is_connected()) {
            if self.phase == Lobby || self.session_id.as_deref() != Some(id) {
                self.phase = InSession;
                self.session_id = Some(id.to_string());
            }
            return self.phase;
        }

        self.phase = match (self.phase, event) {
            (Disconnected | Connecting, _) => self.phase,
            (InSession, ServerEvent::AggregationStarted) => Aggregating,
            (
                Aggregating,
                ServerEvent::AggregationResult(_) | ServerEvent::AggregationError(_),
            ) => InSession,
            (InSession | Aggregating, ServerEvent::DiscussionStarted(_)) => DiscussionActive,
            (phase, _) => phase,
        };
        self.phase
    }

    /// Whether `command` is meaningful in the current phase.
    pub fn permits(&self, command: CommandKind) -> bool {
        use CommandKind::*;
        match self.phase {
            Phase::Disconnected | Phase::Connecting => false,
            Phase::Lobby => matches!(command, ListSessions | CreateSession | JoinSession),
            Phase::InSession => !matches!(command, CreateSession | JoinSession),
            Phase::Aggregating => !matches!(command, CreateSession | JoinSession | AggregateIdeas),
            Phase::DiscussionActive => {
                !matches!(command, CreateSession | JoinSession | StartDiscussion)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_session() -> Lifecycle {
        let mut lc = Lifecycle::new();
        lc.connecting();
        lc.connected();
        lc.on_event(&ServerEvent::SessionJoined { session_id: "s1".into() });
        lc
    }

    #[test]
    fn test_starts_disconnected_and_permits_nothing() {
        let lc = Lifecycle::new();
        assert_eq!(lc.phase(), Phase::Disconnected);
        assert!(!lc.permits(CommandKind::ListSessions));
    }

    #[test]
    fn test_events_ignored_while_not_connected() {
        let mut lc = Lifecycle::new();
        lc.connecting();
        assert_eq!(
            lc.on_event(&ServerEvent::SessionJoined { session_id: "s".into() }),
            Phase::Connecting
        );
    }

    #[test]
    fn test_lobby_permits_only_lobby_commands() {
        let mut lc = Lifecycle::new();
        lc.connected();
        assert!(lc.permits(CommandKind::CreateSession));
        assert!(lc.permits(CommandKind::JoinSession));
        assert!(!lc.permits(CommandKind::IdeaSubmission));
        assert!(!lc.permits(CommandKind::LeaveSession));
    }

    #[test]
    fn test_aggregation_overlay() {
        let mut lc = in_session();
        assert_eq!(lc.on_event(&ServerEvent::AggregationStarted), Phase::Aggregating);
        assert!(!lc.permits(CommandKind::AggregateIdeas));
        assert!(lc.permits(CommandKind::SessionMessage));
        assert_eq!(
            lc.on_event(&ServerEvent::AggregationResult("s".into())),
            Phase::InSession
        );
        lc.on_event(&ServerEvent::AggregationStarted);
        assert_eq!(
            lc.on_event(&ServerEvent::AggregationError("e".into())),
            Phase::InSession
        );
    }

    #[test]
    fn test_discussion_is_terminal_until_leave() {
        let mut lc = in_session();
        lc.on_event(&ServerEvent::DiscussionStarted("go".into()));
        assert_eq!(lc.phase(), Phase::DiscussionActive);
        lc.on_event(&ServerEvent::AggregationStarted);
        lc.on_event(&ServerEvent::AggregationResult("x".into()));
        assert_eq!(lc.phase(), Phase::DiscussionActive);
        assert!(!lc.permits(CommandKind::StartDiscussion));
        lc.left();
        assert_eq!(lc.phase(), Phase::Lobby);
    }

    #[test]
    fn test_rejoining_same_session_keeps_phase() {
        let mut lc = in_session();
        lc.on_event(&ServerEvent::DiscussionStarted("go".into()));
        assert_eq!(
            lc.on_event(&ServerEvent::SessionJoined { session_id: "s1".into() }),
            Phase::DiscussionActive
        );
        assert!(!lc.permits(CommandKind::StartDiscussion));

        let mut lc = in_session();
        lc.on_event(&ServerEvent::AggregationStarted);
        assert_eq!(
            lc.on_event(&ServerEvent::SessionJoined { session_id: "s1".into() }),
            Phase::Aggregating
        );
    }

    #[test]
    fn test_entering_other_session_starts_over() {
        let mut lc = in_session();
        lc.on_event(&ServerEvent::DiscussionStarted("go".into()));
        assert_eq!(
            lc.on_event(&ServerEvent::SessionJoined { session_id: "s2".into() }),
            Phase::InSession
        );
        assert_eq!(lc.session_id(), Some("s2"));
    }

    #[test]
    fn test_leave_forgets_session() {
        let mut lc = in_session();
        lc.left();
        assert_eq!(lc.session_id(), None);
        assert_eq!(
            lc.on_event(&ServerEvent::SessionJoined { session_id: "s1".into() }),
            Phase::InSession
        );
    }

    #[test]
    fn test_leave_from_lobby_stays_in_lobby() {
        let mut lc = Lifecycle::new();
        lc.connected();
        lc.left();
        assert_eq!(lc.phase(), Phase::Lobby);
    }

    #[test]
    fn test_disconnect_from_any_phase() {
        let mut lc = in_session();
        lc.disconnected();
        assert_eq!(lc.phase(), Phase::Disconnected);
        assert!(!lc.phase().is_connected());
    }
}
