//! Engine facade: one connection, one dispatcher, one mirrored store.
//!
//! ## Control flow
//! 1. Caller issues a [`Command`] → lifecycle gate → encoder → [`Transport::send`]
//! 2. Caller drives [`BrainstormClient::next_event`] in its event loop
//! 3. Each decoded event advances the [`Lifecycle`], then fans out through the
//!    [`Dispatcher`]; the store is always the first subscriber.
//!
//! Everything runs on the caller's task. The client is deliberately `!Send`:
//! handlers and the store are shared with `Rc`, never across threads.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::commands::{Command, CommandKind};
use crate::config::ClientConfig;
use crate::dispatcher::{handler, Dispatcher, Handler};
use crate::error::{ClientError, Result};
use crate::lifecycle::{Lifecycle, Phase};
use crate::model::RatingScores;
use crate::protocol::{decode_frame, EventKind, ServerEvent};
use crate::store::{SessionStore, StoreBinding};
use crate::transport::Transport;

pub struct BrainstormClient {
    config: ClientConfig,
    transport: Transport,
    dispatcher: Rc<Dispatcher>,
    store: Rc<RefCell<SessionStore>>,
    lifecycle: Lifecycle,
    _binding: StoreBinding,
}

impl BrainstormClient {
    pub fn new(config: ClientConfig) -> Self {
        let dispatcher = Rc::new(Dispatcher::new());
        let store = Rc::new(RefCell::new(SessionStore::new()));
        let binding = StoreBinding::attach(&store, &dispatcher);
        Self {
            config,
            transport: Transport::new(),
            dispatcher,
            store,
            lifecycle: Lifecycle::new(),
            _binding: binding,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn username(&self) -> &str {
        self.transport.username()
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    /// Borrow the mirror. Do not hold the borrow across [`Self::next_event`].
    pub fn store(&self) -> Ref<'_, SessionStore> {
        self.store.borrow()
    }

    /// Shared handle for subscribers that read the mirror from their callbacks.
    pub fn shared_store(&self) -> Rc<RefCell<SessionStore>> {
        Rc::clone(&self.store)
    }

    /// Subscribe a closure and hand back the exact [`Handler`] needed to remove it.
    pub fn on<F>(&self, kind: EventKind, f: F) -> Handler
    where
        F: Fn(&ServerEvent) + 'static,
    {
        let h = handler(f);
        self.dispatcher.subscribe(kind, &h);
        h
    }

    pub fn off(&self, kind: EventKind, h: &Handler) -> bool {
        self.dispatcher.unsubscribe(kind, h)
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Open the socket as `username` and request the session list.
    ///
    /// A fresh connection starts in the lobby: any session remembered from
    /// an earlier connection is dropped first.
    pub async fn connect(&mut self, username: &str) -> Result<()> {
        self.store.borrow_mut().leave();
        self.lifecycle.connecting();
        let url = self.config.ws_url();
        if let Err(e) = self.transport.connect(&url, username).await {
            self.lifecycle.disconnected();
            return Err(e);
        }
        self.lifecycle.connected();
        self.execute(Command::ListSessions).await
    }

    pub async fn disconnect(&mut self) {
        self.transport.disconnect().await;
        self.connection_closed();
    }

    /// Wait for the next inbound event and apply it.
    ///
    /// Returns `None` once the connection is gone; no reconnect is attempted.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        match self.transport.recv_event().await {
            Some(event) => {
                self.handle_event(&event);
                Some(event)
            }
            None => {
                if self.lifecycle.phase() != Phase::Disconnected {
                    info!("connection lost");
                }
                self.connection_closed();
                None
            }
        }
    }

    /// Decode and apply a raw frame. Bad frames are logged and dropped.
    pub fn handle_frame(&mut self, text: &str) -> Option<ServerEvent> {
        match decode_frame(text) {
            Ok(event) => {
                self.handle_event(&event);
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, "dropping frame");
                None
            }
        }
    }

    /// Advance the lifecycle, then fan the event out to subscribers.
    pub fn handle_event(&mut self, event: &ServerEvent) {
        let before = self.lifecycle.phase();
        let after = self.lifecycle.on_event(event);
        if before != after {
            debug!(from = %before, to = %after, "phase change");
        }
        self.dispatcher.dispatch(event);
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Gate, encode and send one command.
    ///
    /// Session-bound commands address the remembered current session.
    /// `leave_session` resets local session state even if the send fails.
    pub async fn execute(&mut self, command: Command) -> Result<()> {
        let kind = command.kind();
        let phase = self.lifecycle.phase();
        if phase.is_connected() && !self.lifecycle.permits(kind) {
            return Err(ClientError::NotPermitted { command: kind, phase });
        }

        let session_id = if kind.is_session_bound() {
            match self.store.borrow().current_session_id() {
                Some(id) => id.to_string(),
                None => return Err(ClientError::NoCurrentSession),
            }
        } else {
            String::new()
        };

        let envelope = command.encode(self.transport.username(), &session_id);
        let sent = self.transport.send(&envelope).await;

        if kind == CommandKind::LeaveSession {
            self.store.borrow_mut().leave();
            self.lifecycle.left();
        }
        if sent.is_err() && !self.transport.is_open() {
            self.connection_closed();
        }
        sent
    }

    /// The server forgets session membership with the socket; so do we.
    fn connection_closed(&mut self) {
        if self.lifecycle.phase() != Phase::Disconnected {
            self.store.borrow_mut().leave();
        }
        self.lifecycle.disconnected();
    }

    pub async fn list_sessions(&mut self) -> Result<()> {
        self.execute(Command::ListSessions).await
    }

    pub async fn create_session(&mut self, name: &str, guiding_questions: Vec<String>) -> Result<()> {
        self.execute(Command::CreateSession {
            name: name.to_string(),
            guiding_questions,
        })
        .await
    }

    pub async fn join_session(&mut self, session_id: &str) -> Result<()> {
        self.execute(Command::JoinSession {
            session_id: session_id.to_string(),
        })
        .await
    }

    pub async fn leave_session(&mut self) -> Result<()> {
        self.execute(Command::LeaveSession).await
    }

    pub async fn send_chat(&mut self, text: &str) -> Result<()> {
        self.execute(Command::Chat {
            text: text.to_string(),
        })
        .await
    }

    pub async fn submit_idea(
        &mut self,
        content: &str,
        media_type: &str,
        media_url: Option<&str>,
    ) -> Result<()> {
        self.execute(Command::SubmitIdea {
            content: content.to_string(),
            media_type: media_type.to_string(),
            media_url: media_url.map(str::to_string),
        })
        .await
    }

    pub async fn rate_idea(&mut self, idea_id: &str, scores: RatingScores) -> Result<()> {
        self.execute(Command::RateIdea {
            idea_id: idea_id.to_string(),
            scores,
        })
        .await
    }

    pub async fn aggregate_ideas(&mut self) -> Result<()> {
        self.execute(Command::AggregateIdeas).await
    }

    pub async fn start_discussion(&mut self) -> Result<()> {
        self.execute(Command::StartDiscussion).await
    }
}

impl std::fmt::Debug for BrainstormClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrainstormClient")
            .field("transport", &self.transport)
            .field("phase", &self.lifecycle.phase())
            .finish()
    }
}
