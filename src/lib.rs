//! Client-side synchronization engine for collaborative brainstorming sessions.
//!
//! One WebSocket connection carries JSON envelopes both ways. Outbound
//! [`commands`] are encoded from typed [`Command`]s; inbound frames decode into
//! a closed [`ServerEvent`] union, fan out through the [`Dispatcher`], and are
//! folded into a local [`SessionStore`] mirror.
//!
//! ## Design
//! - [`BrainstormClient`] owns the transport, dispatcher, store and lifecycle.
//!   It is single-threaded (`!Send`); the caller drives it from one task.
//! - No queueing and no reconnection. Sends without a socket fail fast.
//! - Media bytes never cross the socket; see [`media`].

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod model;
pub mod protocol;
pub mod store;
pub mod transport;

pub use client::BrainstormClient;
pub use commands::{Command, CommandKind};
pub use config::ClientConfig;
pub use dispatcher::{handler, Dispatcher, Handler};
pub use error::{ClientError, ProtocolError, Result};
pub use lifecycle::{Lifecycle, Phase};
pub use model::{Idea, IdeaRating, MediaKind, RatingAverages, RatingScores, Session, User};
pub use protocol::{ChatLine, Envelope, EventKind, ServerEvent};
pub use store::{SessionStore, StoreBinding, TranscriptEntry};
