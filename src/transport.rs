//! Single WebSocket connection: connect, send, receive, close.
//!
//! No queueing, retry or reconnection happens here. A send without an open
//! socket is logged and returned as [`ClientError::NotConnected`]; the message
//! is gone. When the peer closes, the socket reference is dropped and
//! [`Transport::recv_event`] yields `None`.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, ProtocolError, Result};
use crate::protocol::{decode_frame, Envelope, ServerEvent};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
pub struct Transport {
    sink: Option<SplitSink<WsStream, WsMessage>>,
    stream: Option<SplitStream<WsStream>>,
    username: String,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Username recorded by the last successful [`Transport::connect`].
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Open the socket and record `username`. Any previous socket is closed first.
    pub async fn connect(&mut self, url: &str, username: &str) -> Result<()> {
        self.disconnect().await;
        let (ws, _response) = connect_async(url).await.map_err(|source| {
            error!(url, error = %source, "socket failed to open");
            ClientError::Connect {
                url: url.to_string(),
                source,
            }
        })?;
        let (sink, stream) = ws.split();
        self.sink = Some(sink);
        self.stream = Some(stream);
        self.username = username.to_string();
        info!(url, username, "socket connected");
        Ok(())
    }

    /// Serialize and write one envelope.
    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            error!(kind = %envelope.kind, "socket is not connected; message dropped");
            return Err(ClientError::NotConnected);
        };
        let text = envelope.to_json().map_err(ProtocolError::Json)?;
        debug!(kind = %envelope.kind, "send");
        let written = sink.send(WsMessage::Text(text)).await;
        if let Err(e) = written {
            warn!(kind = %envelope.kind, error = %e, "send failed; dropping socket");
            self.drop_socket();
            return Err(ClientError::Send(e));
        }
        Ok(())
    }

    /// Next raw text frame, or `None` once the socket is closed.
    ///
    /// Control frames are skipped. Binary frames are accepted when they hold UTF-8.
    pub async fn recv_frame(&mut self) -> Option<String> {
        loop {
            let next = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => return None,
            };
            match next {
                Some(Ok(WsMessage::Text(text))) => return Some(text),
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(text),
                    Err(_) => warn!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("socket closed by peer");
                    self.drop_socket();
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "socket read failed");
                    self.drop_socket();
                    return None;
                }
            }
        }
    }

    /// Next decoded event. Frames that fail to decode are logged and skipped.
    pub async fn recv_event(&mut self) -> Option<ServerEvent> {
        loop {
            let text = self.recv_frame().await?;
            match decode_frame(&text) {
                Ok(event) => return Some(event),
                Err(ProtocolError::UnknownType(kind)) => {
                    debug!(kind = %kind, "dropping frame of unknown type");
                }
                Err(e) => warn!(error = %e, "dropping malformed frame"),
            }
        }
    }

    /// Close the socket. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "close handshake failed");
            }
            info!("socket disconnected");
        }
        self.stream = None;
    }

    fn drop_socket(&mut self) {
        self.sink = None;
        self.stream = None;
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("open", &self.is_open())
            .field("username", &self.username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_socket_is_not_connected() {
        let mut t = Transport::new();
        let err = t.send(&Envelope::new("list_sessions")).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_recv_without_socket_is_none() {
        let mut t = Transport::new();
        assert!(t.recv_event().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut t = Transport::new();
        t.disconnect().await;
        t.disconnect().await;
        assert!(!t.is_open());
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let mut t = Transport::new();
        let err = t
            .connect(&format!("ws://{addr}/ws"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
        assert!(!t.is_open());
        assert_eq!(t.username(), "");
    }
}
