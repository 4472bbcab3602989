//! WebSocket listener and split connection halves over `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WireCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

use padlink_protocol::CloseCode;

use crate::TransportError;

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A data frame received from a peer. Control frames (ping/pong) are
/// consumed by the reader and never surface here.
#[derive(Debug, Clone)]
pub enum Frame {
    /// A text frame; the bytes are guaranteed valid UTF-8 by the protocol
    /// layer of tungstenite. Kept as raw bytes so relayed payloads stay
    /// bit-identical.
    Text(Bytes),
    /// A binary frame. The hub rejects these, but the handler needs to see
    /// them to close with the right status.
    Binary(Bytes),
}

/// Listens for WebSocket connections on a TCP address.
pub struct WsListener {
    listener: TcpListener,
    allowed_origins: Vec<String>,
}

impl WsListener {
    /// Binds the listener.
    ///
    /// `allowed_origins` is matched against the `Origin` header during the
    /// upgrade; an empty list allows any origin. Requests without an
    /// `Origin` header (non-browser clients) are always allowed.
    pub async fn bind(
        addr: &str,
        allowed_origins: Vec<String>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, "websocket transport listening");
        Ok(Self {
            listener,
            allowed_origins,
        })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts the next connection and completes the WebSocket upgrade.
    ///
    /// Returns the split read/write halves plus the attributed remote IP:
    /// the first entry of `X-Forwarded-For` when a proxy supplied one,
    /// otherwise the socket peer address.
    pub async fn accept(
        &self,
    ) -> Result<(WsReader, WsSender, String), TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let mut remote = peer.ip().to_string();
        let allowed = &self.allowed_origins;

        let callback = |request: &Request, response: Response| {
            if let Some(forwarded) = first_forwarded_for(request) {
                remote = forwarded;
            }
            if !allowed.is_empty() {
                if let Some(origin) = request
                    .headers()
                    .get("Origin")
                    .and_then(|v| v.to_str().ok())
                {
                    let ok = allowed.iter().any(|a| a.eq_ignore_ascii_case(origin));
                    if !ok {
                        let mut rejection = ErrorResponse::new(Some(
                            "origin not allowed".to_string(),
                        ));
                        *rejection.status_mut() =
                            tokio_tungstenite::tungstenite::http::StatusCode::FORBIDDEN;
                        return Err(rejection);
                    }
                }
            }
            Ok(response)
        };

        let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .map_err(TransportError::Handshake)?;

        let (sink, stream) = ws.split();
        Ok((
            WsReader { stream },
            WsSender {
                sink: Arc::new(Mutex::new(sink)),
            },
            remote,
        ))
    }
}

fn first_forwarded_for(request: &Request) -> Option<String> {
    let header = request.headers().get("X-Forwarded-For")?.to_str().ok()?;
    header
        .split(',')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .map(str::to_string)
}

/// The read half of a connection. Owned by exactly one handler task.
pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Waits for the next data frame.
    ///
    /// Returns `Ok(None)` once the peer has closed (close frame or EOF).
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Frame::Text(Bytes::from(text))));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(Frame::Binary(data)));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => return Err(TransportError::Receive(e)),
            }
        }
    }
}

/// The write half of a connection.
///
/// Cheaply cloneable; the session object holds one clone so replacement and
/// relay-failure paths can close the transport while the handler is parked
/// in `next_frame`.
#[derive(Clone)]
pub struct WsSender {
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
}

impl WsSender {
    /// Sends `payload` as a single text frame.
    ///
    /// # Errors
    /// Returns [`TransportError::NonUtf8Payload`] if the bytes are not
    /// UTF-8, or [`TransportError::Send`] if the connection is gone.
    pub async fn send_text(&self, payload: Bytes) -> Result<(), TransportError> {
        let text = Utf8Bytes::try_from(payload)
            .map_err(|_| TransportError::NonUtf8Payload)?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(TransportError::Send)
    }

    /// Sends a close frame with the given status and reason.
    ///
    /// Errors are swallowed: the usual caller is a teardown path and the
    /// peer may already be gone.
    pub async fn close(&self, code: CloseCode, reason: &str) {
        let frame = CloseFrame {
            code: WireCloseCode::from(code.as_u16()),
            reason: Utf8Bytes::from(reason.to_string()),
        };
        let _ = self
            .sink
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await;
    }
}
