// Transport seam for the stream client
//
// The client only needs "open a connection" and "read the next frame"; the
// WebSocket implementation lives here and tests substitute scripted ones.

use crate::{AgisError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// Data frame received from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// One open connection
#[async_trait]
pub trait StreamConnection: Send {
    /// Next data frame; `Ok(None)` once the peer has closed the stream
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Close the connection; safe to call more than once
    async fn close(&mut self);
}

/// Opens connections to a stream endpoint
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, url: &Url, timeout: Duration) -> Result<Box<dyn StreamConnection>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport (tokio-tungstenite)
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

#[async_trait]
impl StreamTransport for WsTransport {
    async fn open(&self, url: &Url, timeout: Duration) -> Result<Box<dyn StreamConnection>> {
        let (ws, response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| AgisError::Transport(format!("connect timed out after {:?}", timeout)))?
            .map_err(|e| AgisError::Transport(e.to_string()))?;

        debug!(
            target: "stream_transport",
            url = %url,
            status = %response.status(),
            "WebSocket handshake complete"
        );

        Ok(Box::new(WsConnection { ws, closed: false }))
    }
}

struct WsConnection {
    ws: WsStream,
    closed: bool,
}

#[async_trait]
impl StreamConnection for WsConnection {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(Frame::Text(text))),
                Some(Ok(Message::Binary(bytes))) => return Ok(Some(Frame::Binary(bytes))),
                Some(Ok(Message::Close(frame))) => {
                    debug!(target: "stream_transport", frame = ?frame, "Peer closed stream");
                    self.closed = true;
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(AgisError::Transport(e.to_string()));
                }
                None => {
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ws.close(None).await {
            debug!(target: "stream_transport", error = %e, "Close handshake failed");
        }
    }
}
