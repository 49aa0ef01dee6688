//! Async WebSocket transport for the Luno streaming endpoint.
//!
//! This module is organized by concern:
//! - the low-level connect/authenticate/keepalive helpers below
//! - [`connection`] - session supervision and the public [`Conn`] handle

mod connection;

pub use connection::{Conn, DEFAULT_WS_HOST, Dialer, dial};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use tungstenite::Message;

use crate::Result;
use crate::models::{Credentials, KEEPALIVE_FRAME};

/// Write half of a streaming connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a streaming connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns [`StreamError::WebSocket`](crate::StreamError::WebSocket) if
/// the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    debug!("WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Sends the credentials frame. The server expects this as the first
/// frame on every new connection.
///
/// # Errors
///
/// Returns [`StreamError`](crate::StreamError) if serialization or the
/// send fails.
pub async fn authenticate(write: &mut WsWriter, credentials: &Credentials) -> Result<()> {
    let json = serde_json::to_string(credentials)?;
    write.send(Message::Text(json.into())).await?;
    debug!("Sent credentials frame");

    Ok(())
}

/// Sends one outbound keepalive frame (the empty JSON string).
///
/// # Errors
///
/// Returns [`StreamError::WebSocket`](crate::StreamError::WebSocket) if
/// the send fails.
pub async fn send_keepalive(write: &mut WsWriter) -> Result<()> {
    write.send(Message::Text(KEEPALIVE_FRAME.into())).await?;

    Ok(())
}
