//! WebSocket donation feed client.
//!
//! This module provides the long-lived feed connection using tokio-tungstenite.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use purse_protocol::DonationEvent;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connection to the donation feed.
pub struct FeedConnection {
    stream: WsStream,
}

impl FeedConnection {
    /// Connect to a feed endpoint such as `ws://127.0.0.1:8080/ws`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection or the upgrade fails.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Other(format!("WebSocket handshake failed: {}", e)))?;

        debug!(url = %url, "Connected to donation feed");
        Ok(Self { stream })
    }

    /// Publish a donation.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or sending fails.
    pub async fn send(&mut self, event: &DonationEvent) -> Result<(), TransportError> {
        send_text(&mut self.stream, event.to_json()?).await
    }

    /// Send an arbitrary text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), TransportError> {
        send_text(&mut self.stream, text.into()).await
    }

    /// Receive the next broadcast.
    ///
    /// Returns `None` once the server closes the feed.
    ///
    /// # Errors
    ///
    /// Returns an error on a transport failure or an undecodable frame.
    pub async fn recv(&mut self) -> Result<Option<DonationEvent>, TransportError> {
        recv_event(&mut self.stream).await
    }

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake cannot be sent.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        close(&mut self.stream).await
    }

    /// Split into independently usable send and receive halves.
    #[must_use]
    pub fn split(self) -> (FeedSender, FeedReceiver) {
        let (sink, stream) = self.stream.split();
        (FeedSender { sink }, FeedReceiver { stream })
    }
}

/// Sending half of a [`FeedConnection`].
pub struct FeedSender {
    sink: SplitSink<WsStream, Message>,
}

impl FeedSender {
    /// Publish a donation.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or sending fails.
    pub async fn send(&mut self, event: &DonationEvent) -> Result<(), TransportError> {
        send_text(&mut self.sink, event.to_json()?).await
    }

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake cannot be sent.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        close(&mut self.sink).await
    }
}

/// Receiving half of a [`FeedConnection`].
pub struct FeedReceiver {
    stream: SplitStream<WsStream>,
}

impl FeedReceiver {
    /// Receive the next broadcast. Returns `None` once the feed is closed.
    ///
    /// # Errors
    ///
    /// Returns an error on a transport failure or an undecodable frame.
    pub async fn recv(&mut self) -> Result<Option<DonationEvent>, TransportError> {
        recv_event(&mut self.stream).await
    }
}

async fn send_text<S>(sink: &mut S, text: String) -> Result<(), TransportError>
where
    S: futures_util::Sink<Message, Error = WsError> + Unpin,
{
    sink.send(Message::Text(text))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))
}

async fn close<S>(sink: &mut S) -> Result<(), TransportError>
where
    S: futures_util::Sink<Message, Error = WsError> + Unpin,
{
    match sink.close().await {
        Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
        Err(e) => Err(TransportError::Other(format!("Failed to close: {}", e))),
    }
}

async fn recv_event<S>(stream: &mut S) -> Result<Option<DonationEvent>, TransportError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                return Ok(Some(DonationEvent::from_json(text.as_bytes())?));
            }
            Some(Ok(Message::Binary(data))) => {
                return Ok(Some(DonationEvent::from_json(&data)?));
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                // Pongs are queued by tungstenite itself
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Ok(Message::Close(_))) => {
                debug!("Received close frame");
                return Ok(None);
            }
            Some(Err(WsError::ConnectionClosed)) | None => {
                debug!("Feed stream ended");
                return Ok(None);
            }
            Some(Err(e)) => {
                warn!("Feed error: {}", e);
                return Err(TransportError::ReceiveFailed(e.to_string()));
            }
        }
    }
}
