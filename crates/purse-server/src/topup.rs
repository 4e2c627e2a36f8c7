//! Stream listener for top-up requests.
//!
//! One request per connection: read a `username:amount` line, credit the
//! store, reply, close, then notify the donation feed.

use crate::handlers::AppState;
use crate::metrics;
use anyhow::Result;
use bytes::BytesMut;
use purse_protocol::codec::{self, ProtocolError};
use purse_protocol::{topup, DonationEvent, TopUpError, TopUpRequest};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Outcome of reading one request from a connection.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete request.
    Request(String),
    /// Bytes arrived but do not form a usable request.
    Malformed(ProtocolError),
    /// The peer closed without sending anything.
    Closed,
}

/// Accept top-up connections forever, one task per connection.
pub async fn run_topup_listener(listener: TcpListener, state: Arc<AppState>) {
    if let Ok(addr) = listener.local_addr() {
        info!("Top-up listener started at {}", addr);
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_topup(stream, peer, state).await {
                        warn!(peer = %peer, error = %e, "Top-up connection failed");
                        metrics::record_error("topup_io");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "Error accepting top-up connection");
                metrics::record_error("accept");
            }
        }
    }
}

async fn handle_topup(mut stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let limits = &state.config.topup;

    let outcome =
        read_request(&mut stream, limits.max_request_size, limits.idle_timeout()).await?;

    let (reply, notification) = match outcome {
        ReadOutcome::Request(line) => process_request(&line, &state),
        ReadOutcome::Malformed(e) => {
            debug!(peer = %peer, error = %e, "Unreadable top-up request");
            metrics::record_topup(TopUpError::InvalidFormat.label());
            (TopUpError::InvalidFormat.reply().to_string(), None)
        }
        ReadOutcome::Closed => {
            debug!(peer = %peer, "Connection closed before a request arrived");
            return Ok(());
        }
    };

    let written = write_reply(&mut stream, &reply).await;

    if let Some(event) = notification {
        state.broadcast(&event);
    }

    written?;
    Ok(())
}

async fn write_reply(stream: &mut TcpStream, reply: &str) -> std::io::Result<()> {
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

/// Read one request.
///
/// A request ends at a newline, at EOF, or once `idle` passes without new
/// bytes after the first ones arrived. Before the first byte this waits
/// indefinitely.
///
/// # Errors
///
/// Returns an error if reading from the connection fails.
pub async fn read_request<R>(
    reader: &mut R,
    max_size: usize,
    idle: Duration,
) -> std::io::Result<ReadOutcome>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(max_size.min(4096));

    loop {
        match codec::decode_line(&mut buf, max_size) {
            Ok(Some(line)) => return Ok(ReadOutcome::Request(line)),
            Ok(None) => {}
            Err(e) => return Ok(ReadOutcome::Malformed(e)),
        }

        let read = if buf.is_empty() {
            reader.read_buf(&mut buf).await?
        } else {
            match tokio::time::timeout(idle, reader.read_buf(&mut buf)).await {
                Ok(read) => read?,
                Err(_) => return Ok(finish(&mut buf, max_size)),
            }
        };

        if read == 0 {
            return Ok(finish(&mut buf, max_size));
        }
    }
}

fn finish(buf: &mut BytesMut, max_size: usize) -> ReadOutcome {
    match codec::decode_remainder(buf, max_size) {
        Ok(Some(line)) => ReadOutcome::Request(line),
        Ok(None) => ReadOutcome::Closed,
        Err(e) => ReadOutcome::Malformed(e),
    }
}

/// Apply a request to the store.
///
/// Returns the reply text and, on success, the feed notification to send
/// once the reply is out.
pub fn process_request(line: &str, state: &AppState) -> (String, Option<DonationEvent>) {
    match TopUpRequest::parse(line) {
        Ok(request) => {
            let balance = state.store.credit(&request.username, request.amount);
            metrics::record_topup("ok");
            info!(
                username = %request.username,
                amount = request.amount,
                balance,
                "Top-up applied"
            );

            (
                topup::success_reply(&request.username, balance),
                Some(DonationEvent::top_up(
                    request.username,
                    request.amount,
                    balance,
                )),
            )
        }
        Err(e) => {
            debug!(request = %line, error = %e, "Rejected top-up request");
            metrics::record_topup(e.label());
            (e.reply().to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const IDLE: Duration = Duration::from_millis(30);

    #[tokio::test]
    async fn test_read_newline_terminated() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"alice:100\n").await.unwrap();

        match read_request(&mut server, 1024, IDLE).await.unwrap() {
            ReadOutcome::Request(line) => assert_eq!(line, "alice:100"),
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_reassembles_partial_writes() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            client.write_all(b"ali").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            client.write_all(b"ce:50.5\n").await.unwrap();
            client
        });

        match read_request(&mut server, 1024, Duration::from_secs(5)).await.unwrap() {
            ReadOutcome::Request(line) => assert_eq!(line, "alice:50.5"),
            other => panic!("Expected request, got {:?}", other),
        }
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_read_until_eof() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"bob:7").await.unwrap();
        drop(client);

        match read_request(&mut server, 1024, Duration::from_secs(5)).await.unwrap() {
            ReadOutcome::Request(line) => assert_eq!(line, "bob:7"),
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_completes_after_idle() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"bob:7").await.unwrap();

        match read_request(&mut server, 1024, IDLE).await.unwrap() {
            ReadOutcome::Request(line) => assert_eq!(line, "bob:7"),
            other => panic!("Expected request, got {:?}", other),
        }
        drop(client);
    }

    #[tokio::test]
    async fn test_read_closed_without_data() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        assert!(matches!(
            read_request(&mut server, 1024, IDLE).await.unwrap(),
            ReadOutcome::Closed
        ));
    }

    #[tokio::test]
    async fn test_read_oversized_request() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(&[b'a'; 64]).await.unwrap();

        assert!(matches!(
            read_request(&mut server, 16, IDLE).await.unwrap(),
            ReadOutcome::Malformed(ProtocolError::LineTooLarge { .. })
        ));
    }

    #[test]
    fn test_process_request_credits_and_notifies() {
        let state = AppState::new(Config::ephemeral());

        let (reply, event) = process_request("alice:100", &state);
        assert_eq!(reply, "Top-up berhasil. Jumlah Saldo alice: 100.00\n");
        assert_eq!(event, Some(DonationEvent::top_up("alice", 100.0, 100.0)));

        let (reply, _) = process_request("alice:50.5\n", &state);
        assert_eq!(reply, "Top-up berhasil. Jumlah Saldo alice: 150.50\n");
        assert_eq!(state.store.get("alice"), Some(150.5));
    }

    #[test]
    fn test_process_request_rejections() {
        let state = AppState::new(Config::ephemeral());

        let (reply, event) = process_request("onlyusername", &state);
        assert_eq!(reply, "Invalid data format. Format: <username>:<amount>\n");
        assert!(event.is_none());

        let (reply, event) = process_request("alice:notanumber", &state);
        assert_eq!(
            reply,
            "Invalid amount format. Amount should be a valid number.\n"
        );
        assert!(event.is_none());
        assert!(state.store.is_empty());
    }
}
