//! Stream (TCP) top-up client.

use purse_protocol::encode_line;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::TransportError;

/// Send one top-up request and return the server's reply line.
///
/// The request is newline-terminated and the write half is closed, so the
/// server sees a complete request immediately. The reply is read until the
/// server closes the connection.
///
/// # Errors
///
/// Returns an error if connecting, writing or reading fails, or if the reply
/// is not valid UTF-8.
pub async fn top_up(addr: impl ToSocketAddrs, request: &str) -> Result<String, TransportError> {
    let mut stream = TcpStream::connect(addr).await?;
    debug!(peer = ?stream.peer_addr().ok(), "Connected to top-up server");

    stream.write_all(&encode_line(request.trim())).await?;
    stream.shutdown().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;

    if reply.is_empty() {
        return Err(TransportError::ConnectionClosed);
    }

    String::from_utf8(reply).map_err(|e| TransportError::ReceiveFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_top_up_sends_line_and_reads_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = String::new();
            socket.read_to_string(&mut request).await.unwrap();
            socket.write_all(b"ok\n").await.unwrap();
            request
        });

        let reply = top_up(addr, " alice:100 ").await.unwrap();
        assert_eq!(reply, "ok\n");
        assert_eq!(server.await.unwrap(), "alice:100\n");
    }

    #[tokio::test]
    async fn test_top_up_without_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        assert!(top_up(addr, "alice:1").await.is_err());
    }
}
