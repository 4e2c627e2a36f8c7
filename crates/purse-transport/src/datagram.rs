//! Datagram (UDP) balance client.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, ToSocketAddrs, UdpSocket};
use tracing::debug;

use crate::error::TransportError;

/// Largest reply the client will read.
pub const MAX_REPLY_SIZE: usize = 1024;

/// Send a balance query and wait up to `timeout` for the reply packet.
///
/// # Errors
///
/// Returns [`TransportError::Timeout`] if no reply arrives in time, or an
/// I/O error if the address cannot be resolved or the socket fails.
pub async fn check_balance(
    addr: impl ToSocketAddrs,
    username: &str,
    timeout: Duration,
) -> Result<String, TransportError> {
    let server = lookup_host(addr)
        .await?
        .next()
        .ok_or_else(|| TransportError::Other("address resolved to nothing".into()))?;

    let local: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(server).await?;
    socket.send(username.trim().as_bytes()).await?;
    debug!(%server, "Sent balance query");

    let mut buf = vec![0u8; MAX_REPLY_SIZE];
    let n = tokio::time::timeout(timeout, socket.recv(&mut buf))
        .await
        .map_err(|_| TransportError::Timeout)??;

    Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_balance_round_trip() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            let reply = format!("got {}", String::from_utf8_lossy(&buf[..n]));
            server.send_to(reply.as_bytes(), peer).await.unwrap();
        });

        let reply = check_balance(addr, "alice\n", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(reply, "got alice");
    }

    #[tokio::test]
    async fn test_check_balance_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();

        let result = check_balance(addr, "alice", Duration::from_millis(50)).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
        drop(silent);
    }
}
