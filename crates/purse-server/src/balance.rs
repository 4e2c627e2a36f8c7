//! Datagram listener for balance queries.

use crate::handlers::AppState;
use crate::metrics;
use purse_protocol::{balance, BalanceReply};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Answer balance queries forever, one packet at a time.
pub async fn run_balance_listener(socket: UdpSocket, state: Arc<AppState>) {
    if let Ok(addr) = socket.local_addr() {
        info!("Balance listener started at {}", addr);
    }

    let mut buf = vec![0u8; state.config.balance.max_datagram_size.max(1)];

    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "Error reading balance query");
                metrics::record_error("balance_io");
                continue;
            }
        };

        let reply = answer_query(&buf[..n], &state);
        debug!(peer = %peer, reply = %reply, "Answering balance query");

        if let Err(e) = socket.send_to(reply.to_string().as_bytes(), peer).await {
            warn!(peer = %peer, error = %e, "Error sending balance reply");
            metrics::record_error("balance_io");
        }
    }
}

/// Look up the account named in `packet`.
pub fn answer_query(packet: &[u8], state: &AppState) -> BalanceReply {
    let username = balance::parse_query(packet);
    let found = state.store.get(&username);
    let reply = BalanceReply::from_lookup(username, found);
    metrics::record_balance_query(reply.is_found());
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_answer_known_and_unknown() {
        let state = AppState::new(Config::ephemeral());
        state.store.credit("alice", 100.0);
        state.store.credit("alice", 50.5);

        assert_eq!(
            answer_query(b"alice", &state).to_string(),
            "Saldo milik alice: 150.50"
        );
        assert_eq!(
            answer_query(b"bob\n", &state).to_string(),
            "Username bob not found."
        );
    }

    #[tokio::test]
    async fn test_listener_replies_and_truncates() {
        let mut config = Config::ephemeral();
        config.balance.max_datagram_size = 5;
        let state = Arc::new(AppState::new(config));
        state.store.credit("alice", 1.0);

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let listener = tokio::spawn(run_balance_listener(socket, Arc::clone(&state)));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(addr).await.unwrap();
        client.send(b"alice-and-more").await.unwrap();

        let mut buf = [0u8; 128];
        let n = tokio::time::timeout(std::time::Duration::from_secs(2), client.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"Saldo milik alice: 1.00");

        listener.abort();
    }
}
