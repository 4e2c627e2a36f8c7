//! Command-line arguments for the terminal client.

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Terminal client for the Purse server", long_about = None)]
pub struct Cli {
    /// Address of the top-up (stream) listener.
    #[arg(long, default_value = "127.0.0.1:8081")]
    pub topup: String,

    /// Address of the balance (datagram) listener.
    #[arg(long, default_value = "127.0.0.1:8082")]
    pub balance: String,

    /// URL of the donation feed.
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    pub feed: String,

    /// How long to wait for a balance reply, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_server_ports() {
        let cli = Cli::parse_from(["purse-client"]);
        assert_eq!(cli.topup, "127.0.0.1:8081");
        assert_eq!(cli.balance, "127.0.0.1:8082");
        assert_eq!(cli.feed, "ws://127.0.0.1:8080/ws");
        assert_eq!(cli.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "purse-client",
            "--topup",
            "10.0.0.1:9001",
            "--timeout-ms",
            "50",
        ]);
        assert_eq!(cli.topup, "10.0.0.1:9001");
        assert_eq!(cli.timeout(), Duration::from_millis(50));
    }
}
