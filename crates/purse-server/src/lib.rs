//! # purse-server
//!
//! Balance tracking reachable over three transports:
//!
//! - **Top-up** - TCP, `username:amount` per connection ([`topup`])
//! - **Balance** - UDP, one username per datagram ([`balance`])
//! - **Donation feed** - WebSocket at `/ws`, JSON broadcast ([`handlers`])
//!
//! Every listener shares one [`AppState`] holding the balance store and the
//! feed's subscriber registry.

pub mod balance;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod topup;

pub use config::Config;
pub use handlers::AppState;
pub use server::Server;
