//! # purse-transport
//!
//! Client-side transports for talking to a Purse server:
//!
//! - **stream** - one TCP connection per top-up request
//! - **datagram** - one UDP packet per balance query
//! - **websocket** - the long-lived donation feed
//!
//! ```rust,ignore
//! use purse_transport::{datagram, stream};
//!
//! let reply = stream::top_up("127.0.0.1:8081", "alice:100").await?;
//! let balance = datagram::check_balance("127.0.0.1:8082", "alice", timeout).await?;
//! ```

pub mod datagram;
pub mod error;
pub mod stream;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::TransportError;

#[cfg(feature = "websocket")]
pub use websocket::FeedConnection;
