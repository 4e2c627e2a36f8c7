//! # purse-protocol
//!
//! Wire formats shared by the Purse server and its clients.
//!
//! Purse speaks three small protocols:
//!
//! - **Top-up** (stream) - `username:amount`, one request per connection,
//!   answered with a single text line.
//! - **Balance** (datagram) - a bare username in, one text packet out.
//! - **Donation feed** (WebSocket) - JSON [`DonationEvent`] text frames in
//!   both directions.
//!
//! ## Example
//!
//! ```rust
//! use purse_protocol::{topup, DonationEvent, TopUpRequest};
//!
//! let request = TopUpRequest::parse("alice:100").unwrap();
//! assert_eq!(request.username, "alice");
//!
//! let reply = topup::success_reply(&request.username, 150.5);
//! assert_eq!(reply, "Top-up berhasil. Jumlah Saldo alice: 150.50\n");
//!
//! let event = DonationEvent::top_up(&request.username, request.amount, 150.5);
//! let json = event.to_json().unwrap();
//! assert_eq!(DonationEvent::from_json(json.as_bytes()).unwrap(), event);
//! ```

pub mod balance;
pub mod codec;
pub mod event;
pub mod topup;

pub use balance::BalanceReply;
pub use codec::{decode_line, encode_line, ProtocolError};
pub use event::DonationEvent;
pub use topup::{TopUpError, TopUpRequest};
