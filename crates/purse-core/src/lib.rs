//! # purse-core
//!
//! Shared state for the Purse server.
//!
//! - **BalanceStore** - account balances behind one exclusive lock
//! - **SubscriberRegistry** - open feed connections and donation fan-out
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  credit   ┌──────────────┐
//! │   Top-up    │──────────▶│ BalanceStore │◀──── Balance query
//! └─────────────┘           └──────────────┘
//!        │ broadcast
//!        ▼
//! ┌────────────────────┐  enqueue  ┌──────────────┐
//! │ SubscriberRegistry │──────────▶│ feed conns   │
//! └────────────────────┘           └──────────────┘
//!        ▲ broadcast
//!        │
//!   feed frames
//! ```

pub mod registry;
pub mod store;

pub use registry::{BroadcastReport, Outbound, SubscriberId, SubscriberRegistry};
pub use store::BalanceStore;
