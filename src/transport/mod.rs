//! # Transport Layer
//!
//! TCP plumbing for single-exchange request/response connections.
//!
//! ## Components
//! - **Channel**: duplex byte I/O with stop-byte or heuristic framing
//! - **Endpoint**: outbound connection with connect/read timeouts
//! - **Listener**: bind/accept loop spawning one worker per connection
//! - **Worker**: per-connection dispatch and teardown unit
//!
//! Every accepted connection performs exactly one exchange and is then torn
//! down; there is no persistent multiplexed connection protocol.

pub mod channel;
pub mod endpoint;
pub mod listener;
pub(crate) mod worker;

pub use channel::{BindValue, DuplexChannel};
pub use endpoint::Endpoint;
pub use listener::Listener;
