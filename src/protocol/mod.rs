//! # Exchange Protocol
//!
//! The handler boundary between the transport and application code.
//!
//! A listener is configured with a [`TransportMode`] and a registered
//! [`ExchangeHandler`]; each accepted connection performs exactly one
//! request/response exchange through the handler pair that mode selects.

pub mod handler;

pub use handler::{ExchangeHandler, TransportMode};
