//! # netchannel
//!
//! Single-exchange TCP request/response channels with stop-byte framing.
//!
//! A [`Listener`] accepts connections and runs exactly one request/response
//! exchange per connection through a registered [`ExchangeHandler`]; an
//! [`Endpoint`] opens the client side of the same exchange. Both ends speak
//! through [`DuplexChannel`], which frames messages with a configurable stop
//! byte (default ASCII EOT) or, for trusted local peers, a
//! stream-availability heuristic, and also carries a length-prefixed
//! serialized-object path for serde payloads.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use futures::future::BoxFuture;
//! use netchannel::config::{EndpointConfig, ListenerConfig};
//! use netchannel::error::Result;
//! use netchannel::protocol::ExchangeHandler;
//! use netchannel::transport::channel::DuplexChannel;
//! use netchannel::{Endpoint, Listener};
//!
//! struct Greeter;
//!
//! impl ExchangeHandler for Greeter {
//!     fn on_input_data<'a>(&'a self, ch: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
//!         Box::pin(async move {
//!             let name = ch.read_string().await?.unwrap_or_default();
//!             ch.set_bind(name);
//!             Ok(())
//!         })
//!     }
//!
//!     fn on_output_data<'a>(&'a self, ch: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
//!         Box::pin(async move {
//!             let name = ch.take_bind::<String>().unwrap_or_default();
//!             ch.write_str(&format!("hello, {name}")).await
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut listener = Listener::new(ListenerConfig::default());
//!     listener.set_handler(Arc::new(Greeter));
//!     let addr = listener.open().await?;
//!
//!     let mut endpoint =
//!         Endpoint::connect(EndpointConfig::to_addr("127.0.0.1", addr.port())).await?;
//!     endpoint.channel()?.write_str("world").await?;
//!     let reply = endpoint.channel()?.read_string().await?;
//!     assert_eq!(reply.as_deref(), Some("hello, world"));
//!
//!     endpoint.close().await;
//!     listener.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency Model
//! One accept task per listener, one task per accepted connection, no
//! pooling and no admission control. Handler bodies for the same listener
//! are serialized through a dispatch lock; framing I/O across connections
//! stays concurrent.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::{EndpointConfig, FramingConfig, ListenerConfig, NetConfig};
pub use error::{Error, Result};
pub use protocol::{ExchangeHandler, TransportMode};
pub use transport::{DuplexChannel, Endpoint, Listener};
