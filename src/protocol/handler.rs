//! Exchange handlers and transport modes.
//!
//! A handler supplies the application half of one request/response exchange.
//! The listener invokes exactly one input/output pair per accepted
//! connection, selected by its configured [`TransportMode`]; the unused pair
//! defaults to a no-op, so implementations override only the pair their
//! listener dispatches.
//!
//! Handler bodies for the same listener never run concurrently: each worker
//! holds the listener's dispatch lock across the whole
//! input-callback / bind-transfer / output-callback sequence. Framing I/O on
//! other connections proceeds outside that lock.

use crate::error::{Error, Result};
use crate::transport::channel::DuplexChannel;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How payloads travel over an accepted connection.
///
/// Selected at listener configuration time; the dispatch over it is
/// exhaustive. Unrecognized mode names fail at parse time with
/// [`Error::UnsupportedMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Raw byte messages with the listener's framing
    #[default]
    Data,
    /// Serialized objects with their own length-prefix framing
    Object,
}

impl TransportMode {
    /// Human-readable name, also the accepted configuration spelling
    pub fn name(self) -> &'static str {
        match self {
            TransportMode::Data => "data",
            TransportMode::Object => "object",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data" => Ok(TransportMode::Data),
            "object" => Ok(TransportMode::Object),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

/// Application callbacks for one request/response exchange.
///
/// The input callback reads the request from its channel; the output
/// callback writes the response to its own. A value attached to the input
/// channel's bind slot is transferred to the output channel between the two
/// calls, so the output side can inspect or re-emit what the input side
/// decoded.
///
/// ## Example
/// ```rust
/// use futures::future::BoxFuture;
/// use netchannel::error::Result;
/// use netchannel::protocol::ExchangeHandler;
/// use netchannel::transport::channel::DuplexChannel;
///
/// struct Echo;
///
/// impl ExchangeHandler for Echo {
///     fn on_input_data<'a>(&'a self, ch: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
///         Box::pin(async move {
///             if let Some(text) = ch.read_string().await? {
///                 ch.set_bind(text);
///             }
///             Ok(())
///         })
///     }
///
///     fn on_output_data<'a>(&'a self, ch: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
///         Box::pin(async move {
///             let text = ch.take_bind::<String>().unwrap_or_default();
///             ch.write_str(&text).await
///         })
///     }
/// }
/// ```
pub trait ExchangeHandler: Send + Sync + 'static {
    /// Read the request from an accepted connection in data mode.
    fn on_input_data<'a>(&'a self, channel: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
        let _ = channel;
        Box::pin(async { Ok(()) })
    }

    /// Write the response for an accepted connection in data mode.
    fn on_output_data<'a>(&'a self, channel: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
        let _ = channel;
        Box::pin(async { Ok(()) })
    }

    /// Read the request from an accepted connection in object mode.
    fn on_input_object<'a>(&'a self, channel: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
        let _ = channel;
        Box::pin(async { Ok(()) })
    }

    /// Write the response for an accepted connection in object mode.
    fn on_output_object<'a>(&'a self, channel: &'a mut DuplexChannel) -> BoxFuture<'a, Result<()>> {
        let _ = channel;
        Box::pin(async { Ok(()) })
    }
}
