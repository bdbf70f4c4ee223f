//! # Endpoint
//!
//! An actively-opened outbound connection.
//!
//! An endpoint connects to a remote listener under a connect timeout and
//! exposes the resulting socket as one full-duplex [`DuplexChannel`] with an
//! explicit open/close lifecycle: `Unopened → Open → Closed`, one way only.

use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::transport::channel::DuplexChannel;
use crate::utils::timeout::with_timeout;
use std::time::Duration;

enum State {
    Unopened,
    Open(DuplexChannel),
    Closed,
}

/// Outbound connection to a remote address/port.
pub struct Endpoint {
    config: EndpointConfig,
    state: State,
}

impl Endpoint {
    /// An endpoint that has not connected yet.
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            state: State::Unopened,
        }
    }

    /// Construct and open in one call.
    pub async fn connect(config: EndpointConfig) -> Result<Self> {
        let mut endpoint = Self::new(config);
        endpoint.open().await?;
        Ok(endpoint)
    }

    /// Bound on the connection attempt. Takes effect at the next `open`;
    /// no retroactive effect on a live socket.
    pub fn set_connect_timeout(&mut self, connect_timeout: Duration) {
        self.config.connect_timeout = connect_timeout;
    }

    /// Bound on each read of the open channel. Takes effect at the next
    /// `open`; no retroactive effect on a live socket.
    pub fn set_read_timeout(&mut self, read_timeout: Duration) {
        self.config.read_timeout = read_timeout;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Connect to the configured remote under the connect timeout.
    ///
    /// Fails with `AlreadyOpen` when already connected and with
    /// `ConnectionClosed` once closed (a closed endpoint cannot reconnect).
    #[instrument(skip(self), fields(address = %self.config.address, port = self.config.port))]
    pub async fn open(&mut self) -> Result<()> {
        match self.state {
            State::Open(_) => return Err(Error::AlreadyOpen),
            State::Closed => return Err(Error::ConnectionClosed),
            State::Unopened => {}
        }

        let target = (self.config.address.as_str(), self.config.port);
        let stream = with_timeout(self.config.connect_timeout, async {
            Ok(TcpStream::connect(target).await?)
        })
        .await?;

        let (read_half, write_half) = stream.into_split();
        let channel = DuplexChannel::new(read_half, write_half, self.config.framing)
            .with_read_timeout(self.config.read_timeout);
        self.state = State::Open(channel);
        debug!("endpoint connected");
        Ok(())
    }

    /// The open connection's channel, or `ConnectionClosed`.
    pub fn channel(&mut self) -> Result<&mut DuplexChannel> {
        match &mut self.state {
            State::Open(channel) => Ok(channel),
            _ => Err(Error::ConnectionClosed),
        }
    }

    /// Flush pending writes best-effort, close the socket, and become
    /// permanently closed. Safe to call in any state, including when `open`
    /// never succeeded; idempotent.
    pub async fn close(&mut self) {
        if let State::Open(mut channel) = std::mem::replace(&mut self.state, State::Closed) {
            let _ = channel.flush().await;
            channel.close().await;
        }
    }
}
