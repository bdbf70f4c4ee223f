//! # Connection Workers
//!
//! One worker per accepted connection: build the connection's channels,
//! dispatch the registered handler pair for the listener's transport mode,
//! then tear the connection down. A worker runs exactly once; disposal is
//! structurally exactly-once because the worker future owns the socket.
//!
//! The owning listener tracks live workers in a [`WorkerRegistry`] so a
//! shutdown sweep can abort every in-flight exchange; aborting a worker
//! drops its socket, which closes both directions.

use futures::future::{AbortHandle, Abortable};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::handler::{ExchangeHandler, TransportMode};
use crate::transport::channel::DuplexChannel;
use crate::transport::listener::ListenerShared;

/// Live workers for one listener, keyed by worker id.
///
/// Entries are inserted before the worker task is spawned, so a concurrent
/// sweep can never miss a just-accepted connection; a worker's self-removal
/// after normal disposal is a plain idempotent map removal.
pub(crate) struct WorkerRegistry {
    workers: Mutex<HashMap<u64, AbortHandle>>,
    next_id: AtomicU64,
}

impl WorkerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, AbortHandle>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: u64, handle: AbortHandle) {
        self.lock().insert(id, handle);
    }

    pub(crate) fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Abort every live worker and clear the registry in one lock hold.
    /// Swept workers skip self-removal; their sockets close when the
    /// aborted future is dropped.
    pub(crate) fn sweep(&self) {
        let mut workers = self.lock();
        for (id, handle) in workers.drain() {
            debug!(id, "aborting worker");
            handle.abort();
        }
    }
}

/// Handling unit for one accepted socket.
pub(crate) struct ConnectionWorker {
    id: u64,
    peer: SocketAddr,
    mode: TransportMode,
    handler: Arc<dyn ExchangeHandler>,
    shared: Arc<ListenerShared>,
}

impl ConnectionWorker {
    /// Register and start a worker for an accepted connection. Mode, framing
    /// and handler are snapshots taken now; later listener changes do not
    /// affect an in-flight exchange.
    pub(crate) fn spawn(
        shared: Arc<ListenerShared>,
        handler: Arc<dyn ExchangeHandler>,
        stream: TcpStream,
        peer: SocketAddr,
    ) {
        let id = shared.workers.next_id.fetch_add(1, Ordering::Relaxed);
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        shared.workers.insert(id, abort_handle);

        let worker = ConnectionWorker {
            id,
            peer,
            mode: shared.mode,
            handler,
            shared: Arc::clone(&shared),
        };
        tokio::spawn(Abortable::new(worker.run(stream), abort_registration));
    }

    /// Runs exactly once: channels, dispatch, disposal. Dispatch failures are
    /// logged and confined to this connection.
    async fn run(self, stream: TcpStream) {
        debug!(id = self.id, peer = %self.peer, mode = %self.mode, "worker started");

        let (read_half, write_half) = stream.into_split();
        let mut input = DuplexChannel::from_reader(read_half, self.shared.framing)
            .with_read_timeout(self.shared.read_timeout);
        let mut output = DuplexChannel::from_writer(write_half, self.shared.framing);

        if let Err(e) = self.dispatch(&mut input, &mut output).await {
            warn!(id = self.id, peer = %self.peer, error = %e, "exchange failed");
        }

        // Disposal: response direction first so buffered bytes get a flush
        // and a clean shutdown, then the read direction, then the registry.
        output.close().await;
        input.close().await;
        self.shared.workers.remove(self.id);
        debug!(id = self.id, "worker disposed");
    }

    /// Invoke the handler pair for the configured mode, transferring the
    /// input channel's bind value to the output channel in between. The
    /// listener's dispatch lock serializes handler bodies across workers.
    async fn dispatch(&self, input: &mut DuplexChannel, output: &mut DuplexChannel) -> Result<()> {
        let _serialized = self.shared.dispatch_lock.lock().await;
        match self.mode {
            TransportMode::Data => {
                self.handler.on_input_data(input).await?;
                if let Some(bind) = input.take_bind_value() {
                    output.set_bind_value(bind);
                }
                self.handler.on_output_data(output).await?;
            }
            TransportMode::Object => {
                self.handler.on_input_object(input).await?;
                if let Some(bind) = input.take_bind_value() {
                    output.set_bind_value(bind);
                }
                self.handler.on_output_object(output).await?;
            }
        }
        Ok(())
    }
}
