//! # Listener
//!
//! Long-lived acceptor for single-exchange connections.
//!
//! A listener binds a server socket, runs one sequential accept loop, and
//! spawns one connection worker task per accepted connection, unbounded,
//! with no pooling or admission control.
//! Framing configuration and transport mode are fixed at construction and
//! inherited unchanged by every channel the listener produces.
//!
//! ## Lifecycle
//! `Unbound → Bound → Closed`. Binding port 0 records the OS-assigned port.
//! `close` sweeps every live worker, stops the accept loop and closes the
//! server socket; a closed listener cannot be rebound.
//!
//! ## Serialization
//! Handler bodies are serialized per listener through a dedicated dispatch
//! lock: an exchange's input and output callbacks run as one critical
//! section, while accept and framing I/O on other connections stay
//! concurrent.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::config::{FramingConfig, ListenerConfig};
use crate::error::{Error, Result};
use crate::protocol::handler::{ExchangeHandler, TransportMode};
use crate::transport::worker::{ConnectionWorker, WorkerRegistry};

/// State shared between a listener, its accept loop, and its workers.
pub(crate) struct ListenerShared {
    pub(crate) framing: FramingConfig,
    pub(crate) mode: TransportMode,
    pub(crate) read_timeout: Duration,
    pub(crate) handler: RwLock<Option<Arc<dyn ExchangeHandler>>>,
    /// Single-slot critical section around handler invocation
    pub(crate) dispatch_lock: tokio::sync::Mutex<()>,
    pub(crate) workers: WorkerRegistry,
    pub(crate) stopping: AtomicBool,
}

enum State {
    Unbound,
    Bound {
        local_addr: SocketAddr,
        accept_task: JoinHandle<()>,
        shutdown_tx: mpsc::Sender<()>,
    },
    Closed,
}

/// A bound server socket accepting single-exchange connections.
pub struct Listener {
    port: u16,
    backlog: u32,
    shared: Arc<ListenerShared>,
    state: State,
}

impl Listener {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            port: config.port,
            backlog: config.backlog,
            shared: Arc::new(ListenerShared {
                framing: config.framing,
                mode: config.mode,
                read_timeout: config.read_timeout,
                handler: RwLock::new(None),
                dispatch_lock: tokio::sync::Mutex::new(()),
                workers: WorkerRegistry::new(),
                stopping: AtomicBool::new(false),
            }),
            state: State::Unbound,
        }
    }

    /// Register the handler invoked for every accepted connection.
    /// Connections accepted while no handler is registered are rejected.
    pub fn set_handler(&self, handler: Arc<dyn ExchangeHandler>) {
        *self
            .shared
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Unregister the handler; subsequent connections are rejected.
    pub fn clear_handler(&self) {
        *self
            .shared
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn mode(&self) -> TransportMode {
        self.shared.mode
    }

    pub fn framing(&self) -> FramingConfig {
        self.shared.framing
    }

    /// The bound address, once open. Port 0 requests resolve here.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.state {
            State::Bound { local_addr, .. } => Some(local_addr),
            _ => None,
        }
    }

    /// Number of connections currently being handled.
    pub fn active_workers(&self) -> usize {
        self.shared.workers.len()
    }

    /// Bind the server socket and start the accept loop.
    ///
    /// Fails with `AlreadyBound` when already open and `ConnectionClosed`
    /// once closed (a closed listener cannot be rebound).
    #[instrument(skip(self), fields(port = self.port))]
    pub async fn open(&mut self) -> Result<SocketAddr> {
        match self.state {
            State::Bound { .. } => return Err(Error::AlreadyBound),
            State::Closed => return Err(Error::ConnectionClosed),
            State::Unbound => {}
        }

        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)))?;
        let listener = socket.listen(self.backlog)?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&self.shared), shutdown_rx));

        self.state = State::Bound {
            local_addr,
            accept_task,
            shutdown_tx,
        };
        info!(%local_addr, "listener bound");
        Ok(local_addr)
    }

    /// Stop accepting and tear down every live connection.
    ///
    /// Four independent best-effort steps: sweep the worker registry, signal
    /// the accept loop, abort it (dropping the server socket closes it), and
    /// mark the listener closed. Fails with `NotBound` unless currently open.
    pub async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Unbound => {
                self.state = State::Unbound;
                Err(Error::NotBound)
            }
            State::Closed => Err(Error::NotBound),
            State::Bound {
                local_addr,
                accept_task,
                shutdown_tx,
            } => {
                self.shared.stopping.store(true, Ordering::SeqCst);
                self.shared.workers.sweep();
                let _ = shutdown_tx.try_send(());
                accept_task.abort();
                let _ = accept_task.await;
                info!(%local_addr, "listener closed");
                Ok(())
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let State::Bound { accept_task, .. } = &self.state {
            self.shared.stopping.store(true, Ordering::SeqCst);
            self.shared.workers.sweep();
            accept_task.abort();
        }
    }
}

/// Sequential accept loop: rejected connections are dropped, accept errors
/// are logged and the loop continues, a shutdown signal terminates it.
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<ListenerShared>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("accept loop stopping");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        if shared.stopping.load(Ordering::SeqCst) {
                            debug!(%peer, "rejecting connection: listener stopping");
                            continue;
                        }
                        let handler = shared
                            .handler
                            .read()
                            .unwrap_or_else(PoisonError::into_inner)
                            .clone();
                        match handler {
                            Some(handler) => {
                                ConnectionWorker::spawn(Arc::clone(&shared), handler, stream, peer);
                            }
                            None => {
                                debug!(%peer, "rejecting connection: no handler registered");
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "error accepting connection");
                    }
                }
            }
        }
    }
}
