//! TCP peer transport with an explicit connection lifecycle.
//!
//! A [`TcpTransport`] owns exactly one stream socket at a time. Inbound
//! bytes are pulled by a dedicated read task and fed to the
//! [`MessageAssembler`]; outbound writes go through a mutex so no two
//! senders interleave their bytes. The read and write directions are
//! never mutually exclusive with each other — the connection is
//! full-duplex by design.
//!
//! Lifecycle: configure addresses and a listener, then `initialize` (or
//! `initialize_accepted` for a socket handed over by an acceptor),
//! `start`, and eventually `stop` or `release`. Each step validates its
//! own preconditions and reports the specific missing piece via
//! [`NotInitialized`].

use std::{io, net::SocketAddr, sync::Arc};

use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::{
        TcpSocket,
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{
    assembler::MessageAssembler,
    config::TransportConfig,
    error::{NotInitialized, TransportError},
    listener::ConnectionListener,
    metrics,
};

type SharedWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// Why a connection's read loop exited.
///
/// All variants drive the identical cleanup path; the distinction
/// exists for logs and tests, not for divergent behaviour.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The peer shut the stream down; a read returned zero bytes.
    PeerClosed,
    /// `stop` (or `release`) cancelled the loop.
    Cancelled,
    /// A read call failed.
    Failed(io::Error),
}

struct ReadTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Client-side transport for a single Diameter peer connection.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use bytes::Bytes;
/// use diawire::{
///     config::TransportConfig,
///     error::AvpDataError,
///     listener::ConnectionListener,
///     transport::TcpTransport,
/// };
///
/// struct Peer;
///
/// impl ConnectionListener for Peer {
///     fn on_message_received(&self, message: Bytes) -> Result<(), AvpDataError> {
///         println!("got {} bytes", message.len());
///         Ok(())
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), diawire::error::TransportError> {
/// let mut transport = TcpTransport::new(TransportConfig::default());
/// transport.set_listener(Arc::new(Peer));
/// transport.set_destination("192.0.2.1:3868".parse().expect("valid address"));
/// transport.initialize().await?;
/// transport.start()?;
/// transport.send(&[1, 0, 0, 4]).await?;
/// transport.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct TcpTransport<L> {
    config: TransportConfig,
    listener: Option<Arc<L>>,
    origin: Option<SocketAddr>,
    destination: Option<SocketAddr>,
    peer_label: Option<String>,
    reader: Option<OwnedReadHalf>,
    writer: SharedWriter,
    read_task: Option<ReadTask>,
}

impl<L: ConnectionListener> TcpTransport<L> {
    /// Create an unconfigured transport.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            listener: None,
            origin: None,
            destination: None,
            peer_label: None,
            reader: None,
            writer: Arc::new(Mutex::new(None)),
            read_task: None,
        }
    }

    /// Attach the listener notified of connection events.
    pub fn set_listener(&mut self, listener: Arc<L>) { self.listener = Some(listener); }

    /// Set the peer address to connect to.
    pub fn set_destination(&mut self, address: SocketAddr) {
        debug!("destination address is set to [{address}]");
        self.destination = Some(address);
    }

    /// The configured peer address, if any.
    #[must_use]
    pub fn destination(&self) -> Option<SocketAddr> { self.destination }

    /// Set the local address to bind before connecting.
    pub fn set_origin(&mut self, address: SocketAddr) {
        debug!("origin address is set to [{address}]");
        self.origin = Some(address);
    }

    /// The configured local bind address, if any.
    #[must_use]
    pub fn origin(&self) -> Option<SocketAddr> { self.origin }

    /// Whether the transport currently holds a usable connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        if let Some(task) = &self.read_task
            && !task.handle.is_finished()
        {
            return true;
        }
        self.reader
            .as_ref()
            .is_some_and(|half| half.peer_addr().is_ok())
    }

    /// Open a socket and connect to the configured destination.
    ///
    /// Applies the configured socket options, binds the origin address
    /// when one is set, connects, and fires the listener's
    /// `on_connected` hook.
    ///
    /// # Errors
    ///
    /// [`NotInitialized::DestinationUnset`] when no destination address
    /// has been configured; otherwise any I/O error from opening,
    /// binding, or connecting the socket.
    pub async fn initialize(&mut self) -> Result<(), TransportError> {
        debug!(
            "initialising transport, origin address is [{:?}] and destination address is [{:?}]",
            self.origin, self.destination
        );
        let destination = self
            .destination
            .ok_or(NotInitialized::DestinationUnset)?;
        let socket = if destination.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        self.config.socket_options_value().apply(&socket)?;
        if let Some(origin) = self.origin {
            socket.bind(origin)?;
        }
        let stream = socket.connect(destination).await?;
        self.adopt_stream(stream, destination);
        if let Some(listener) = &self.listener {
            listener.on_connected();
        }
        Ok(())
    }

    /// Adopt a stream already connected by an external acceptor.
    ///
    /// The destination address is derived from the peer. No
    /// `on_connected` callback fires; the acceptor already observed the
    /// connection being established.
    ///
    /// # Errors
    ///
    /// Any I/O error from querying the stream's peer address.
    pub fn initialize_accepted(&mut self, stream: TcpStream) -> Result<(), TransportError> {
        let peer = stream.peer_addr()?;
        debug!("initialising transport for an accepted socket on [{peer}]");
        self.destination = Some(peer);
        self.adopt_stream(stream, peer);
        Ok(())
    }

    fn adopt_stream(&mut self, stream: TcpStream, peer: SocketAddr) {
        self.peer_label = Some(match stream.local_addr() {
            Ok(local) => format!("{local} -> {peer}"),
            Err(_) => peer.to_string(),
        });
        let (read_half, write_half) = stream.into_split();
        self.reader = Some(read_half);
        // A fresh writer slot per connection: senders cloned off the
        // previous connection keep failing instead of writing here.
        self.writer = Arc::new(Mutex::new(Some(write_half)));
    }

    /// Launch the read task. A no-op when it is already running.
    ///
    /// # Errors
    ///
    /// [`NotInitialized::SocketMissing`] when no socket has been
    /// initialised (or it was consumed by a previous run),
    /// [`NotInitialized::SocketNotConnected`] when the socket lost its
    /// peer, and [`NotInitialized::ListenerMissing`] when no listener
    /// is attached.
    pub fn start(&mut self) -> Result<(), TransportError> {
        debug!("starting transport, socket is [{}]", self.label());
        if let Some(task) = &self.read_task
            && !task.handle.is_finished()
        {
            return Ok(());
        }
        match &self.reader {
            None => return Err(NotInitialized::SocketMissing.into()),
            Some(half) if half.peer_addr().is_err() => {
                return Err(NotInitialized::SocketNotConnected.into());
            }
            Some(_) => {}
        }
        let listener = self
            .listener
            .clone()
            .ok_or(NotInitialized::ListenerMissing)?;
        let Some(reader) = self.reader.take() else {
            return Err(NotInitialized::SocketMissing.into());
        };

        let cancel = CancellationToken::new();
        let assembler = MessageAssembler::new(Arc::clone(&listener), self.config.storage_size_value());
        let handle = tokio::spawn(read_loop(
            reader,
            Arc::clone(&self.writer),
            listener,
            assembler,
            cancel.clone(),
            self.config.recv_buffer_size_value(),
            self.label().to_owned(),
        ));
        self.read_task = Some(ReadTask { handle, cancel });
        Ok(())
    }

    /// Stop the read task and close the socket. Idempotent.
    ///
    /// Cancellation unblocks a pending read; the task is then awaited
    /// for at most the configured stop timeout. A task that fails to
    /// exit in time is left to finish on its own — it is logged, not
    /// killed, and not an error.
    pub async fn stop(&mut self) {
        debug!("stopping transport, socket is [{}]", self.label());
        if let Some(task) = self.read_task.take() {
            task.cancel.cancel();
            let wait = self.config.stop_timeout_value();
            match timeout(wait, task.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_error)) => warn!("read task ended abnormally: {join_error}"),
                Err(_) => warn!("read task did not stop within {wait:?}"),
            }
        }
        self.close_idle_socket().await;
        debug!("transport is stopped, socket is [{}]", self.label());
    }

    /// Stop the transport and forget the destination address.
    ///
    /// The transport cannot reconnect until it is configured and
    /// initialised again.
    pub async fn release(&mut self) {
        self.stop().await;
        self.destination = None;
    }

    /// Write a complete message to the peer.
    ///
    /// The write lock is held for the duration of this one call and
    /// released on every path, success or failure. No ordering is
    /// guaranteed across concurrently blocked senders.
    ///
    /// # Errors
    ///
    /// [`NotInitialized::SocketMissing`] when there is no live write
    /// half (never initialised, already disconnected, or released);
    /// otherwise the underlying I/O error.
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        debug!(
            "about to send [{}] bytes over the socket [{}]",
            payload.len(),
            self.label()
        );
        self.sender().send(payload).await?;
        debug!(
            "sent [{}] bytes over the socket [{}]",
            payload.len(),
            self.label()
        );
        Ok(())
    }

    /// A clonable handle for writing to the current connection.
    ///
    /// Handles share the transport's write lock, so sends through any
    /// number of clones never interleave. A handle is bound to the
    /// connection live at creation time; obtain a fresh one after
    /// re-initialising.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        MessageSender {
            writer: Arc::clone(&self.writer),
        }
    }

    fn label(&self) -> &str { self.peer_label.as_deref().unwrap_or("<not connected>") }

    /// Close socket halves still held by the transport itself, for the
    /// case where the read task never ran (initialised but not
    /// started). Best-effort; failures are logged only.
    async fn close_idle_socket(&mut self) {
        if let Some(reader) = self.reader.take() {
            drop(reader);
        }
        if let Ok(mut guard) = self.writer.try_lock() {
            if let Some(mut write_half) = guard.take() {
                if let Err(error) = write_half.shutdown().await {
                    debug!("error closing socket [{}]: {error}", self.label());
                }
            }
        }
    }
}

/// Clonable write handle serialising message sends on one connection.
#[derive(Clone, Debug)]
pub struct MessageSender {
    writer: SharedWriter,
}

impl MessageSender {
    /// Write a complete message to the peer.
    ///
    /// # Errors
    ///
    /// [`NotInitialized::SocketMissing`] when the connection this
    /// handle was created from is gone; otherwise the underlying I/O
    /// error.
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(NotInitialized::SocketMissing.into());
        };
        if let Err(error) = writer.write_all(payload).await {
            debug!("unable to send message: {error}");
            return Err(error.into());
        }
        writer.flush().await?;
        Ok(())
    }
}

async fn read_loop<L: ConnectionListener>(
    mut reader: OwnedReadHalf,
    writer: SharedWriter,
    listener: Arc<L>,
    mut assembler: MessageAssembler<L>,
    cancel: CancellationToken,
    recv_buffer_size: usize,
    label: String,
) {
    debug!("transport is started, socket is [{label}]");
    metrics::inc_connections();
    let outcome = drive_reads(&mut reader, &mut assembler, &cancel, recv_buffer_size).await;
    match &outcome {
        ReadOutcome::PeerClosed => debug!("peer closed the stream on [{label}]"),
        ReadOutcome::Cancelled => debug!("read loop cancelled on [{label}]"),
        ReadOutcome::Failed(error) => {
            // Emit via both `log` and `tracing` for consumers that capture either.
            debug!("transport exception on [{label}]: {error}");
            tracing::debug!(%error, socket = %label, "read loop failed");
        }
    }

    // Best-effort cleanup: close whichever socket halves are reachable,
    // then notify. Secondary failures must not mask the loop outcome.
    match writer.try_lock() {
        Ok(mut guard) => {
            if let Some(mut write_half) = guard.take() {
                if let Err(error) = write_half.shutdown().await {
                    debug!("error closing socket [{label}]: {error}");
                }
            }
        }
        Err(_) => debug!("write half busy during cleanup on [{label}]"),
    }
    drop(reader);
    listener.on_disconnect();
    metrics::dec_connections();
    info!("read task is stopped for socket [{label}]");
}

/// Pull bytes into a fixed buffer and feed the assembler until the
/// stream ends, the token cancels, or a read fails.
///
/// The receive buffer is allocated once at `recv_buffer_size` and never
/// grows; accumulation across reads is the assembler's job.
pub(crate) async fn drive_reads<R, L>(
    reader: &mut R,
    assembler: &mut MessageAssembler<L>,
    cancel: &CancellationToken,
    recv_buffer_size: usize,
) -> ReadOutcome
where
    R: AsyncRead + Unpin,
    L: ConnectionListener,
{
    let mut buf = vec![0u8; recv_buffer_size];
    loop {
        tokio::select! {
            () = cancel.cancelled() => return ReadOutcome::Cancelled,
            read = reader.read(&mut buf) => match read {
                Ok(0) => return ReadOutcome::PeerClosed,
                Ok(count) => {
                    debug!("just read [{count}] bytes");
                    assembler.append(&buf[..count]);
                }
                Err(error) => return ReadOutcome::Failed(error),
            },
        }
    }
}
