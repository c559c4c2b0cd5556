//! Transport configuration types.
//!
//! [`TransportConfig`] carries the tunables of a single peer connection:
//! buffer sizes, the bounded wait on `stop`, and the socket options
//! applied before connecting. Defaults match the values the protocol
//! stack has always shipped with.

use std::{io, time::Duration};

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpSocket;

/// Default size of the fixed receive buffer in bytes.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1024;

/// Default initial capacity of the reassembly buffer in bytes.
pub const DEFAULT_STORAGE_SIZE: usize = 2048;

/// Default bounded wait for the read task to exit during `stop`.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(100);

/// Tunables for a [`TcpTransport`](crate::transport::TcpTransport).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use diawire::config::TransportConfig;
///
/// let config = TransportConfig::default()
///     .storage_size(8192)
///     .stop_timeout(Duration::from_millis(250));
/// assert_eq!(config.storage_size_value(), 8192);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    recv_buffer_size: usize,
    storage_size: usize,
    stop_timeout: Duration,
    socket_options: SocketOptions,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            storage_size: DEFAULT_STORAGE_SIZE,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            socket_options: SocketOptions::default(),
        }
    }
}

impl TransportConfig {
    /// Set the fixed receive buffer size. The receive buffer is
    /// allocated per started connection and never grows.
    #[must_use]
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set the initial reassembly buffer capacity. The buffer grows on
    /// demand; this only sizes the first allocation.
    #[must_use]
    pub fn storage_size(mut self, size: usize) -> Self {
        self.storage_size = size;
        self
    }

    /// Set the bounded wait for the read task to exit during `stop`.
    #[must_use]
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the socket options applied before connecting.
    #[must_use]
    pub fn socket_options(mut self, options: SocketOptions) -> Self {
        self.socket_options = options;
        self
    }

    /// Configured receive buffer size.
    #[must_use]
    pub fn recv_buffer_size_value(&self) -> usize { self.recv_buffer_size }

    /// Configured initial reassembly capacity.
    #[must_use]
    pub fn storage_size_value(&self) -> usize { self.storage_size }

    /// Configured `stop` wait.
    #[must_use]
    pub fn stop_timeout_value(&self) -> Duration { self.stop_timeout }

    /// Configured socket options.
    #[must_use]
    pub fn socket_options_value(&self) -> SocketOptions { self.socket_options }
}

/// Socket options applied before connecting.
///
/// Unset fields leave the OS defaults untouched. Diameter peers
/// conventionally enable `TCP_NODELAY`; watchdog traffic (DWR/DWA) is
/// latency-sensitive and small.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use diawire::config::SocketOptions;
///
/// let options = SocketOptions::default()
///     .nodelay(true)
///     .keepalive(Some(Duration::from_secs(30)));
/// let expected = SocketOptions::default()
///     .nodelay(true)
///     .keepalive(Some(Duration::from_secs(30)));
/// assert_eq!(options, expected);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketOptions {
    nodelay: Option<bool>,
    keepalive: Option<KeepAliveSetting>,
    linger: Option<LingerSetting>,
    send_buffer_size: Option<u32>,
    recv_buffer_size: Option<u32>,
    reuseaddr: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeepAliveSetting {
    Disabled,
    Duration(Duration),
}

impl KeepAliveSetting {
    const fn to_option(self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::Duration(value) => Some(value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LingerSetting {
    Disabled,
    Duration(Duration),
}

impl LingerSetting {
    const fn to_option(self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::Duration(value) => Some(value),
        }
    }
}

impl SocketOptions {
    /// Configure `TCP_NODELAY` behaviour on the socket.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = Some(enabled);
        self
    }

    /// Configure `SO_KEEPALIVE` behaviour on the socket.
    #[must_use]
    pub fn keepalive(mut self, duration: Option<Duration>) -> Self {
        self.keepalive = Some(match duration {
            Some(value) => KeepAliveSetting::Duration(value),
            None => KeepAliveSetting::Disabled,
        });
        self
    }

    /// Configure TCP linger settings on the socket.
    #[must_use]
    pub fn linger(mut self, duration: Option<Duration>) -> Self {
        self.linger = Some(match duration {
            Some(value) => LingerSetting::Duration(value),
            None => LingerSetting::Disabled,
        });
        self
    }

    /// Configure the socket send buffer size.
    #[must_use]
    pub fn send_buffer_size(mut self, size: u32) -> Self {
        self.send_buffer_size = Some(size);
        self
    }

    /// Configure the socket receive buffer size.
    #[must_use]
    pub fn recv_buffer_size(mut self, size: u32) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    /// Configure `SO_REUSEADDR` behaviour, useful when binding a fixed
    /// origin address across reconnects.
    #[must_use]
    pub fn reuseaddr(mut self, enabled: bool) -> Self {
        self.reuseaddr = Some(enabled);
        self
    }

    pub(crate) fn apply(&self, socket: &TcpSocket) -> io::Result<()> {
        if let Some(enabled) = self.nodelay {
            socket.set_nodelay(enabled)?;
        }
        self.apply_keepalive(socket)?;
        if let Some(linger) = self.linger {
            socket.set_linger(linger.to_option())?;
        }
        if let Some(size) = self.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        if let Some(size) = self.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(enabled) = self.reuseaddr {
            socket.set_reuseaddr(enabled)?;
        }
        Ok(())
    }

    fn apply_keepalive(&self, socket: &TcpSocket) -> io::Result<()> {
        if let Some(keepalive) = self.keepalive {
            match keepalive.to_option() {
                Some(duration) => {
                    socket.set_keepalive(true)?;
                    let sock_ref = SockRef::from(socket);
                    let config = TcpKeepalive::new().with_time(duration);
                    sock_ref.set_tcp_keepalive(&config)?;
                }
                None => {
                    socket.set_keepalive(false)?;
                }
            }
        }
        Ok(())
    }
}
