//! Error types for the transport layer.
//!
//! Configuration problems (`NotInitialized`) are distinguished from
//! transport I/O failures so callers can tell "you forgot a lifecycle
//! step" apart from "the network failed". Content-decode failures are
//! reported *by* the listener, not generated here, and travel as
//! [`AvpDataError`].

use std::io;

use thiserror::Error;

/// A lifecycle precondition that was not met.
///
/// Each variant names the specific missing piece so the offending call
/// site can be identified from the error alone.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum NotInitialized {
    /// `initialize` was called before a destination address was set.
    #[error("destination address is not set")]
    DestinationUnset,
    /// No socket exists; the transport was never initialised, or it has
    /// already been torn down.
    #[error("transport is not initialised")]
    SocketMissing,
    /// A socket exists but is no longer connected to a peer.
    #[error("socket is not connected")]
    SocketNotConnected,
    /// `start` was called with no [`ConnectionListener`] attached.
    ///
    /// [`ConnectionListener`]: crate::listener::ConnectionListener
    #[error("no connection listener is set")]
    ListenerMissing,
}

/// Errors surfaced by transport lifecycle and send operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A lifecycle precondition was not met.
    #[error("transport not initialised: {0}")]
    NotInitialized(#[from] NotInitialized),
    /// The underlying socket operation failed.
    #[error("transport I/O failure: {0}")]
    Io(#[from] io::Error),
}

/// A payload the listener judged undecodable.
///
/// The transport itself never inspects message bodies; this error exists
/// so [`ConnectionListener::on_message_received`] can reject a frame whose
/// AVP content cannot be parsed. On receipt the transport discards every
/// buffered byte rather than attempting to resynchronise mid-stream.
///
/// [`ConnectionListener::on_message_received`]:
///     crate::listener::ConnectionListener::on_message_received
#[derive(Debug, Error)]
#[error("failed to decode AVP data: {reason}")]
pub struct AvpDataError {
    reason: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AvpDataError {
    /// Create an error from a reason message alone.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create an error wrapping the underlying decode failure.
    #[must_use]
    pub fn with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// The reason message supplied at construction.
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }
}
