//! Callbacks through which a transport reports connection events.

use bytes::Bytes;

use crate::error::AvpDataError;

/// Observer for the lifecycle and traffic of a single peer connection.
///
/// The transport invokes these callbacks synchronously from whichever
/// task drives the event: `on_connected` from the caller of
/// `initialize`, the rest from the connection's read task. Implementors
/// should hand heavy work off rather than blocking the read path.
pub trait ConnectionListener: Send + Sync + 'static {
    /// The transport opened and connected its socket (connect-mode only;
    /// adopted sockets were already connected by their acceptor).
    fn on_connected(&self) {}

    /// A complete frame arrived, header included.
    ///
    /// # Errors
    ///
    /// Return [`AvpDataError`] when the payload cannot be decoded. The
    /// transport then discards *all* buffered bytes, not just this
    /// frame, and reports the failure via
    /// [`on_avp_data_error`](Self::on_avp_data_error) — once framing has
    /// produced garbage, resynchronising mid-stream is not trusted.
    fn on_message_received(&self, message: Bytes) -> Result<(), AvpDataError>;

    /// A decode failure was reported and the reassembly buffer has
    /// already been dropped.
    fn on_avp_data_error(&self, _error: AvpDataError) {}

    /// The read loop terminated. Fired exactly once per started
    /// connection, whatever the cause: peer close, cancellation via
    /// `stop`, or an I/O failure.
    fn on_disconnect(&self) {}
}
