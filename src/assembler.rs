//! Reassembly of Diameter frames from arbitrarily chunked input.
//!
//! TCP delivers a byte stream, not messages: one read may carry half a
//! frame, or three frames and the start of a fourth. The assembler
//! accumulates whatever arrives and hands the listener every complete
//! frame as soon as its terminal byte lands, in arrival order.

use std::sync::Arc;

use log::debug;

use crate::{
    framing::{HeaderScan, scan_header},
    listener::ConnectionListener,
    metrics,
    storage::Storage,
};

/// Turns chunked byte arrivals into complete frames for a listener.
///
/// Owned and driven by a single reader; it is not meant to be shared
/// across tasks.
#[derive(Debug)]
pub struct MessageAssembler<L> {
    storage: Storage,
    listener: Arc<L>,
}

impl<L: ConnectionListener> MessageAssembler<L> {
    /// Create an assembler delivering to `listener`, with the given
    /// initial reassembly capacity.
    #[must_use]
    pub fn new(listener: Arc<L>, storage_capacity: usize) -> Self {
        Self {
            storage: Storage::with_capacity(storage_capacity),
            listener,
        }
    }

    /// Number of bytes buffered but not yet formed into a frame.
    #[must_use]
    pub fn buffered(&self) -> usize { self.storage.len() }

    /// Append a chunk and deliver every frame it completes.
    ///
    /// Extraction repeats until the buffer is empty or holds only an
    /// incomplete (or unrecognisable) prefix, so multiple frames
    /// arriving in one chunk are all delivered before this returns.
    pub fn append(&mut self, chunk: &[u8]) {
        self.storage.push(chunk);
        while self.extract_frame() {}
    }

    /// Attempt to extract one frame from the front of the buffer.
    ///
    /// Returns whether a frame was extracted; the caller loops on
    /// `true`. A version mismatch or an impossible length field stalls
    /// extraction without consuming bytes or raising — the buffered
    /// prefix simply never completes.
    fn extract_frame(&mut self) -> bool {
        if self.storage.is_empty() {
            return false;
        }
        let length = match scan_header(self.storage.as_slice()) {
            HeaderScan::Underflow => {
                debug!("buffer underflow, waiting for more data");
                return false;
            }
            HeaderScan::VersionMismatch { version } => {
                debug!("version byte is [{version}], not Diameter framing, ignoring");
                return false;
            }
            HeaderScan::BadLength { length } => {
                debug!("message length [{length}] is below the header size, ignoring");
                return false;
            }
            HeaderScan::Length(length) => length,
        };
        if self.storage.len() < length {
            debug!(
                "received partial message, waiting for remaining (expected: {length} bytes, got \
                 {} bytes)",
                self.storage.len()
            );
            return false;
        }

        let frame = self.storage.take_front(length);
        metrics::inc_frames(metrics::Direction::Inbound);
        if let Err(error) = self.listener.on_message_received(frame) {
            // The stream position can no longer be trusted; drop any
            // bytes of whatever came after the bad frame as well.
            debug!(
                "garbage was received, discarding {} buffered bytes",
                self.storage.len()
            );
            self.storage.clear();
            metrics::inc_errors();
            self.listener.on_avp_data_error(error);
        }
        true
    }
}
