//! Shared utilities for integration tests.
//!
//! Provides the recording listener used to observe transport events and
//! a helper for building encoded Diameter frames.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use bytes::Bytes;
use diawire::{AvpDataError, ConnectionListener, framing::encode_header};

/// Canonical result alias for test bodies.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Install a tracing subscriber honouring `RUST_LOG`, once per binary.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Encode one Diameter frame around `body`: 4-byte header plus body.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let total = body.len() + diawire::FRAME_HEADER_LEN;
    let header = encode_header(total).expect("body length must fit a 24-bit frame");
    let mut encoded = header.to_vec();
    encoded.extend_from_slice(body);
    encoded
}

/// Listener recording every event the transport reports.
#[derive(Debug, Default)]
pub struct RecordingListener {
    frames: Mutex<Vec<Bytes>>,
    decode_errors: Mutex<Vec<String>>,
    connected: AtomicUsize,
    disconnected: AtomicUsize,
    reject_next: AtomicBool,
}

impl RecordingListener {
    /// Make the listener reject the next delivered frame as
    /// undecodable AVP content.
    pub fn reject_next_frame(&self) { self.reject_next.store(true, Ordering::SeqCst); }

    /// Frames accepted so far, in delivery order.
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().expect("frames lock poisoned").clone()
    }

    /// Reasons of decode failures reported back so far.
    pub fn decode_errors(&self) -> Vec<String> {
        self.decode_errors
            .lock()
            .expect("decode-errors lock poisoned")
            .clone()
    }

    /// Number of `on_connected` callbacks observed.
    pub fn connected_count(&self) -> usize { self.connected.load(Ordering::SeqCst) }

    /// Number of `on_disconnect` callbacks observed.
    pub fn disconnected_count(&self) -> usize { self.disconnected.load(Ordering::SeqCst) }
}

impl ConnectionListener for RecordingListener {
    fn on_connected(&self) { self.connected.fetch_add(1, Ordering::SeqCst); }

    fn on_message_received(&self, message: Bytes) -> Result<(), AvpDataError> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(AvpDataError::new("unparseable AVP set"));
        }
        self.frames
            .lock()
            .expect("frames lock poisoned")
            .push(message);
        Ok(())
    }

    fn on_avp_data_error(&self, error: AvpDataError) {
        self.decode_errors
            .lock()
            .expect("decode-errors lock poisoned")
            .push(error.reason().to_owned());
    }

    fn on_disconnect(&self) { self.disconnected.fetch_add(1, Ordering::SeqCst); }
}
