//! Diameter frame header parsing and encoding.
//!
//! Every Diameter message starts with a fixed four-byte header: one
//! version byte that MUST be 1 (RFC 6733, section 3) followed by a
//! 24-bit big-endian message length counting the header itself. Framing
//! over a byte stream relies entirely on this prefix; there is no magic
//! number and no checksum.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Version    |                 Message Length                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

/// Length of the version + message-length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// The only protocol version this transport recognises.
pub const DIAMETER_VERSION: u8 = 1;

/// Largest representable message length (24-bit field, header included).
pub const MAX_MESSAGE_LENGTH: usize = 0x00FF_FFFF;

/// Outcome of inspecting the front of a buffer for a frame header.
///
/// Scanning never consumes bytes; callers decide what each outcome means
/// for the buffered data. The reassembler maps everything except
/// [`Length`](HeaderScan::Length) to "extract nothing and wait", but the
/// variants stay distinct so garbage input is observable in logs and
/// tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderScan {
    /// Fewer than [`FRAME_HEADER_LEN`] bytes are buffered.
    Underflow,
    /// The version byte differs from [`DIAMETER_VERSION`]; the stream is
    /// not carrying Diameter framing at this position.
    VersionMismatch {
        /// The byte found where the version was expected.
        version: u8,
    },
    /// The length field is smaller than the header it counts, so the
    /// frame can never complete.
    BadLength {
        /// The declared total length in bytes.
        length: usize,
    },
    /// A well-formed header; the frame spans `length` bytes in total.
    Length(usize),
}

/// Classify the first bytes of `buf` as a Diameter frame header.
#[must_use]
pub fn scan_header(buf: &[u8]) -> HeaderScan {
    let Some(header) = buf.get(..FRAME_HEADER_LEN) else {
        return HeaderScan::Underflow;
    };
    if header[0] != DIAMETER_VERSION {
        return HeaderScan::VersionMismatch { version: header[0] };
    }
    let length = (usize::from(header[1]) << 16) | (usize::from(header[2]) << 8)
        | usize::from(header[3]);
    if length < FRAME_HEADER_LEN {
        return HeaderScan::BadLength { length };
    }
    HeaderScan::Length(length)
}

/// Encode a frame header for a message of `total_len` bytes.
///
/// `total_len` counts the header itself, matching the wire field.
/// Returns `None` when the length cannot be represented: below
/// [`FRAME_HEADER_LEN`] or above [`MAX_MESSAGE_LENGTH`].
#[must_use]
pub fn encode_header(total_len: usize) -> Option<[u8; 4]> {
    if !(FRAME_HEADER_LEN..=MAX_MESSAGE_LENGTH).contains(&total_len) {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the range check above bounds total_len to 24 bits"
    )]
    Some([
        DIAMETER_VERSION,
        (total_len >> 16) as u8,
        (total_len >> 8) as u8,
        total_len as u8,
    ])
}
