#![doc(html_root_url = "https://docs.rs/diawire/latest")]
//! Public API for the `diawire` library.
//!
//! `diawire` is a peer transport for the Diameter base protocol
//! (RFC 3588/6733): it frames a TCP byte stream into length-prefixed
//! Diameter messages and manages the lifecycle of a single peer
//! connection. Message *content* is opaque here — AVP decoding belongs
//! to the [`ConnectionListener`] the transport delivers frames to.
//!
//! The pieces, bottom up:
//!
//! - [`storage`]: the growable accumulator holding bytes that have
//!   arrived but not yet formed a complete message.
//! - [`framing`]: the four-byte version + length header every Diameter
//!   message starts with.
//! - [`assembler`]: drains complete frames out of arbitrarily chunked
//!   input and hands them to the listener.
//! - [`transport`]: the socket owner — connect/start/stop/release
//!   lifecycle, a dedicated read task, and a serialized write path.
//! - [`session`]: thin glue binding sessions to protocol factories.

pub mod assembler;
pub mod config;
pub mod error;
pub mod framing;
pub mod listener;
pub mod metrics;
pub mod session;
pub mod storage;
pub mod transport;

pub use assembler::MessageAssembler;
pub use config::{SocketOptions, TransportConfig};
pub use error::{AvpDataError, NotInitialized, TransportError};
pub use framing::{DIAMETER_VERSION, FRAME_HEADER_LEN, HeaderScan, scan_header};
pub use listener::ConnectionListener;
pub use session::{PeerSession, SessionRegistry};
pub use transport::{MessageSender, ReadOutcome, TcpTransport};
