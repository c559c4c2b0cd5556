//! Growable accumulator for partially received messages.
//!
//! [`Storage`] holds the suffix of the inbound byte stream that has not
//! yet been consumed as a complete frame. Appends land at the write
//! cursor; complete frames are removed from the front and the remainder
//! compacts down. Capacity only ever grows, and growth is sized to
//! amortise trickle input rather than reallocating per append.

use bytes::{Bytes, BytesMut};
use log::warn;

/// Byte accumulator with append-at-back and take-from-front semantics.
#[derive(Debug)]
pub struct Storage {
    buf: BytesMut,
    capacity: usize,
}

impl Storage {
    /// Create a storage buffer with the given initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.buf.len() }

    /// Whether no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Current capacity; never shrinks over the life of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// View of the buffered bytes, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] { &self.buf }

    /// Append `chunk`, growing the buffer first when it would not fit.
    ///
    /// The grown capacity is `max(len + chunk, capacity + 2 * chunk)`:
    /// enough for the append that overflowed plus headroom proportional
    /// to it, so a peer trickling bytes does not force a reallocation
    /// per read. Buffered bytes are never lost to growth.
    pub fn push(&mut self, chunk: &[u8]) {
        let needed = self.buf.len() + chunk.len();
        if needed >= self.capacity {
            let target = needed.max(self.capacity + chunk.len() * 2);
            self.buf.reserve(target - self.buf.len());
            self.capacity = target;
            warn!("increased storage size, current capacity is {target}");
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Remove and return the first `len` bytes.
    ///
    /// The bytes behind them compact to the front of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `len` bytes are buffered.
    #[must_use]
    pub fn take_front(&mut self, len: usize) -> Bytes { self.buf.split_to(len).freeze() }

    /// Drop every buffered byte, retaining capacity.
    pub fn clear(&mut self) { self.buf.clear(); }
}

#[cfg(test)]
mod tests {
    use super::Storage;

    #[test]
    fn push_and_take_front_preserve_order() {
        let mut storage = Storage::with_capacity(16);
        storage.push(b"abc");
        storage.push(b"defg");
        assert_eq!(storage.len(), 7);

        let front = storage.take_front(5);
        assert_eq!(&front[..], b"abcde");
        assert_eq!(storage.as_slice(), b"fg");
    }

    #[test]
    fn growth_preserves_buffered_bytes() {
        let mut storage = Storage::with_capacity(8);
        storage.push(b"0123");
        // 4 + 6 >= 8 forces growth mid-stream.
        storage.push(b"456789");
        assert_eq!(storage.as_slice(), b"0123456789");
        assert!(storage.capacity() >= 10);
    }

    #[test]
    fn growth_targets_twice_the_overflowing_chunk() {
        let mut storage = Storage::with_capacity(8);
        storage.push(b"01234567");
        assert_eq!(storage.capacity(), 8 + 2 * 8);

        // A later overflow grows from the already-enlarged capacity.
        let big = vec![0u8; 64];
        storage.push(&big);
        assert_eq!(storage.capacity(), 24 + 2 * 64);
    }

    #[test]
    fn exact_capacity_fill_still_grows() {
        // len + chunk == capacity triggers growth, same as the original
        // transport's >= comparison.
        let mut storage = Storage::with_capacity(4);
        storage.push(b"abcd");
        assert!(storage.capacity() > 4);
        assert_eq!(storage.as_slice(), b"abcd");
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut storage = Storage::with_capacity(8);
        storage.push(b"0123456789");
        let grown = storage.capacity();
        storage.clear();
        assert!(storage.is_empty());
        assert_eq!(storage.capacity(), grown);
    }
}
