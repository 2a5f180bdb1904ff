//! Per-session receive accumulator.
//!
//! Received chunks are appended until the message terminator shows up or
//! the session ends. Growth is capped so a peer that never terminates its
//! message cannot hold unbounded memory.

use bytes::BytesMut;
use std::borrow::Cow;

/// Error returned when an append would push the accumulated message past
/// the configured cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTooLarge {
    /// Configured maximum message size in bytes.
    pub limit: usize,
}

impl std::fmt::Display for MessageTooLarge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Message exceeds maximum size of {} bytes", self.limit)
    }
}

impl std::error::Error for MessageTooLarge {}

/// Append-only accumulator for one session's received bytes.
///
/// Owned exclusively by the session handler; dropped when the session
/// ends. The buffer only ever grows, up to `max_len`.
#[derive(Debug)]
pub struct ReceiveBuffer {
    data: BytesMut,
    max_len: usize,
}

impl ReceiveBuffer {
    /// Create an empty buffer that will accept at most `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(max_len.min(4096)),
            max_len,
        }
    }

    /// Append a received chunk.
    ///
    /// Rejects the append (leaving the buffer unchanged) if it would
    /// exceed the cap.
    pub fn extend(&mut self, chunk: &[u8]) -> Result<(), MessageTooLarge> {
        if self.data.len() + chunk.len() > self.max_len {
            return Err(MessageTooLarge {
                limit: self.max_len,
            });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Total bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been received yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The accumulated bytes, exactly as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Lossy text view of the accumulated bytes, for logging.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_across_appends() {
        let mut buffer = ReceiveBuffer::new(1024);
        assert!(buffer.is_empty());

        buffer.extend(b"hello ").unwrap();
        buffer.extend(b"world").unwrap();

        assert_eq!(buffer.len(), 11);
        assert_eq!(buffer.as_bytes(), b"hello world");
        assert_eq!(buffer.as_text(), "hello world");
    }

    #[test]
    fn test_cap_rejects_and_preserves_contents() {
        let mut buffer = ReceiveBuffer::new(8);
        buffer.extend(b"12345").unwrap();

        let err = buffer.extend(b"6789").unwrap_err();
        assert_eq!(err, MessageTooLarge { limit: 8 });

        // Rejected append leaves the buffer as it was.
        assert_eq!(buffer.as_bytes(), b"12345");

        // An append that exactly reaches the cap still fits.
        buffer.extend(b"678").unwrap();
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_lossy_text_view() {
        let mut buffer = ReceiveBuffer::new(16);
        buffer.extend(&[b'o', b'k', 0xff]).unwrap();
        assert_eq!(buffer.as_text(), "ok\u{fffd}");
    }
}
