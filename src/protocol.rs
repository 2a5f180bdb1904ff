//! Wire framing for the echo protocol.
//!
//! Messages are plaintext (ASCII-safe) byte streams with no length prefix;
//! the literal token `<EOF>` is the only message boundary. The server
//! echoes everything it accumulated, terminator included, then closes.

/// Byte sequence marking the end of a message.
pub const MESSAGE_TERMINATOR: &[u8] = b"<EOF>";

/// Find the terminator in the accumulated buffer, returning the index of
/// its first byte.
///
/// The scan always covers the entire buffer: the token can arrive split
/// across receive chunks, so only the accumulated view ever sees it whole.
/// Linear scanning is fine here since messages are short handshake
/// payloads.
pub fn find_terminator(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < MESSAGE_TERMINATOR.len() {
        return None;
    }
    buffer
        .windows(MESSAGE_TERMINATOR.len())
        .position(|window| window == MESSAGE_TERMINATOR)
}

/// Check whether a complete message is present in the buffer.
pub fn contains_terminator(buffer: &[u8]) -> bool {
    find_terminator(buffer).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_at_end() {
        assert_eq!(find_terminator(b"hello<EOF>"), Some(5));
        assert!(contains_terminator(b"hello<EOF>"));
    }

    #[test]
    fn test_terminator_mid_buffer() {
        assert_eq!(find_terminator(b"ab<EOF>trailing"), Some(2));
    }

    #[test]
    fn test_terminator_alone() {
        assert_eq!(find_terminator(b"<EOF>"), Some(0));
    }

    #[test]
    fn test_absent() {
        assert_eq!(find_terminator(b"no boundary here"), None);
        assert!(!contains_terminator(b"no boundary here"));
    }

    #[test]
    fn test_partial_prefix_is_not_a_match() {
        // A split token is invisible until the rest arrives.
        assert_eq!(find_terminator(b"ab<E"), None);
        assert_eq!(find_terminator(b"ab<EO"), None);
    }

    #[test]
    fn test_reassembled_after_split() {
        let mut accumulated = Vec::new();
        for chunk in [&b"ab"[..], &b"<E"[..], &b"OF>"[..]] {
            accumulated.extend_from_slice(chunk);
        }
        assert_eq!(find_terminator(&accumulated), Some(2));
    }

    #[test]
    fn test_empty_and_short_input() {
        assert_eq!(find_terminator(b""), None);
        assert_eq!(find_terminator(b"<EO"), None);
    }

    #[test]
    fn test_angle_brackets_without_token() {
        assert_eq!(find_terminator(b"<FOE><oef><EOF"), None);
    }
}
