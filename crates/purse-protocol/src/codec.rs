//! Line framing for the top-up stream.
//!
//! Requests are newline-delimited text. A reader accumulates bytes into a
//! [`BytesMut`] and calls [`decode_line`] after every read until a complete
//! line comes out.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Default maximum size of a single request line.
pub const MAX_LINE_SIZE: usize = 1024;

/// Line delimiter.
pub const DELIMITER: u8 = b'\n';

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Line exceeds the configured maximum size.
    #[error("Line size {size} exceeds maximum {max}")]
    LineTooLarge {
        /// Bytes buffered so far.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Payload is not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a line, appending the delimiter.
#[must_use]
pub fn encode_line(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.extend_from_slice(&[DELIMITER]);
    buf.freeze()
}

/// Try to decode a line from a buffer, advancing it if successful.
///
/// Returns `Ok(Some(line))` with the delimiter (and a preceding `\r`)
/// stripped, `Ok(None)` if no delimiter has arrived yet, or `Err` when the
/// buffer has grown past `max` bytes without one.
///
/// # Errors
///
/// Returns an error if the line is too large or not valid UTF-8.
pub fn decode_line(buf: &mut BytesMut, max: usize) -> Result<Option<String>, ProtocolError> {
    let Some(pos) = buf.iter().position(|b| *b == DELIMITER) else {
        if buf.len() > max {
            return Err(ProtocolError::LineTooLarge {
                size: buf.len(),
                max,
            });
        }
        return Ok(None);
    };

    if pos > max {
        return Err(ProtocolError::LineTooLarge { size: pos, max });
    }

    let line = buf.split_to(pos);
    buf.advance(1);

    let text = std::str::from_utf8(&line)?;
    Ok(Some(text.strip_suffix('\r').unwrap_or(text).to_string()))
}

/// Take whatever is left in the buffer as a final, undelimited line.
///
/// Used when the peer half-closes or goes quiet before sending a newline.
///
/// # Errors
///
/// Returns an error if the remainder is too large or not valid UTF-8.
pub fn decode_remainder(buf: &mut BytesMut, max: usize) -> Result<Option<String>, ProtocolError> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf.len() > max {
        return Err(ProtocolError::LineTooLarge {
            size: buf.len(),
            max,
        });
    }

    let rest = buf.split();
    Ok(Some(std::str::from_utf8(&rest)?.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_waits_for_delimiter() {
        let mut buf = BytesMut::from(&b"alice:1"[..]);
        assert!(decode_line(&mut buf, MAX_LINE_SIZE).unwrap().is_none());
        assert_eq!(buf.len(), 7);

        buf.extend_from_slice(b"00\r\n");
        let line = decode_line(&mut buf, MAX_LINE_SIZE).unwrap().unwrap();
        assert_eq!(line, "alice:100");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_line("first"));
        buf.extend_from_slice(b"sec");

        assert_eq!(decode_line(&mut buf, MAX_LINE_SIZE).unwrap().unwrap(), "first");
        assert_eq!(&buf[..], b"sec");
    }

    #[test]
    fn test_line_too_large() {
        let mut buf = BytesMut::from(&[b'a'; 17][..]);
        match decode_line(&mut buf, 16) {
            Err(ProtocolError::LineTooLarge { size: 17, max: 16 }) => {}
            other => panic!("Expected LineTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);
        assert!(matches!(
            decode_line(&mut buf, MAX_LINE_SIZE),
            Err(ProtocolError::Utf8(_))
        ));
    }

    #[test]
    fn test_decode_remainder() {
        let mut buf = BytesMut::from(&b"bob:5"[..]);
        assert_eq!(
            decode_remainder(&mut buf, MAX_LINE_SIZE).unwrap().as_deref(),
            Some("bob:5")
        );
        assert!(decode_remainder(&mut buf, MAX_LINE_SIZE).unwrap().is_none());
    }
}
