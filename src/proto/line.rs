//! Line-based codec for tokio.
//!
//! Reads and writes newline-terminated lines. Servers are not trusted to send
//! valid UTF-8, so decoding is lossy. Over-long lines and lines carrying a bare
//! CR, LF or NUL are dropped rather than tearing down the connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::ProtocolError;

/// 512 bytes of message plus the IRCv3 tag allowance.
pub const MAX_LINE_LEN: usize = 8191 + 512;

/// Line-based codec that handles newline-terminated messages.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
    /// Set while skipping the remainder of an over-long line
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// Create a new codec with custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// Reject characters that would end or split a line once re-sent.
    fn validate_line(text: &str) -> Result<(), ProtocolError> {
        match text.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
            Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
            None => Ok(()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                if src.len() > self.max_len {
                    // Keep scanning for the end of this line but stop buffering it.
                    warn!(limit = self.max_len, "Inbound line too long, discarding");
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding || line.len() > self.max_len {
                self.discarding = false;
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }
            if let Err(error) = Self::validate_line(text) {
                warn!(%error, "Inbound line rejected");
                continue;
            }
            return Ok(Some(text.to_string()));
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        dst.reserve(msg.len() + 2);
        dst.extend_from_slice(msg.as_bytes());
        if !msg.ends_with("\r\n") {
            dst.extend_from_slice(b"\r\n");
        }
        Ok(())
    }
}
