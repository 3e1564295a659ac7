//! Line reassembly over a chunked byte stream
//!
//! HTTP bodies arrive in arbitrary chunks, so a dataset row can straddle two
//! reads. [`LineReassembler`] is a [`Decoder`] that only yields complete
//! newline-terminated lines and carries the unterminated tail of each chunk
//! over to the next one. At end of stream a non-empty tail is yielded as the
//! final line.
//!
//! Lines are split on raw `\n` bytes before UTF-8 decoding, which is safe
//! because `\n` never occurs inside a multi-byte sequence. A code point split
//! across chunks is therefore reassembled along with its line.

use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Longest line accepted before the stream is treated as corrupt
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct LineReassembler {
    /// Bytes of the buffered tail already scanned for a newline
    scanned: usize,
    max_line_length: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            scanned: 0,
            max_line_length,
        }
    }

    fn decode_line(bytes: &[u8]) -> io::Result<String> {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineReassembler {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<String>> {
        match buf[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let newline = self.scanned + offset;
                let line = buf.split_to(newline + 1);
                self.scanned = 0;
                Self::decode_line(&line[..newline]).map(Some)
            },
            None if buf.len() > self.max_line_length => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", self.max_line_length),
            )),
            None => {
                self.scanned = buf.len();
                Ok(None)
            },
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        self.scanned = 0;
        if buf.is_empty() {
            return Ok(None);
        }

        let tail = Self::decode_line(buf)?;
        buf.advance(buf.len());
        if tail.is_empty() {
            Ok(None)
        } else {
            Ok(Some(tail))
        }
    }
}
