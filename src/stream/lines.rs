//! Line reassembly over a rolling buffer.
//!
//! Chunks are appended to one `BytesMut`. Scanning resumes where the previous
//! chunk stopped, so bytes are inspected once. Complete lines are split off
//! the front of the buffer and handed out as frozen `Bytes` without copying.
//!
//! `\r`, `\n` and `\r\n` all terminate a line. A `\r` that ends a chunk sets
//! a flag so that a `\n` opening the next chunk is dropped.

use bytes::{Bytes, BytesMut};

#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: BytesMut,
    scanned: usize,
    discard_lf: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes, terminators removed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut chunk = chunk;
        if self.discard_lf {
            if let Some((&first, rest)) = chunk.split_first() {
                if first == b'\n' {
                    chunk = rest;
                }
                self.discard_lf = false;
            }
        }
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        loop {
            let Some(offset) = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == b'\r' || b == b'\n')
            else {
                self.scanned = self.buf.len();
                break;
            };

            let end = self.scanned + offset;
            let terminator = self.buf[end];
            let mut line = self.buf.split_to(end + 1);
            line.truncate(end);
            self.scanned = 0;

            if terminator == b'\r' {
                if self.buf.is_empty() {
                    self.discard_lf = true;
                } else if self.buf[0] == b'\n' {
                    let _ = self.buf.split_to(1);
                }
            }

            lines.push(line.freeze());
        }
        lines
    }

    /// Bytes held for an unterminated line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// End of input. The unterminated tail is dropped; returns its length.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buf.len();
        self.buf.clear();
        self.scanned = 0;
        self.discard_lf = false;
        dropped
    }
}
