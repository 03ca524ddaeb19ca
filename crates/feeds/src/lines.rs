//! Splitting a chunked body into feed lines.

use bytes::{Buf, Bytes, BytesMut};

/// Accumulates body chunks and yields complete, non-blank lines.
///
/// Chunk boundaries carry no meaning: a line may arrive split across many
/// chunks, and one chunk may hold many lines. A trailing `\r` is stripped.
/// Lines holding only whitespace are heartbeats and are never yielded.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: BytesMut,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Returns the next complete line, or `None` until more bytes arrive.
    pub(crate) fn next_line(&mut self) -> Option<Bytes> {
        loop {
            let end = self.pending.iter().position(|b| *b == b'\n')?;
            let mut line = self.pending.split_to(end);
            self.pending.advance(1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if !is_blank(&line) {
                return Some(line.freeze());
            }
        }
    }

    /// Returns the unterminated remainder once the body has ended.
    pub(crate) fn finish(&mut self) -> Option<Bytes> {
        let rest = self.pending.split().freeze();
        (!is_blank(&rest)).then_some(rest)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}
