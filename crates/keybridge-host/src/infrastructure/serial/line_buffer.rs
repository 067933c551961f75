//! Line framing for the serial byte stream.
//!
//! Bytes are split on `\n`.  Each line is decoded as UTF-8 with invalid
//! sequences dropped, trimmed of surrounding whitespace (including `\r`), and
//! discarded if empty.  A line that grows past [`MAX_LINE_BYTES`] without a
//! terminator is flushed so a noisy link cannot grow the buffer without
//! bound.  A multi-byte character straddling that limit is carried over to
//! the next line rather than split.

use std::collections::VecDeque;

/// Longest unterminated line kept in memory.
pub const MAX_LINE_BYTES: usize = 4096;

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    ready: VecDeque<String>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes, framing any completed lines.
    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                self.flush_pending();
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_BYTES {
                    self.flush_overlong();
                }
            }
        }
    }

    /// Takes the oldest completed line.
    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Bytes received since the last line terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn flush_overlong(&mut self) {
        let keep = incomplete_tail_len(&self.pending);
        let tail = self.pending.split_off(self.pending.len() - keep);
        self.flush_pending();
        self.pending = tail;
    }

    fn flush_pending(&mut self) {
        let raw = std::mem::take(&mut self.pending);
        let text = decode_ignoring_invalid(&raw);
        let line = text.trim();
        if !line.is_empty() {
            self.ready.push_back(line.to_string());
        }
    }
}

/// Length of a UTF-8 sequence at the end of `bytes` still missing
/// continuation bytes, or 0 if the buffer ends on a character boundary.
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

/// Decodes UTF-8, skipping invalid or truncated sequences.
pub fn decode_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // from_utf8 already checked this prefix
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    None => return out,
                }
            }
        }
    }
}
