//! Reassembles protocol units from a raw byte stream.
//!
//! The gateway terminates every event with a blank line (`\n\n`). Network
//! chunk boundaries have no relation to event boundaries: one chunk may
//! hold several events, and one event may span several chunks, possibly
//! splitting a multi-byte character. The framer therefore buffers raw
//! bytes and only decodes complete segments.

const DELIMITER: &[u8] = b"\n\n";

#[derive(Debug, Default)]
pub struct EventFramer {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no delimiter start.
    scanned: usize,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every segment it completed, in order.
    ///
    /// Blank segments are skipped. The incomplete tail stays buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = find_delimiter(&self.buffer[from..]) {
            let end = from + offset;
            push_frame(&mut frames, &self.buffer[start..end]);
            start = end + DELIMITER.len();
            from = start;
        }
        self.buffer.drain(..start);
        // A delimiter may still straddle the end of the buffer.
        self.scanned = self.buffer.len().saturating_sub(DELIMITER.len() - 1);

        frames
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        let mut frames = Vec::with_capacity(1);
        push_frame(&mut frames, &rest);
        frames.pop()
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

fn push_frame(frames: &mut Vec<String>, segment: &[u8]) {
    let text = String::from_utf8_lossy(segment);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        frames.push(trimmed.to_string());
    }
}
