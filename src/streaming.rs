//! Incremental decoding and buffering of streamed replies.

const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder that carries incomplete sequences over to the next chunk
#[derive(Debug, Default, Clone)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any carried-over prefix) as forms complete characters
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..start + valid]));
                    start += valid;

                    match err.error_len() {
                        Some(invalid) => {
                            out.push(REPLACEMENT);
                            start += invalid;
                        }
                        // Truncated sequence at the end: wait for more bytes
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flush at end of stream; a dangling partial sequence becomes one replacement character
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Ephemeral text shown while a streamed reply is in flight
#[derive(Debug, Default, Clone)]
pub struct StreamBuffer {
    text: String,
    visible: bool,
    chunks: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the typing bubble for a fresh response
    pub fn start(&mut self) {
        self.text.clear();
        self.chunks = 0;
        self.visible = true;
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.visible = true;
        self.chunks += 1;
        self.text.push_str(chunk);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// The bubble is drawn only while streaming and non-empty
    pub fn should_render(&self) -> bool {
        self.visible && !self.text.is_empty()
    }

    /// Hide the bubble and hand back whatever accumulated
    pub fn take(&mut self) -> String {
        self.visible = false;
        self.chunks = 0;
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.chunks = 0;
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"he"), "he");
        assert_eq!(decoder.decode(b"llo"), "llo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn two_byte_character_split_across_chunks() {
        let bytes = "é".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();

        assert_eq!(decoder.decode(&[b'c', b'a', b'f', bytes[0]]), "caf");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&[bytes[1]]), "é");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn four_byte_character_split_three_ways() {
        let bytes = "🔥".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();

        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.decode(&bytes[1..3]), "");
        assert_eq!(decoder.decode(&bytes[3..]), "🔥");
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn dangling_sequence_is_flushed_on_finish() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn buffer_accumulates_and_hides_on_take() {
        let mut buffer = StreamBuffer::new();
        assert!(!buffer.should_render());

        buffer.start();
        assert!(buffer.is_visible());
        assert!(!buffer.should_render());

        buffer.push_chunk("he");
        assert_eq!(buffer.text(), "he");
        buffer.push_chunk("llo");
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.chunk_count(), 2);
        assert!(buffer.should_render());

        assert_eq!(buffer.take(), "hello");
        assert_eq!(buffer.text(), "");
        assert!(!buffer.is_visible());
    }
}
