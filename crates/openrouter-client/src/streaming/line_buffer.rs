/// Text buffer for line-based SSE parsing
/// Holds exactly the tail of the stream that has not been consumed as a complete line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

/// The first line currently in the buffer
#[derive(Debug, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line text without its newline (and without a trailing `\r`)
    pub text: &'a str,
    /// False when this is the unterminated tail of the buffer
    pub terminated: bool,
    /// Bytes to consume to remove this line (newline included)
    pub len: usize,
}

impl LineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Append decoded text
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Peek at the first non-empty line, dropping blank lines in front of it
    /// Returns None if the buffer holds nothing but newlines
    pub fn next_line(&mut self) -> Option<Line<'_>> {
        let blank = self.buffer.len()
            - self
                .buffer
                .trim_start_matches(|c| c == '\n' || c == '\r')
                .len();
        if blank > 0 {
            self.buffer.drain(..blank);
        }

        if self.buffer.is_empty() {
            return None;
        }

        let line = match self.buffer.find('\n') {
            Some(pos) => Line {
                text: self.buffer[..pos].trim_end_matches('\r'),
                terminated: true,
                len: pos + 1,
            },
            None => Line {
                text: &self.buffer,
                terminated: false,
                len: self.buffer.len(),
            },
        };
        Some(line)
    }

    /// Remove `len` bytes from the front (the length reported by `next_line`)
    pub fn consume(&mut self, len: usize) {
        self.buffer.drain(..len);
    }

    /// Unconsumed text
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_basic() {
        let mut buffer = LineBuffer::with_capacity(64);

        buffer.push_str("line1\nline2\n");
        assert_eq!(buffer.len(), 12);

        let line = buffer.next_line().unwrap();
        assert_eq!(line.text, "line1");
        assert!(line.terminated);
        let len = line.len;
        buffer.consume(len);

        let line = buffer.next_line().unwrap();
        assert_eq!(line.text, "line2");
        let len = line.len;
        buffer.consume(len);

        assert!(buffer.next_line().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut buffer = LineBuffer::with_capacity(64);

        buffer.push_str("partial");
        let line = buffer.next_line().unwrap();
        assert_eq!(line.text, "partial");
        assert!(!line.terminated);

        buffer.push_str(" line\n");
        let line = buffer.next_line().unwrap();
        assert_eq!(line.text, "partial line");
        assert!(line.terminated);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let mut buffer = LineBuffer::with_capacity(64);

        buffer.push_str("\n\r\ndata: x\r\n\n");
        let line = buffer.next_line().unwrap();
        assert_eq!(line.text, "data: x");
        let len = line.len;
        buffer.consume(len);

        assert!(buffer.next_line().is_none());
    }
}
