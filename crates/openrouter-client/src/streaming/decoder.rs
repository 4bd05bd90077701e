/// Incremental UTF-8 decoder
/// A code point split across two network reads is held back until its remaining bytes arrive.
/// Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any held-back tail) as forms complete characters
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush whatever is held back; an unfinished sequence becomes U+FFFD
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_split_code_point() {
        let bytes = "olá 🌍".as_bytes();
        let mut decoder = Utf8Decoder::new();

        // cut inside the 4-byte emoji
        let cut = bytes.len() - 2;
        let first = decoder.decode(&bytes[..cut]);
        assert_eq!(first, "olá ");
        assert!(decoder.has_pending());

        let second = decoder.decode(&bytes[cut..]);
        assert_eq!(second, "🌍");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_byte_by_byte() {
        let text = "ção→日本";
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for b in text.as_bytes() {
            out.push_str(&decoder.decode(std::slice::from_ref(b)));
        }
        assert_eq!(out, text);
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_finish_flushes_incomplete() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }
}
