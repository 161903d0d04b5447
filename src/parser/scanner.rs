//! Zero-allocation byte cursor helpers.
//!
//! The reference pattern is structurally constant, so a literal-and-skip
//! walk recognizes it in one linear pass with no backtracking. Nothing here
//! reports errors: a mismatch just returns `false` and the caller moves on.

/// True for ASCII `0-9` and lowercase `a-f`.
#[inline]
pub fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

/// A view over the valid prefix of a (possibly larger, reused) buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteScanner<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteScanner<'a> {
    /// Scan the first `len` bytes of `buffer`. Bytes past `len` are stale
    /// data from an earlier, larger file and are never read.
    pub fn new(buffer: &'a [u8], len: usize) -> Self {
        Self {
            bytes: &buffer[..len.min(buffer.len())],
        }
    }

    /// Valid length.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// True iff `literal` occurs starting exactly at `index`.
    #[inline]
    pub fn match_literal(&self, index: usize, literal: &[u8]) -> bool {
        match index.checked_add(literal.len()) {
            Some(end) if end <= self.bytes.len() => &self.bytes[index..end] == literal,
            _ => false,
        }
    }

    /// Advance past space, tab, CR and LF.
    #[inline]
    pub fn skip_whitespace(&self, index: &mut usize) {
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.byte_at(*index) {
            *index += 1;
        }
    }

    /// Advance past ASCII `0-9`.
    #[inline]
    pub fn skip_digits(&self, index: &mut usize) {
        while self.byte_at(*index).is_some_and(|b| b.is_ascii_digit()) {
            *index += 1;
        }
    }

    /// Consume `ch` if it is the current byte. Leaves `index` alone otherwise.
    #[inline]
    pub fn skip_literal_char(&self, index: &mut usize, ch: u8) -> bool {
        if self.byte_at(*index) == Some(ch) {
            *index += 1;
            true
        } else {
            false
        }
    }

    /// Read the maximal run of hex digits at `index` into `scratch`.
    ///
    /// `scratch` is cleared first and reused across calls. The caller
    /// advances its own cursor by the returned token's length.
    pub fn read_hex_token<'s>(&self, index: usize, scratch: &'s mut String) -> &'s str {
        scratch.clear();
        let mut i = index;
        while let Some(b) = self.byte_at(i).filter(|b| is_hex_digit(*b)) {
            scratch.push(char::from(b));
            i += 1;
        }
        scratch.as_str()
    }

    /// Offset of the next occurrence of `literal` at or after `from`.
    pub fn find_literal(&self, from: usize, literal: &[u8]) -> Option<usize> {
        (from..self.bytes.len()).find(|&i| self.match_literal(i, literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_literal_bounds() {
        let scanner = ByteScanner::new(b"guid: abc", 9);
        assert!(scanner.match_literal(0, b"guid:"));
        assert!(!scanner.match_literal(1, b"guid:"));
        assert!(scanner.match_literal(6, b"abc"));
        assert!(!scanner.match_literal(7, b"abc"));
        assert!(!scanner.match_literal(usize::MAX, b"a"));
    }

    #[test]
    fn test_valid_length_hides_stale_bytes() {
        // Buffer reused from a larger file: only the first 4 bytes are live.
        let buffer = b"abcdSTALE";
        let scanner = ByteScanner::new(buffer, 4);
        assert_eq!(scanner.len(), 4);
        assert!(!scanner.match_literal(4, b"S"));
        assert!(!scanner.match_literal(2, b"cdS"));

        let mut scratch = String::new();
        assert_eq!(scanner.read_hex_token(0, &mut scratch), "abcd");
    }

    #[test]
    fn test_len_larger_than_buffer_is_clamped() {
        let scanner = ByteScanner::new(b"ab", 100);
        assert_eq!(scanner.len(), 2);
    }

    #[test]
    fn test_skip_whitespace_and_digits() {
        let scanner = ByteScanner::new(b" \t\r\n123x", 8);
        let mut i = 0;
        scanner.skip_whitespace(&mut i);
        assert_eq!(i, 4);
        scanner.skip_digits(&mut i);
        assert_eq!(i, 7);
        scanner.skip_digits(&mut i);
        assert_eq!(i, 7);
    }

    #[test]
    fn test_skip_literal_char() {
        let scanner = ByteScanner::new(b",x", 2);
        let mut i = 0;
        assert!(scanner.skip_literal_char(&mut i, b','));
        assert_eq!(i, 1);
        assert!(!scanner.skip_literal_char(&mut i, b','));
        assert_eq!(i, 1);
        i = 2;
        assert!(!scanner.skip_literal_char(&mut i, b'x'));
    }

    #[test]
    fn test_read_hex_token_stops_at_uppercase_and_reuses_scratch() {
        let scanner = ByteScanner::new(b"09afG, ff", 9);
        let mut scratch = String::from("leftover");
        assert_eq!(scanner.read_hex_token(0, &mut scratch), "09af");
        assert_eq!(scanner.read_hex_token(4, &mut scratch), "");
        assert_eq!(scanner.read_hex_token(7, &mut scratch), "ff");
    }

    #[test]
    fn test_find_literal() {
        let scanner = ByteScanner::new(b"xx guid: 1", 10);
        assert_eq!(scanner.find_literal(0, b"guid:"), Some(3));
        assert_eq!(scanner.find_literal(4, b"guid:"), None);
    }
}
