//! Cursor-based consumption of a raw input string.
//!
//! [`StringReader`] backs the tokenizer and the dispatcher's split stage. It
//! operates on characters rather than bytes, so multi-byte input never
//! panics the cursor.

/// A resettable character cursor over an input string.
#[derive(Debug, Clone)]
pub struct StringReader {
    chars: Vec<char>,
    index: usize,
}

impl StringReader {
    /// Creates a reader positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
        }
    }

    /// Rewinds the cursor to the start of the input.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Returns `true` once every character has been consumed.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    /// Consumes and returns the next character, if any.
    pub fn read_char(&mut self) -> Option<char> {
        let ch = self.chars.get(self.index).copied();
        if ch.is_some() {
            self.index += 1;
        }
        ch
    }

    /// Returns the next character without consuming it.
    #[must_use]
    pub fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// Consumes characters until `predicate` matches one.
    ///
    /// The matching character is consumed but not included in the returned
    /// buffer. If the input ends before a match, everything read so far is
    /// returned.
    pub fn read_until(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut buf = String::new();
        while let Some(ch) = self.read_char() {
            if predicate(ch) {
                return buf;
            }
            buf.push(ch);
        }
        buf
    }

    /// Returns everything after the cursor without consuming it.
    #[must_use]
    pub fn rest(&self) -> String {
        self.chars.get(self.index..).unwrap_or_default().iter().collect()
    }
}
