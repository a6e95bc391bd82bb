//! Byte cursor over template source.

/// A forward-only cursor over a source string.
///
/// Positions are byte offsets into the full source, so scanners can hand
/// out spans that stay valid for the caller.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at `pos`.
    pub fn at(source: &'a str, pos: usize) -> Self {
        Self { source, pos }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get the current position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Get the remaining source.
    pub fn remaining(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Check if at end.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Peek at next char.
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at the char after the next one.
    pub fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    /// The char immediately before the cursor, looking into the whole source.
    pub fn prev(&self) -> Option<char> {
        self.source[..self.pos].chars().next_back()
    }

    /// Consume next char.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Check if remaining starts with string.
    pub fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    /// Consume string if it matches.
    pub fn consume(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consume a single char if it matches.
    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skip whitespace, line breaks included.
    pub fn skip_whitespace(&mut self) {
        self.read_while(char::is_whitespace);
    }

    /// Skip spaces and tabs only.
    pub fn skip_blanks(&mut self) {
        self.read_while(|c| c == ' ' || c == '\t');
    }

    /// Read until predicate is false.
    pub fn read_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.source[start..self.pos]
    }

    /// Read up to (not including) the next occurrence of `c`.
    /// Returns `None` and leaves the cursor untouched when `c` never occurs.
    pub fn read_until_char(&mut self, c: char) -> Option<&'a str> {
        let len = self.remaining().find(c)?;
        let start = self.pos;
        self.pos += len;
        Some(&self.source[start..self.pos])
    }
}
