/// Lexical primitives for procmail rc files.
///
/// The rc language is line oriented and context sensitive, so instead of a
/// token stream the parser drives a `Cursor` and asks it for the next
/// primitive it expects. Every method that can fail leaves the cursor where
/// it was.

/// Printable, non-space character.
pub fn is_printable(c: char) -> bool {
    !c.is_whitespace()
}

/// Printable character or horizontal space: anything but a line break.
pub fn is_printable_or_space(c: char) -> bool {
    c != '\n' && c != '\r'
}

/// Whitespace that does not end a line.
pub fn is_horizontal_space(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len());
        self.pos += len;
        &self.input[start..self.pos]
    }

    /// Skip spaces and tabs (indentation is regenerated on render).
    /// Returns true if anything was skipped.
    pub fn skip_blank(&mut self) -> bool {
        !self.take_while(is_horizontal_space).is_empty()
    }

    /// Skip all whitespace, including blank lines.
    pub fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// True at end of input or before an optional `\r` and a `\n`.
    pub fn at_line_end(&self) -> bool {
        let rest = self.rest();
        rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") || rest == "\r"
    }

    /// Consume a line ending, tolerating a carriage return before it.
    pub fn eat_line_end(&mut self) -> bool {
        if self.is_eof() {
            return true;
        }
        let start = self.pos;
        self.eat('\r');
        if self.eat('\n') || self.is_eof() {
            true
        } else {
            self.pos = start;
            false
        }
    }

    /// Everything up to the end of the line, excluding the line ending.
    pub fn rest_of_line(&mut self) -> &'a str {
        self.take_while(is_printable_or_space)
    }

    pub fn identifier(&mut self) -> Option<&'a str> {
        if !self.peek().is_some_and(is_identifier_start) {
            return None;
        }
        Some(self.take_while(is_identifier_continue))
    }

    pub fn digits(&mut self) -> Option<&'a str> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        (!digits.is_empty()).then_some(digits)
    }

    /// Scan a string quoted with `delim`, where a backslash escapes the
    /// next character. Returns the raw text between the delimiters, escapes
    /// intact. Quoted strings never span lines.
    pub fn quoted(&mut self, delim: char) -> Option<&'a str> {
        let start = self.pos;
        if !self.eat(delim) {
            return None;
        }
        let body_start = self.pos;
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('\n') | Some('\r') | None => break,
                    Some(_) => {}
                },
                Some(c) if c == delim => {
                    return Some(&self.input[body_start..self.pos - delim.len_utf8()]);
                }
                Some('\n') | Some('\r') | None => break,
                Some(_) => {}
            }
        }
        self.pos = start;
        None
    }
}

/// Remove the backslash in front of every escaped `delim`, keeping other
/// escape pairs verbatim.
pub fn unescape_quote(raw: &str, delim: char) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next == delim => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Inverse of [`unescape_quote`].
pub fn escape_quote(value: &str, delim: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if c == delim {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
