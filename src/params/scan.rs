/// Byte offset into a scanned buffer. Iterators can be suspended by taking
/// their cursor and resumed later with `resume`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub pos: usize,
}

fn is_line_end(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn is_separator(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_word_end(b: u8) -> bool {
    b == b'=' || is_separator(b) || is_line_end(b)
}

/// Lines of a text buffer, split on `\r` or `\n`. Exactly one delimiter is
/// consumed per split, so `\r\n` yields an extra empty line.
pub struct Lines<'a> {
    text: &'a str,
    cursor: Cursor,
}

impl<'a> Lines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::resume(text, Cursor::default())
    }

    pub fn resume(text: &'a str, cursor: Cursor) -> Self {
        Self { text, cursor }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        let start = self.cursor.pos;
        if start >= bytes.len() {
            return None;
        }

        match bytes[start..].iter().position(|&b| is_line_end(b)) {
            Some(offset) => {
                self.cursor.pos = start + offset + 1;
                Some(&self.text[start..start + offset])
            }
            None => {
                self.cursor.pos = bytes.len();
                Some(&self.text[start..])
            }
        }
    }
}

/// Words separated by spaces or tabs. A word ends at `=`, whitespace or a
/// line ending; terminators other than separators are left unconsumed.
pub struct Words<'a> {
    text: &'a str,
    cursor: Cursor,
}

impl<'a> Words<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::resume(text, Cursor::default())
    }

    pub fn resume(text: &'a str, cursor: Cursor) -> Self {
        Self { text, cursor }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn skip_separators(&mut self) {
        let bytes = self.text.as_bytes();
        while self.cursor.pos < bytes.len() && is_separator(bytes[self.cursor.pos]) {
            self.cursor.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.cursor.pos).copied()
    }
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.skip_separators();
        let bytes = self.text.as_bytes();
        let start = self.cursor.pos;
        while self.cursor.pos < bytes.len() && !is_word_end(bytes[self.cursor.pos]) {
            self.cursor.pos += 1;
        }
        if self.cursor.pos == start {
            return None;
        }
        Some(&self.text[start..self.cursor.pos])
    }
}

/// `key=value` pairs of a decorator payload.
///
/// Whitespace may surround the key and follow the `=`. The sequence ends at
/// the first fragment that is not a complete pair; `remainder` exposes what
/// was left unscanned so callers can report it.
pub struct KeyValues<'a> {
    words: Words<'a>,
    done: bool,
}

impl<'a> KeyValues<'a> {
    pub fn new(payload: &'a str) -> Self {
        Self {
            words: Words::new(payload),
            done: false,
        }
    }

    /// Unscanned tail of the payload with surrounding whitespace removed.
    pub fn remainder(&self) -> &'a str {
        let text = self.words.text;
        let pos = self.words.cursor().pos.min(text.len());
        text[pos..].trim_matches(|c: char| c.is_ascii() && is_word_end(c as u8) && c != '=')
    }

    fn scan_pair(&mut self) -> Option<(&'a str, &'a str)> {
        let start = self.words.cursor();
        let key = self.words.next();
        let Some(key) = key else {
            self.words = Words::resume(self.words.text, start);
            return None;
        };

        self.words.skip_separators();
        if self.words.peek() != Some(b'=') {
            self.words = Words::resume(self.words.text, start);
            return None;
        }
        self.words.cursor.pos += 1;

        let Some(value) = self.words.next() else {
            self.words = Words::resume(self.words.text, start);
            return None;
        };

        // Consume the terminator after the value, as a single character.
        if self.words.peek().is_some() {
            self.words.cursor.pos += 1;
        }
        Some((key, value))
    }
}

impl<'a> Iterator for KeyValues<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let pair = self.scan_pair();
        if pair.is_none() {
            self.done = true;
        }
        pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_on_single_delimiters() {
        let lines: Vec<_> = Lines::new("a\nb\rc").collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn crlf_yields_empty_continuation() {
        let lines: Vec<_> = Lines::new("a\r\nb\n").collect();
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn lines_resume_from_cursor() {
        let text = "one\ntwo\nthree";
        let mut lines = Lines::new(text);
        assert_eq!(lines.next(), Some("one"));
        let cursor = lines.cursor();
        drop(lines);

        let rest: Vec<_> = Lines::resume(text, cursor).collect();
        assert_eq!(rest, vec!["two", "three"]);
    }

    #[test]
    fn words_stop_at_terminators() {
        let words: Vec<_> = Words::new("  foo\tbar  baz").collect();
        assert_eq!(words, vec!["foo", "bar", "baz"]);

        let mut words = Words::new("key=value");
        assert_eq!(words.next(), Some("key"));
        assert_eq!(words.next(), None);
        assert_eq!(words.cursor().pos, 3);
    }

    #[test]
    fn scans_pairs_with_loose_whitespace() {
        let pairs: Vec<_> = KeyValues::new(" name=foo\ttype =float2  min= 0").collect();
        assert_eq!(
            pairs,
            vec![("name", "foo"), ("type", "float2"), ("min", "0")]
        );
    }

    #[test]
    fn trailing_fragment_is_dropped() {
        let mut kv = KeyValues::new("name=foo type=");
        assert_eq!(kv.next(), Some(("name", "foo")));
        assert_eq!(kv.next(), None);
        assert_eq!(kv.next(), None);
        assert_eq!(kv.remainder(), "type=");
    }

    #[test]
    fn bare_word_ends_the_sequence() {
        let mut kv = KeyValues::new("name=foo stray type=float");
        assert_eq!(kv.next(), Some(("name", "foo")));
        assert_eq!(kv.next(), None);
        assert_eq!(kv.remainder(), "stray type=float");
    }

    #[test]
    fn empty_payload_has_no_pairs() {
        let mut kv = KeyValues::new("   ");
        assert_eq!(kv.next(), None);
        assert_eq!(kv.remainder(), "");
    }
}
