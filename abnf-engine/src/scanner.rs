//! Immutable cursor over a sequence of code points.
//!
//! A `Scanner` is a `Copy` pair of (input, position).  Every successful
//! `accept*` call returns a *new* scanner; the old one is untouched, so a
//! failed alternative can simply be dropped and its sibling started from
//! the original value.

/// An index into the input, counted in code points.
pub type Position = usize;

#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    input: &'a [char],
    pos: Position,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [char]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// The same input, positioned at `pos` (clamped to the end).
    pub fn at(self, pos: Position) -> Self {
        Scanner {
            input: self.input,
            pos: pos.min(self.input.len()),
        }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn input(&self) -> &'a [char] {
        self.input
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Up to `n` characters starting at the current position.  Shorter than
    /// `n` near the end of the input, never an error.
    pub fn peek(&self, n: usize) -> &'a [char] {
        let end = self.pos.saturating_add(n).min(self.input.len());
        &self.input[self.pos..end]
    }

    /// Advance over one character if it satisfies `pred`.  End of input is
    /// just a character that satisfies nothing.
    pub fn accept(self, pred: impl FnOnce(char) -> bool) -> Option<Scanner<'a>> {
        match self.input.get(self.pos) {
            Some(&c) if pred(c) => Some(self.at(self.pos + 1)),
            _ => None,
        }
    }

    /// Advance over `text` if the next `text.len()` characters equal it.
    pub fn accept_chars(self, text: &[char], case_sensitive: bool) -> Option<Scanner<'a>> {
        let window = self.peek(text.len());
        if window.len() != text.len() {
            return None;
        }
        let equal = window
            .iter()
            .zip(text)
            .all(|(&a, &b)| chars_equal(a, b, case_sensitive));
        if equal {
            Some(self.at(self.pos + text.len()))
        } else {
            None
        }
    }
}

fn chars_equal(a: char, b: char, case_sensitive: bool) -> bool {
    if a == b {
        return true;
    }
    if case_sensitive {
        return false;
    }
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(&b);
    }
    a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    // ── Group 1: peek ─────────────────────────────────────────────

    #[test]
    fn peek_does_not_advance() {
        let input = chars("abc");
        let s = Scanner::new(&input);
        assert_eq!(s.peek(2), &['a', 'b']);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn peek_past_end_is_short() {
        let input = chars("ab");
        let s = Scanner::new(&input).at(1);
        assert_eq!(s.peek(5), &['b']);
        assert_eq!(s.at(2).peek(1), &[] as &[char]);
    }

    // ── Group 2: accept ───────────────────────────────────────────

    #[test]
    fn accept_advances_a_copy() {
        let input = chars("x1");
        let s = Scanner::new(&input);
        let next = s.accept(|c| c == 'x').unwrap();
        assert_eq!(next.position(), 1);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn accept_rejects_at_end() {
        let input = chars("x");
        let s = Scanner::new(&input).at(1);
        assert!(s.is_at_end());
        assert!(s.accept(|_| true).is_none());
    }

    #[test]
    fn accept_counts_code_points() {
        let input = chars("ø=");
        let s = Scanner::new(&input).accept(|c| c == 'ø').unwrap();
        assert_eq!(s.position(), 1);
        assert_eq!(s.remaining(), 1);
    }

    // ── Group 3: accept_chars ─────────────────────────────────────

    #[test]
    fn accept_chars_case_sensitive() {
        let input = chars("OID.1");
        let s = Scanner::new(&input);
        assert!(s.accept_chars(&chars("OID."), true).is_some());
        assert!(s.accept_chars(&chars("oid."), true).is_none());
    }

    #[test]
    fn accept_chars_case_insensitive() {
        let input = chars("Version: 1");
        let s = Scanner::new(&input);
        let next = s.accept_chars(&chars("version:"), false).unwrap();
        assert_eq!(next.position(), 8);
    }

    #[test]
    fn accept_chars_needs_full_window() {
        let input = chars("dn");
        let s = Scanner::new(&input);
        assert!(s.accept_chars(&chars("dn:"), true).is_none());
    }
}
