//! Module with the character cursor consumed by the automaton.
//!
//! The automaton only peeks and consumes one character at a time. It never seeks backwards on
//! its own: a caller that wants to backtrack takes a snapshot with `clone()` before a run and
//! restores it with [Cursor::restore] when the run is rejected.

use crate::Position;

/// A character stream the automaton runs on.
pub trait Cursor: Clone {
    /// Returns the next character without consuming it, or `None` at the end of the input.
    fn peek(&self) -> Option<char>;

    /// Consumes exactly one character and returns it, or `None` at the end of the input.
    fn consume(&mut self) -> Option<char>;

    /// Returns true if the end of the input has been reached.
    #[inline]
    fn is_end(&self) -> bool {
        self.peek().is_none()
    }

    /// The number of characters consumed so far.
    fn offset(&self) -> usize;

    /// The line and column of the next character.
    fn position(&self) -> Position;

    /// Restore a snapshot previously taken with `clone()`.
    #[inline]
    fn restore(&mut self, snapshot: Self) {
        *self = snapshot;
    }
}

/// A [Cursor] over a string slice that tracks line and column numbers.
#[derive(Debug, Clone)]
pub struct StrCursor<'a> {
    chars: std::str::Chars<'a>,
    offset: usize,
    position: Position,
}

impl<'a> StrCursor<'a> {
    /// Create a new cursor at the start of the given text.
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
            offset: 0,
            position: Position::default(),
        }
    }

    /// The text that has not been consumed yet.
    #[inline]
    pub fn rest(&self) -> &'a str {
        self.chars.as_str()
    }
}

impl Cursor for StrCursor<'_> {
    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += 1;
        self.position.advance(c);
        Some(c)
    }

    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    fn position(&self) -> Position {
        self.position
    }
}
