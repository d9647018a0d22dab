use thiserror::Error;

use crate::{NodeID, Position};

/// The result type for the `automatch` crate.
pub type Result<T> = std::result::Result<T, AutomatchError>;

/// The error type for pattern authoring errors of the `automatch` crate.
/// These errors are raised while parsing or compiling a pattern, never during a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct AutomatchError {
    /// The source of the error.
    pub source: Box<AutomatchErrorKind>,
}

impl AutomatchError {
    /// Create a new `AutomatchError`.
    pub fn new(kind: AutomatchErrorKind) -> Self {
        AutomatchError {
            source: Box::new(kind),
        }
    }

    /// Create a syntax error at the given piece and offset.
    pub(crate) fn syntax(kind: SyntaxErrorKind, piece: usize, offset: usize) -> Self {
        AutomatchError::new(AutomatchErrorKind::Syntax {
            kind,
            piece,
            offset,
        })
    }

    /// Get the error kind.
    #[inline]
    pub fn kind(&self) -> &AutomatchErrorKind {
        &self.source
    }
}

impl std::fmt::Display for AutomatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl From<AutomatchErrorKind> for AutomatchError {
    fn from(kind: AutomatchErrorKind) -> Self {
        AutomatchError::new(kind)
    }
}

/// The error kind type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomatchErrorKind {
    /// The pattern text is malformed.
    #[error("pattern syntax error in piece {piece} at offset {offset}: {kind}")]
    Syntax {
        /// What went wrong.
        kind: SyntaxErrorKind,
        /// The index of the segment in which the error occurred.
        piece: usize,
        /// The character offset within that segment.
        offset: usize,
    },

    /// A chain matcher without elements was compiled.
    #[error("empty matcher chain")]
    EmptyChain,

    /// A choice matcher without alternatives was compiled.
    #[error("empty matcher choice")]
    EmptyChoice,

    /// A literal matcher without characters was compiled.
    #[error("empty literal")]
    EmptyLiteral,

    /// A ranges matcher without any code point was compiled.
    #[error("empty character ranges")]
    EmptyRanges,

    /// A range with `begin > end` or beyond the code point space.
    #[error("invalid character range {begin:#x}-{end:#x}")]
    InvalidRange {
        /// The first code point of the range.
        begin: u32,
        /// The last code point of the range.
        end: u32,
    },

    /// A repetition whose minimum exceeds its maximum.
    #[error("invalid repetition bounds {min}..{max}")]
    InvalidRepeat {
        /// The minimum count.
        min: u32,
        /// The maximum count.
        max: u32,
    },

    /// Only matchers that match exactly one character can be negated.
    #[error("cannot negate '{0}': only single-character matchers can be negated")]
    UnsupportedNegation(String),

    /// The negation of a matcher does not leave any character.
    #[error("negation of '{0}' matches no character")]
    EmptyNegation(String),

    /// A rule reference was compiled without being resolved.
    #[error("unresolved rule reference <{0}>")]
    UnresolvedRule(String),

    /// A rule reference refers to itself, directly or indirectly.
    #[error("recursive rule reference <{0}>")]
    RecursiveRule(String),
}

/// The different kinds of syntax errors of the pattern language.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The pattern contains no atom at all.
    #[error("empty pattern")]
    EmptyPattern,
    /// A group contains no atom at all.
    #[error("empty group")]
    EmptyGroup,
    /// A `)` without a matching `(`.
    #[error("unmatched closing parenthesis")]
    UnmatchedGroupClose,
    /// A `(` without a matching `)`.
    #[error("expected group close ')'")]
    MissingGroupClose,
    /// A quoted literal is not closed.
    #[error("expected closing quote {0}")]
    UnterminatedQuote(char),
    /// A character class is not closed.
    #[error("expected character class close ']'")]
    UnterminatedClass,
    /// A `]` without a matching `[`.
    #[error("unmatched closing bracket")]
    UnmatchedClassClose,
    /// A character class contains no characters.
    #[error("empty character class")]
    EmptyClass,
    /// A character class range with `begin > end`.
    #[error("invalid character class range {0:?}-{1:?}")]
    InvalidClassRange(char, char),
    /// A character that can not appear at this position of a character class.
    #[error("unexpected character class character {0:?}")]
    UnexpectedClassChar(char),
    /// A quantifier follows nothing.
    #[error("nothing to repeat")]
    NothingToRepeat,
    /// A malformed `{...}` quantifier.
    #[error("invalid repeat range '{0}'")]
    InvalidQuantifier(String),
    /// A malformed escape sequence.
    #[error("invalid escape sequence '{0}'")]
    InvalidEscape(String),
    /// A unicode escape beyond `0x10FFFF` or in the surrogate range.
    #[error("unicode escape out of range: {0:#x}")]
    EscapeOutOfRange(u32),
    /// The text ended in the middle of a construct.
    #[error("unexpected end of pattern")]
    UnexpectedEnd,
    /// Punctuation that has no meaning at this position.
    #[error("unexpected punctuation {0:?}")]
    UnexpectedPunctuation(char),
    /// A `<name>` rule reference is not closed or has an invalid name.
    #[error("expected rule reference close '>'")]
    UnterminatedReference,
    /// A `>` without a matching `<`.
    #[error("unmatched closing angle bracket")]
    UnmatchedAngleClose,
    /// A `~` that is not followed by an atom.
    #[error("negation without atom")]
    DanglingNegation,
    /// Backtick literals are reserved.
    #[error("backtick literals are not supported")]
    BacktickLiteral,
    /// A quoted literal without characters.
    #[error("empty quoted literal")]
    EmptyLiteral,
}

/// The reason why a run of an automaton rejected its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// An epsilon transition survived determinization. This is an internal invariant violation.
    #[error("illegal epsilon transition")]
    IllegalEpsilon,
    /// No transition matches the next character and the current node is not terminal.
    #[error("unexpected end of match before {0:?}")]
    UnexpectedChar(char),
    /// A callback flagged an error.
    #[error("state error: {0}")]
    StateError(String),
    /// The input ended before a terminal node was reached.
    #[error("match incomplete at end of input")]
    Incomplete,
}

/// A rejected run of an automaton.
/// It is an ordinary outcome: callers that match speculatively restore their cursor snapshot and
/// try an alternative.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} at node {node}, offset {offset} ({position})")]
pub struct Rejection {
    /// Why the run failed.
    pub reason: RejectReason,
    /// The state of the automaton the run stopped in.
    pub node: NodeID,
    /// The character offset of the cursor.
    pub offset: usize,
    /// The line and column of the cursor.
    pub position: Position,
}

impl Rejection {
    /// Get the reason of the rejection.
    #[inline]
    pub fn reason(&self) -> &RejectReason {
        &self.reason
    }

    /// Returns true if a callback flagged the failure.
    #[inline]
    pub fn is_state_error(&self) -> bool {
        matches!(self.reason, RejectReason::StateError(_))
    }
}
