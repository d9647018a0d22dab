//! Module with the pattern parser.
//!
//! A pattern is a sequence of segments. Text segments are written in a small regex-like
//! language, matcher segments are spliced in as atoms:
//!
//! ```rust
//! use automatch::{pattern, Automaton, Matcher};
//!
//! let digit: Matcher = "[0-9]".parse().unwrap();
//! let number = pattern!("'-'? (", digit, ")+").unwrap();
//! let automaton = Automaton::from_matcher(&number).unwrap();
//! assert!(automaton.matches("-42"));
//! assert!(!automaton.matches("4-2"));
//! ```
//!
//! | Syntax        | Meaning                                        |
//! |---------------|------------------------------------------------|
//! | `abc`         | the characters `a`, `b` and `c` in sequence    |
//! | `'a b'` `"x"` | a quoted literal with backslash escapes        |
//! | `(...)`       | a group                                        |
//! | `a \| b`      | a choice                                       |
//! | `[a-z_]`      | a character class                              |
//! | `.`           | any character                                  |
//! | `~x`          | any character that `x` does not match          |
//! | `<name>`      | a rule reference                               |
//! | `* + ? {m,n}` | repetitions of the preceding atom              |
//!
//! Whitespace outside of quoted literals and character classes is insignificant.
//!
//! Every bare character is an atom of its own, so a repetition binds to the last character
//! only: `ab*` is an `a` followed by any number of `b`. Quote or group a word to repeat it as a
//! whole, as in `'ab'*` or `(ab)*`.

use crate::{AutomatchError, CharRangeSet, CodeRange, Matcher, Result, SyntaxErrorKind};

/// A piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Pattern text.
    Text(String),
    /// A matcher that is used as an atom.
    Matcher(Matcher),
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Segment::Text(text.to_string())
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Segment::Text(text)
    }
}

impl From<char> for Segment {
    fn from(c: char) -> Self {
        Segment::Text(c.to_string())
    }
}

impl From<Matcher> for Segment {
    fn from(matcher: Matcher) -> Self {
        Segment::Matcher(matcher)
    }
}

impl From<&Matcher> for Segment {
    fn from(matcher: &Matcher) -> Self {
        Segment::Matcher(matcher.clone())
    }
}

macro_rules! segment_from_number {
    ($($tp:ty),*) => {
        $(
            impl From<$tp> for Segment {
                fn from(value: $tp) -> Self {
                    Segment::Text(value.to_string())
                }
            }
        )*
    };
}

segment_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Parse the given segments into a [Matcher].
///
/// ```rust
/// use automatch::{pattern, Matcher};
///
/// let inner = Matcher::literal("xy");
/// let matcher = pattern!("a(", inner, ")*").unwrap();
/// assert_eq!(matcher.to_string(), "'a' 'xy'*");
/// ```
#[macro_export]
macro_rules! pattern {
    ($($segment:expr),+ $(,)?) => {
        $crate::PatternParser::new(vec![$($crate::Segment::from($segment)),+]).parse()
    };
}

/// The parser of the pattern language.
#[derive(Debug, Clone)]
pub struct PatternParser {
    segments: Vec<Segment>,
    case_sensitive: bool,
}

impl PatternParser {
    /// Create a parser for the given segments. Consecutive text segments are joined, so piece
    /// indices in errors refer to the joined segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        let mut joined: Vec<Segment> = Vec::with_capacity(segments.len());
        for segment in segments {
            match (joined.last_mut(), segment) {
                (Some(Segment::Text(last)), Segment::Text(text)) => last.push_str(&text),
                (_, segment) => joined.push(segment),
            }
        }
        PatternParser {
            segments: joined,
            case_sensitive: true,
        }
    }

    /// Set whether literal characters match case sensitively. The default is `true`.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Parse the segments into a single matcher.
    pub fn parse(&self) -> Result<Matcher> {
        let mut parser = Parser::new(&self.segments, self.case_sensitive);
        parser.parse_alternatives(0)
    }
}

#[derive(Debug, Clone, Copy)]
enum Item<'a> {
    Char { c: char, piece: usize, offset: usize },
    Matcher { matcher: &'a Matcher, piece: usize },
}

struct Parser<'a> {
    items: Vec<Item<'a>>,
    pos: usize,
    case_sensitive: bool,
    // Location reported for errors at the end of the input
    end: (usize, usize),
}

impl<'a> Parser<'a> {
    fn new(segments: &'a [Segment], case_sensitive: bool) -> Self {
        let mut items = Vec::new();
        let mut end = (0, 0);
        for (piece, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Text(text) => {
                    let mut length = 0;
                    for (offset, c) in text.chars().enumerate() {
                        items.push(Item::Char { c, piece, offset });
                        length = offset + 1;
                    }
                    end = (piece, length);
                }
                Segment::Matcher(matcher) => {
                    items.push(Item::Matcher { matcher, piece });
                    end = (piece, 1);
                }
            }
        }
        Parser {
            items,
            pos: 0,
            case_sensitive,
            end,
        }
    }

    fn peek(&self) -> Option<Item<'a>> {
        self.items.get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        match self.peek() {
            Some(Item::Char { c, .. }) => Some(c),
            _ => None,
        }
    }

    fn peek_char_at(&self, ahead: usize) -> Option<char> {
        match self.items.get(self.pos + ahead) {
            Some(Item::Char { c, .. }) => Some(*c),
            _ => None,
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Consume the next item if it is a character.
    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.advance();
        Some(c)
    }

    fn error(&self, kind: SyntaxErrorKind) -> AutomatchError {
        self.error_at(self.pos, kind)
    }

    fn error_at(&self, pos: usize, kind: SyntaxErrorKind) -> AutomatchError {
        let (piece, offset) = match self.items.get(pos) {
            Some(Item::Char { piece, offset, .. }) => (*piece, *offset),
            Some(Item::Matcher { piece, .. }) => (*piece, 0),
            None => self.end,
        };
        AutomatchError::syntax(kind, piece, offset)
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn parse_alternatives(&mut self, depth: usize) -> Result<Matcher> {
        let start = self.pos;
        let mut alternatives = Vec::new();
        let mut sequence: Vec<Matcher> = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    if depth > 0 {
                        return Err(self.error(SyntaxErrorKind::MissingGroupClose));
                    }
                    break;
                }
                Some(Item::Char { c: '|', .. }) => {
                    self.advance();
                    if !sequence.is_empty() {
                        alternatives.push(Matcher::Chain(std::mem::take(&mut sequence)).deflate());
                    }
                }
                Some(Item::Char { c: ')', .. }) => {
                    if depth == 0 {
                        return Err(self.error(SyntaxErrorKind::UnmatchedGroupClose));
                    }
                    self.advance();
                    break;
                }
                Some(Item::Char {
                    c: '*' | '+' | '?' | '{',
                    ..
                }) => {
                    let Some(atom) = sequence.pop() else {
                        return Err(self.error(SyntaxErrorKind::NothingToRepeat));
                    };
                    let (min, max) = self.parse_quantifier()?;
                    sequence.push(Matcher::repeat(atom, min, max));
                }
                Some(_) => {
                    let atom = self.parse_atom()?;
                    sequence.push(atom);
                }
            }
        }
        if !sequence.is_empty() {
            alternatives.push(Matcher::Chain(sequence).deflate());
        }
        if alternatives.is_empty() {
            let kind = if depth > 0 {
                SyntaxErrorKind::EmptyGroup
            } else {
                SyntaxErrorKind::EmptyPattern
            };
            return Err(self.error_at(start, kind));
        }
        Ok(Matcher::Choice(alternatives).deflate())
    }

    fn parse_atom(&mut self) -> Result<Matcher> {
        let pos = self.pos;
        let c = match self.peek() {
            None => return Err(self.error(SyntaxErrorKind::UnexpectedEnd)),
            Some(Item::Matcher { matcher, .. }) => {
                self.advance();
                return Ok(matcher.clone());
            }
            Some(Item::Char { c, .. }) => c,
        };
        self.advance();
        match c {
            '(' => self.parse_alternatives(1),
            '\'' | '"' => self.parse_quoted(c, pos),
            '`' => Err(self.error_at(pos, SyntaxErrorKind::BacktickLiteral)),
            '[' => self.parse_class(pos),
            ']' => Err(self.error_at(pos, SyntaxErrorKind::UnmatchedClassClose)),
            '<' => self.parse_reference(),
            '>' => Err(self.error_at(pos, SyntaxErrorKind::UnmatchedAngleClose)),
            '.' => Ok(Matcher::Any),
            '~' => {
                self.skip_whitespace();
                match self.peek() {
                    None | Some(Item::Char {
                        c: ')' | '|' | '*' | '+' | '?' | '{',
                        ..
                    }) => Err(self.error_at(pos, SyntaxErrorKind::DanglingNegation)),
                    Some(_) => Ok(Matcher::negate(self.parse_atom()?)),
                }
            }
            '\\' => {
                let c = self.parse_escape(pos)?;
                Ok(self.literal(c.to_string()))
            }
            c if c.is_ascii_punctuation() && c != '_' => {
                Err(self.error_at(pos, SyntaxErrorKind::UnexpectedPunctuation(c)))
            }
            c => Ok(self.literal(c.to_string())),
        }
    }

    fn parse_quoted(&mut self, quote: char, start: usize) -> Result<Matcher> {
        let mut text = String::new();
        loop {
            let pos = self.pos;
            match self.next_char() {
                None => return Err(self.error(SyntaxErrorKind::UnterminatedQuote(quote))),
                Some(c) if c == quote => break,
                Some('\\') => text.push(self.parse_escape(pos)?),
                Some(c) => text.push(c),
            }
        }
        if text.is_empty() {
            return Err(self.error_at(start, SyntaxErrorKind::EmptyLiteral));
        }
        Ok(self.literal(text))
    }

    fn parse_class(&mut self, start: usize) -> Result<Matcher> {
        let mut ranges = Vec::new();
        loop {
            let pos = self.pos;
            let begin = match self.next_char() {
                None => return Err(self.error(SyntaxErrorKind::UnterminatedClass)),
                Some(']') => break,
                Some('[') => {
                    return Err(self.error_at(pos, SyntaxErrorKind::UnexpectedClassChar('[')))
                }
                Some('\\') => self.parse_escape(pos)?,
                Some(c) => c,
            };
            let is_range = self.peek_char() == Some('-')
                && self.peek_char_at(1).is_some_and(|c| c != ']');
            if !is_range {
                ranges.push(CodeRange::single(begin));
                continue;
            }
            self.advance();
            let pos = self.pos;
            let end = match self.next_char() {
                None => return Err(self.error(SyntaxErrorKind::UnterminatedClass)),
                Some('[') => {
                    return Err(self.error_at(pos, SyntaxErrorKind::UnexpectedClassChar('[')))
                }
                Some('\\') => self.parse_escape(pos)?,
                Some(c) => c,
            };
            if begin > end {
                return Err(self.error_at(pos, SyntaxErrorKind::InvalidClassRange(begin, end)));
            }
            ranges.push(CodeRange::from(begin..=end));
        }
        if ranges.is_empty() {
            return Err(self.error_at(start, SyntaxErrorKind::EmptyClass));
        }
        let set = CharRangeSet::new(ranges);
        if self.case_sensitive {
            Ok(Matcher::Ranges(set))
        } else {
            Ok(Matcher::Ranges(set.ascii_case_fold()))
        }
    }

    fn parse_reference(&mut self) -> Result<Matcher> {
        let mut name = String::new();
        loop {
            match self.next_char() {
                Some('>') if !name.is_empty() => return Ok(Matcher::Rule(name)),
                Some(c) if !c.is_whitespace() && c != '<' && c != '>' => name.push(c),
                _ => return Err(self.error(SyntaxErrorKind::UnterminatedReference)),
            }
        }
    }

    /// Parse a quantifier. The current item is one of `*`, `+`, `?` or `{`.
    fn parse_quantifier(&mut self) -> Result<(u32, Option<u32>)> {
        let start = self.pos;
        match self.next_char() {
            Some('*') => return Ok((0, None)),
            Some('+') => return Ok((1, None)),
            Some('?') => return Ok((0, Some(1))),
            _ => {}
        }
        let mut content = String::new();
        loop {
            match self.next_char() {
                Some('}') => break,
                Some(c) if c.is_whitespace() => {}
                Some(c) => content.push(c),
                None => {
                    return Err(self.error_at(start, SyntaxErrorKind::InvalidQuantifier(content)))
                }
            }
        }
        let number = |text: &str| text.parse::<u32>().ok();
        let bounds = match content.split_once(',') {
            None => number(&content).map(|n| (n, Some(n))),
            Some(("", "")) => None,
            Some((min, "")) => number(min).map(|min| (min, None)),
            Some(("", max)) => number(max).map(|max| (0, Some(max))),
            Some((min, max)) => number(min).zip(number(max)).map(|(min, max)| (min, Some(max))),
        };
        match bounds {
            Some((min, Some(max))) if min <= max => Ok((min, Some(max))),
            Some((min, None)) => Ok((min, None)),
            _ => Err(self.error_at(start, SyntaxErrorKind::InvalidQuantifier(content))),
        }
    }

    /// Parse an escape sequence. The backslash at `start` has been consumed.
    fn parse_escape(&mut self, start: usize) -> Result<char> {
        let Some(c) = self.next_char() else {
            return Err(self.error_at(start, SyntaxErrorKind::InvalidEscape("\\".to_string())));
        };
        let digits = match c {
            'n' => return Ok('\n'),
            't' => return Ok('\t'),
            'r' => return Ok('\r'),
            'f' => return Ok('\x0C'),
            'v' => return Ok('\x0B'),
            '0' => return Ok('\0'),
            'a' => return Ok('\x07'),
            'b' => return Ok('\x08'),
            'x' => 2,
            'u' | 'X' => 4,
            'U' => 8,
            c => return Ok(c),
        };
        let mut text = format!("\\{}", c);
        let mut code = 0u32;
        for _ in 0..digits {
            let Some(d) = self.peek_char() else {
                return Err(self.error_at(start, SyntaxErrorKind::InvalidEscape(text)));
            };
            text.push(d);
            let Some(digit) = d.to_digit(16) else {
                return Err(self.error_at(start, SyntaxErrorKind::InvalidEscape(text)));
            };
            self.advance();
            code = code * 16 + digit;
        }
        char::from_u32(code)
            .ok_or_else(|| self.error_at(start, SyntaxErrorKind::EscapeOutOfRange(code)))
    }

    /// A literal for the given text that honors the case sensitivity.
    fn literal(&self, text: String) -> Matcher {
        if self.case_sensitive || !text.chars().any(has_case_variant) {
            return Matcher::Literal(text);
        }
        let elements = text
            .chars()
            .map(|c| {
                if has_case_variant(c) {
                    Matcher::Ranges(case_variants(c))
                } else {
                    Matcher::Literal(c.to_string())
                }
            })
            .collect();
        Matcher::Chain(elements).deflate()
    }
}

fn single_mapping(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    let c = mapping.next()?;
    mapping.next().is_none().then_some(c)
}

/// The character and its simple lower and upper case mappings.
fn case_variants(c: char) -> CharRangeSet {
    let mut variants = vec![CodeRange::single(c)];
    variants.extend(single_mapping(c.to_lowercase()).map(CodeRange::single));
    variants.extend(single_mapping(c.to_uppercase()).map(CodeRange::single));
    CharRangeSet::new(variants)
}

fn has_case_variant(c: char) -> bool {
    case_variants(c).size() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AutomatchErrorKind;

    fn parse(text: &str) -> Matcher {
        PatternParser::new(vec![text.into()]).parse().unwrap()
    }

    fn syntax_error(text: &str) -> (SyntaxErrorKind, usize, usize) {
        let err = PatternParser::new(vec![text.into()]).parse().unwrap_err();
        match *err.source {
            AutomatchErrorKind::Syntax {
                kind,
                piece,
                offset,
            } => (kind, piece, offset),
            other => panic!("Expected a syntax error, got {:?}", other),
        }
    }

    fn lit(text: &str) -> Matcher {
        Matcher::literal(text)
    }

    #[test]
    fn test_choice_of_characters() {
        assert_eq!(parse("a|b"), Matcher::choice(vec![lit("a"), lit("b")]));
    }

    #[test]
    fn test_group_repeat() {
        assert_eq!(
            parse("(ab)+"),
            Matcher::repeat(Matcher::chain(vec![lit("a"), lit("b")]), 1, None)
        );
    }

    #[test]
    fn test_class_repeat() {
        assert_eq!(
            parse("[a-z]+"),
            Matcher::repeat(Matcher::ranges(CharRangeSet::from_range('a', 'z')), 1, None)
        );
    }

    #[test]
    fn test_quantifier_binds_to_last_character() {
        assert_eq!(
            parse("ab*"),
            Matcher::chain(vec![lit("a"), Matcher::repeat(lit("b"), 0, None)])
        );
        assert_eq!(
            parse("'ab'*"),
            Matcher::repeat(lit("ab"), 0, None)
        );
    }

    #[test]
    fn test_quantifiers() {
        let cases = [
            ("x?", 0, Some(1)),
            ("x{3}", 3, Some(3)),
            ("x{ 2 , }", 2, None),
            ("x{,4}", 0, Some(4)),
            ("x{1,5}", 1, Some(5)),
        ];
        for (text, min, max) in cases {
            assert_eq!(parse(text), Matcher::repeat(lit("x"), min, max), "{}", text);
        }
    }

    #[test]
    fn test_whitespace_and_empty_alternatives() {
        assert_eq!(parse(" a | | b "), parse("a|b"));
        assert_eq!(parse("(a|)"), lit("a"));
    }

    #[test]
    fn test_class_hyphens_and_escapes() {
        assert_eq!(
            parse("[-a\\]\\n-]"),
            Matcher::ranges(CharRangeSet::new(['-', 'a', ']', '\n']))
        );
        assert_eq!(
            parse("[\\x41-\\u0043]"),
            Matcher::ranges(CharRangeSet::from_range('A', 'C'))
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse("'\\t\\a\\b\\f\\v\\0'"), lit("\t\x07\x08\x0C\x0B\0"));
        assert_eq!(parse("\\U0001F600"), lit("\u{1F600}"));
        assert_eq!(parse("\\X00e9"), lit("é"));
        assert_eq!(parse("\\*"), lit("*"));
        assert_eq!(parse("\"it's\""), lit("it's"));
    }

    #[test]
    fn test_negation_and_rules() {
        assert_eq!(
            parse("~ [0-9] <ident>"),
            Matcher::chain(vec![
                Matcher::negate(Matcher::ranges(CharRangeSet::from_range('0', '9'))),
                Matcher::rule("ident"),
            ])
        );
        assert_eq!(
            parse("~a*"),
            Matcher::repeat(Matcher::negate(lit("a")), 0, None)
        );
        assert_eq!(parse("."), Matcher::Any);
    }

    #[test]
    fn test_matcher_segments() {
        let digit = Matcher::ranges(CharRangeSet::from_range('0', '9'));
        let matcher = PatternParser::new(vec![
            "x".into(),
            digit.clone().into(),
            "+ y".into(),
            'z'.into(),
            7u8.into(),
        ])
        .parse()
        .unwrap();
        assert_eq!(
            matcher,
            Matcher::chain(vec![
                lit("x"),
                Matcher::repeat(digit, 1, None),
                lit("y"),
                lit("z"),
                lit("7"),
            ])
        );
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = PatternParser::new(vec!["'a1' [x-y]".into()])
            .case_sensitive(false)
            .parse()
            .unwrap();
        assert_eq!(
            matcher,
            Matcher::chain(vec![
                Matcher::chain(vec![
                    Matcher::ranges(CharRangeSet::new(['a', 'A'])),
                    lit("1"),
                ]),
                Matcher::ranges(CharRangeSet::new(['x'..='y', 'X'..='Y'])),
            ])
        );
    }

    #[test]
    fn test_syntax_errors() {
        let cases = [
            ("", SyntaxErrorKind::EmptyPattern, 0),
            ("a()", SyntaxErrorKind::EmptyGroup, 2),
            ("a)", SyntaxErrorKind::UnmatchedGroupClose, 1),
            ("(a", SyntaxErrorKind::MissingGroupClose, 2),
            ("'ab", SyntaxErrorKind::UnterminatedQuote('\''), 3),
            ("[ab", SyntaxErrorKind::UnterminatedClass, 3),
            ("a]", SyntaxErrorKind::UnmatchedClassClose, 1),
            ("[]", SyntaxErrorKind::EmptyClass, 0),
            ("[z-a]", SyntaxErrorKind::InvalidClassRange('z', 'a'), 3),
            ("*a", SyntaxErrorKind::NothingToRepeat, 0),
            ("a|+", SyntaxErrorKind::NothingToRepeat, 2),
            ("a{x}", SyntaxErrorKind::InvalidQuantifier("x".to_string()), 1),
            ("a{3,2}", SyntaxErrorKind::InvalidQuantifier("3,2".to_string()), 1),
            ("a{,}", SyntaxErrorKind::InvalidQuantifier(",".to_string()), 1),
            ("\\xG1", SyntaxErrorKind::InvalidEscape("\\xG".to_string()), 0),
            ("\\UFFFFFFFF", SyntaxErrorKind::EscapeOutOfRange(0xFFFFFFFF), 0),
            ("\\uD800", SyntaxErrorKind::EscapeOutOfRange(0xD800), 0),
            ("a;", SyntaxErrorKind::UnexpectedPunctuation(';'), 1),
            ("<ab", SyntaxErrorKind::UnterminatedReference, 3),
            ("a>", SyntaxErrorKind::UnmatchedAngleClose, 1),
            ("a~", SyntaxErrorKind::DanglingNegation, 1),
            ("`a`", SyntaxErrorKind::BacktickLiteral, 0),
            ("''", SyntaxErrorKind::EmptyLiteral, 0),
        ];
        for (text, kind, offset) in cases {
            assert_eq!(syntax_error(text), (kind, 0, offset), "{}", text);
        }
    }

    #[test]
    fn test_error_piece_index() {
        let err = pattern!("a", Matcher::Any, "(").unwrap_err();
        assert_eq!(
            err,
            AutomatchError::syntax(SyntaxErrorKind::MissingGroupClose, 2, 1)
        );
    }
}
