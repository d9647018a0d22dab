use std::collections::HashMap;
use std::fmt::{self, Write};
use std::hash::BuildHasher;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    char_range_set::write_code_point, AutomatchErrorKind, CharRangeSet, Graph, PatternParser,
    Result, Segment, SubGraph,
};

/// A composable description of a set of strings.
///
/// Matchers are built directly with the constructor functions or parsed from pattern text with
/// [PatternParser] (or `str::parse`). They are compiled into a [Graph] with [Matcher::compile]
/// and executed by an [crate::Automaton].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Matcher {
    /// A non-empty sequence of characters.
    Literal(String),
    /// The elements in sequence.
    Chain(Vec<Matcher>),
    /// Any one of the alternatives.
    Choice(Vec<Matcher>),
    /// Any single character.
    Any,
    /// A single character from the set.
    Ranges(CharRangeSet),
    /// The inner matcher `min` to `max` times. `None` means unbounded.
    Repeat {
        /// The repeated matcher.
        matcher: Box<Matcher>,
        /// The minimum number of repetitions.
        min: u32,
        /// The maximum number of repetitions, unbounded if `None`.
        max: Option<u32>,
    },
    /// A single character that the inner single-character matcher does not match.
    Negate(Box<Matcher>),
    /// A reference to a named rule, see [Matcher::resolve_rules].
    Rule(String),
}

impl Matcher {
    /// A literal matcher.
    pub fn literal<S: Into<String>>(text: S) -> Self {
        Matcher::Literal(text.into())
    }

    /// A chain matcher.
    pub fn chain(elements: Vec<Matcher>) -> Self {
        Matcher::Chain(elements)
    }

    /// A choice matcher.
    pub fn choice(alternatives: Vec<Matcher>) -> Self {
        Matcher::Choice(alternatives)
    }

    /// A matcher for a single character of the given set.
    pub fn ranges(set: CharRangeSet) -> Self {
        Matcher::Ranges(set)
    }

    /// A repetition of the given matcher.
    pub fn repeat(matcher: Matcher, min: u32, max: Option<u32>) -> Self {
        Matcher::Repeat {
            matcher: Box::new(matcher),
            min,
            max,
        }
    }

    /// The negation of a single-character matcher.
    pub fn negate(matcher: Matcher) -> Self {
        Matcher::Negate(Box::new(matcher))
    }

    /// A reference to a named rule.
    pub fn rule<S: Into<String>>(name: S) -> Self {
        Matcher::Rule(name.into())
    }

    /// Compile the matcher into the given graph. The returned [SubGraph] has one root and the
    /// tail nodes in which the matched text ends.
    pub fn compile(&self, graph: &mut Graph) -> Result<SubGraph> {
        crate::internal::nfa::compile(self, graph)
    }

    /// Replace every rule reference with the matcher the resolver returns for its name.
    /// Unknown names and rules that refer to themselves are errors.
    pub fn resolve_rules(&self, resolver: &dyn RuleResolver) -> Result<Matcher> {
        let mut stack = Vec::new();
        self.resolve_with(resolver, &mut stack)
    }

    fn resolve_with(&self, resolver: &dyn RuleResolver, stack: &mut Vec<String>) -> Result<Matcher> {
        let resolve_all = |matchers: &[Matcher], stack: &mut Vec<String>| {
            matchers
                .iter()
                .map(|m| m.resolve_with(resolver, stack))
                .collect::<Result<Vec<_>>>()
        };
        Ok(match self {
            Matcher::Rule(name) => {
                if stack.contains(name) {
                    return Err(AutomatchErrorKind::RecursiveRule(name.clone()).into());
                }
                let target = resolver
                    .resolve(name)
                    .ok_or_else(|| AutomatchErrorKind::UnresolvedRule(name.clone()))?;
                stack.push(name.clone());
                let resolved = target.resolve_with(resolver, stack);
                stack.pop();
                resolved?
            }
            Matcher::Chain(elements) => Matcher::Chain(resolve_all(elements, stack)?),
            Matcher::Choice(alternatives) => Matcher::Choice(resolve_all(alternatives, stack)?),
            Matcher::Repeat { matcher, min, max } => Matcher::Repeat {
                matcher: Box::new(matcher.resolve_with(resolver, stack)?),
                min: *min,
                max: *max,
            },
            Matcher::Negate(matcher) => Matcher::negate(matcher.resolve_with(resolver, stack)?),
            Matcher::Literal(_) | Matcher::Any | Matcher::Ranges(_) => self.clone(),
        })
    }

    /// Collapse chains and choices with a single element into that element.
    pub(crate) fn deflate(self) -> Matcher {
        match self {
            Matcher::Chain(mut elements) | Matcher::Choice(mut elements) if elements.len() == 1 => {
                elements.remove(0).deflate()
            }
            other => other,
        }
    }

    /// Returns true if the matcher matches the empty string.
    pub fn is_nullable(&self) -> bool {
        match self {
            Matcher::Literal(text) => text.is_empty(),
            Matcher::Chain(elements) => elements.iter().all(Matcher::is_nullable),
            Matcher::Choice(alternatives) => alternatives.iter().any(Matcher::is_nullable),
            Matcher::Any | Matcher::Ranges(_) | Matcher::Negate(_) | Matcher::Rule(_) => false,
            Matcher::Repeat { matcher, min, .. } => *min == 0 || matcher.is_nullable(),
        }
    }

    /// The set of characters if the matcher matches exactly one character.
    pub(crate) fn char_set(&self) -> Option<CharRangeSet> {
        match self {
            Matcher::Literal(text) => {
                let mut chars = text.chars();
                let c = chars.next()?;
                chars.next().is_none().then(|| CharRangeSet::from_char(c))
            }
            Matcher::Ranges(set) => (!set.is_empty()).then(|| set.clone()),
            Matcher::Any => Some(CharRangeSet::full()),
            Matcher::Choice(alternatives) if !alternatives.is_empty() => alternatives
                .iter()
                .try_fold(CharRangeSet::empty(), |acc, m| {
                    m.char_set().map(|set| acc.union(&set))
                }),
            Matcher::Chain(elements) if elements.len() == 1 => elements[0].char_set(),
            Matcher::Repeat {
                matcher,
                min: 1,
                max: Some(1),
            } => matcher.char_set(),
            Matcher::Negate(matcher) => matcher.char_set().map(|set| set.complement()),
            _ => None,
        }
    }

    fn fmt_atom(&self, f: &mut fmt::Formatter<'_>, group_repeats: bool) -> fmt::Result {
        match self {
            Matcher::Chain(_) | Matcher::Choice(_) => write!(f, "({})", self),
            Matcher::Repeat { .. } if group_repeats => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

/// Renders the matcher in pattern syntax. Parsing the output yields an equal matcher.
impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(text) => {
                f.write_char('\'')?;
                for c in text.chars() {
                    write_code_point(f, c as u32, "'\\")?;
                }
                f.write_char('\'')
            }
            Matcher::Chain(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    match element {
                        Matcher::Choice(_) => write!(f, "({})", element)?,
                        _ => write!(f, "{}", element)?,
                    }
                }
                Ok(())
            }
            Matcher::Choice(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", alternative)?;
                }
                Ok(())
            }
            Matcher::Any => f.write_char('.'),
            Matcher::Ranges(set) => write!(f, "{}", set),
            Matcher::Repeat { matcher, min, max } => {
                matcher.fmt_atom(f, false)?;
                match (min, max) {
                    (0, None) => f.write_char('*'),
                    (1, None) => f.write_char('+'),
                    (0, Some(1)) => f.write_char('?'),
                    (min, None) => write!(f, "{{{},}}", min),
                    (min, Some(max)) if min == max => write!(f, "{{{}}}", min),
                    (0, Some(max)) => write!(f, "{{,{}}}", max),
                    (min, Some(max)) => write!(f, "{{{},{}}}", min, max),
                }
            }
            Matcher::Negate(matcher) => {
                f.write_char('~')?;
                matcher.fmt_atom(f, true)
            }
            Matcher::Rule(name) => write!(f, "<{}>", name),
        }
    }
}

impl std::str::FromStr for Matcher {
    type Err = crate::AutomatchError;

    fn from_str(s: &str) -> Result<Self> {
        PatternParser::new(vec![Segment::from(s)]).parse()
    }
}

/// Supplies the matchers for rule references.
pub trait RuleResolver {
    /// Get the matcher of the rule with the given name.
    fn resolve(&self, name: &str) -> Option<&Matcher>;
}

impl<S: BuildHasher> RuleResolver for HashMap<String, Matcher, S> {
    fn resolve(&self, name: &str) -> Option<&Matcher> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::AutomatchError;

    fn parse(text: &str) -> Matcher {
        text.parse::<Matcher>().unwrap()
    }

    #[test]
    fn test_display() {
        let matcher = Matcher::chain(vec![
            Matcher::literal("if"),
            Matcher::repeat(Matcher::ranges(CharRangeSet::from_range('a', 'z')), 1, None),
            Matcher::choice(vec![Matcher::literal("x"), Matcher::Any]),
            Matcher::repeat(Matcher::literal("y"), 2, Some(3)),
            Matcher::negate(Matcher::literal("'")),
            Matcher::rule("ident"),
        ]);
        assert_eq!(
            matcher.to_string(),
            r"'if' [a-z]+ ('x' | .) 'y'{2,3} ~'\'' <ident>"
        );
    }

    #[test]
    fn test_display_parses_back() {
        for text in [
            "a(b|c)*d",
            "[a-z]{2,3}",
            "'cat' | 'car'",
            "~[0-9] x? y{,4} z{2,}",
            "(ab)+ . ~(x|y)",
            "'tab\\t' [\\-\\]]",
        ] {
            let matcher = parse(text);
            let rendered = matcher.to_string();
            assert_eq!(parse(&rendered), matcher, "{} rendered as {}", text, rendered);
        }
    }

    #[test]
    fn test_char_set() {
        assert_eq!(
            parse("a|[x-z]").char_set(),
            Some(CharRangeSet::new(['a'..='a', 'x'..='z']))
        );
        assert_eq!(parse("~a").char_set(), Some(CharRangeSet::from_char('a').complement()));
        assert_eq!(parse("ab").char_set(), None);
        assert_eq!(parse("a*").char_set(), None);
        assert_eq!(Matcher::rule("x").char_set(), None);
    }

    #[test]
    fn test_nullable() {
        for text in ["a*", "a?", "(a|b?)", "(a?){2}", "a* b{0,3}"] {
            assert!(parse(text).is_nullable(), "{}", text);
        }
        for text in ["a", "a+", ".", "~a", "a? b", "(a|b)+", "<rule>"] {
            assert!(!parse(text).is_nullable(), "{}", text);
        }
    }

    #[test]
    fn test_resolve_rules() {
        let mut rules = FxHashMap::default();
        rules.insert("digit".to_string(), parse("[0-9]"));
        rules.insert("number".to_string(), parse("<digit>+"));
        let resolved = parse("'#' <number>").resolve_rules(&rules).unwrap();
        assert_eq!(
            resolved,
            Matcher::chain(vec![
                Matcher::literal("#"),
                Matcher::repeat(Matcher::ranges(CharRangeSet::from_range('0', '9')), 1, None),
            ])
        );
    }

    #[test]
    fn test_resolve_rules_errors() {
        let mut rules: HashMap<String, Matcher> = HashMap::new();
        rules.insert("a".to_string(), parse("x <b>"));
        rules.insert("b".to_string(), parse("y | <a>"));
        let err = parse("<a>").resolve_rules(&rules).unwrap_err();
        assert_eq!(
            err,
            AutomatchError::new(AutomatchErrorKind::RecursiveRule("a".to_string()))
        );
        let err = parse("<c>").resolve_rules(&rules).unwrap_err();
        assert_eq!(
            err,
            AutomatchError::new(AutomatchErrorKind::UnresolvedRule("c".to_string()))
        );
    }
}
