#![forbid(missing_docs)]
//! # `automatch`
//! The `automatch` crate compiles a small regex-like pattern language into deterministic
//! character automata. It is designed to be used as the tokenizing layer of a parser that
//! matches one pattern at a time on a character stream and backtracks on rejection.
//!
//! Patterns are parsed into a tree of [Matcher]s, which can also be built directly. A matcher is
//! compiled into a [Graph] of nodes guarded by character sets, with epsilon nodes for choices and
//! repetitions. The [Automaton] removes the epsilon nodes and splits overlapping transitions once
//! at construction, so every run walks a single sequence of states.
//!
//! Nodes carry callbacks that run when a node is entered or left. Bounded repetitions are
//! counted this way, and callers can attach their own side effects or veto a match through the
//! per-run [RunState]. A state that stands for several paths through the graph runs each path's
//! callbacks on its own copy of the run state.
//!
//! # Example
//! ```rust
//! use automatch::{Automaton, Cursor, Matcher, RejectReason, StrCursor};
//!
//! let matcher: Matcher = "[a-zA-Z_][a-zA-Z0-9_]* | [0-9]+".parse().unwrap();
//! let automaton = Automaton::from_matcher(&matcher).unwrap();
//!
//! let mut cursor = StrCursor::new("count = 10");
//! let accepted = automaton.run(&mut cursor).unwrap();
//! assert_eq!(accepted.offset, 5);
//! assert_eq!(cursor.rest(), " = 10");
//!
//! // A rejected run leaves the cursor where it stopped; restore a snapshot to backtrack.
//! let snapshot = cursor.clone();
//! let rejection = automaton.run(&mut cursor).unwrap_err();
//! assert_eq!(rejection.reason, RejectReason::UnexpectedChar(' '));
//! cursor.restore(snapshot);
//! assert_eq!(cursor.offset(), 5);
//! ```
//!
//! # Crate features
//! - `dot_writer`: Rendering of graphs and automata in graphviz dot format. Enabled by default.
//! - `serde`: `Serialize` and `Deserialize` for [Matcher], [CharRangeSet] and [Position].
//!   Enabled by default.

/// Module with the deterministic automaton
mod automaton;
pub use automaton::{Accepted, Automaton};

/// Module with the character range sets used as transition guards
mod char_range_set;
pub use char_range_set::{CharRangeSet, CodeRange, CODE_POINT_MAX};

/// Module with the cursor trait and a string cursor
mod cursor;
pub use cursor::{Cursor, StrCursor};

/// Module with error definitions
mod errors;
pub use errors::{
    AutomatchError, AutomatchErrorKind, RejectReason, Rejection, Result, SyntaxErrorKind,
};

/// Module with the node graph
mod graph;
pub use graph::{Callback, CallbackResult, Graph, Node, SubGraph};

/// The module with internal implementation details.
mod internal;
pub use internal::{NodeID, ScratchKey};

/// Module with the matcher tree
mod matcher;
pub use matcher::{Matcher, RuleResolver};

/// Module with the pattern parser
mod pattern;
pub use pattern::{PatternParser, Segment};

/// Module that provides a position type
mod position;
pub use position::Position;

/// Module with the per-run state
mod run_state;
pub use run_state::RunState;
