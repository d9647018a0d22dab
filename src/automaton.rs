use log::{debug, error, trace, warn};

use crate::{
    internal::{determinize, nfa},
    Callback, Cursor, Graph, Matcher, NodeID, Position, RejectReason, Rejection, Result,
    RunState, StrCursor, SubGraph,
};

/// The outcome of an accepted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    /// The number of characters consumed.
    pub offset: usize,
    /// The cursor position after the match.
    pub position: Position,
}

/// A deterministic automaton that matches a character stream.
///
/// The automaton is built from a compiled [SubGraph] and made deterministic once at
/// construction. Afterwards it is immutable: [Automaton::run] keeps all mutable data in fresh
/// [RunState]s, so one automaton can serve many runs, also concurrently.
///
/// A state of the automaton can stand for several paths through the compiled graph, for instance
/// in `'cat' | 'car'` after the first character. A run follows each of these paths with its own
/// copy of the run state and dispatches the callbacks of each path on its own copy. A path is
/// dropped when its callbacks flag an error. The run is rejected when no path is left.
///
/// ```rust
/// use automatch::{Automaton, Cursor, Matcher, StrCursor};
///
/// let matcher: Matcher = "[a-z]{2,3}".parse().unwrap();
/// let automaton = Automaton::from_matcher(&matcher).unwrap();
/// assert!(automaton.matches("abc"));
/// assert!(!automaton.matches("abcd"));
///
/// let mut cursor = StrCursor::new("ab1");
/// let accepted = automaton.run(&mut cursor).unwrap();
/// assert_eq!(accepted.offset, 2);
/// assert_eq!(cursor.peek(), Some('1'));
/// ```
#[derive(Debug, Clone)]
pub struct Automaton {
    graph: Graph,
    // The synthetic epsilon start node in front of the compiled root, replaced by the start
    // state on determinization
    start: NodeID,
    determinized: bool,
}

impl Automaton {
    /// Create an automaton from the compiled fragment of the given graph.
    /// All tails of the fragment are marked terminal.
    pub fn new(mut graph: Graph, subgraph: SubGraph) -> Self {
        for tail in &subgraph.tails {
            graph.mark_terminal(*tail);
        }
        let start = graph.add_epsilon();
        graph.link(start, subgraph.root);
        let mut automaton = Automaton {
            graph,
            start,
            determinized: false,
        };
        automaton.determinize();
        automaton
    }

    /// Compile the matcher and create an automaton from it.
    pub fn from_matcher(matcher: &Matcher) -> Result<Self> {
        let mut graph = Graph::new();
        let subgraph = matcher.compile(&mut graph)?;
        Ok(Automaton::new(graph, subgraph))
    }

    /// Remove all epsilon transitions and split overlapping transitions.
    /// Only the first call has an effect.
    pub fn determinize(&mut self) {
        if self.determinized {
            return;
        }
        let before = self.graph.len();
        self.start = determinize::determinize(&mut self.graph, self.start);
        self.determinized = true;
        debug!(
            "Determinized automaton: {} nodes compiled, {} nodes in arena, {} reachable",
            before,
            self.graph.len(),
            nfa::reachable(&self.graph, self.start).len()
        );
    }

    /// Returns true if every reachable node has only non-epsilon successors with pairwise
    /// disjoint guards.
    pub fn is_deterministic(&self) -> bool {
        determinize::is_deterministic(&self.graph, self.start)
    }

    /// The node graph of the automaton.
    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The start node of the automaton.
    #[inline]
    pub fn start(&self) -> NodeID {
        self.start
    }

    /// Run the automaton on the cursor.
    ///
    /// The cursor is advanced over the consumed characters. A run stops early when no live path
    /// has a transition for the next character and one of them may end here, so an accepted
    /// run does not imply that the input is exhausted. On rejection the cursor is left where the
    /// run stopped; callers restore a snapshot taken before the run to backtrack.
    pub fn run<C: Cursor>(&self, cursor: &mut C) -> std::result::Result<Accepted, Rejection> {
        let mut node = self.start;
        let mut last_error = None;
        let mut threads = Vec::with_capacity(1);
        for &member in self.graph[node].members() {
            let mut state = RunState::new(member);
            state.enter_node(member, self.graph[member].terminal);
            state.set_location(cursor.offset(), cursor.position());
            dispatch(self.graph[member].on_enter(), &mut state);
            match state.take_error() {
                Some(msg) => last_error = Some(msg),
                None => threads.push(state),
            }
        }
        if threads.is_empty() {
            let msg = last_error.unwrap_or_default();
            return Err(reject(RejectReason::StateError(msg), node, cursor));
        }

        while let Some(c) = cursor.peek() {
            let current = &self.graph[node];
            if current.next().iter().any(|n| self.graph[*n].is_epsilon()) {
                error!("Epsilon transition at node {} after determinization", node);
                return Err(reject(RejectReason::IllegalEpsilon, node, cursor));
            }
            let next = if self.can_advance(&threads, c) {
                current
                    .next()
                    .iter()
                    .copied()
                    .find(|n| self.graph[*n].guard().includes(c))
            } else {
                None
            };
            let Some(next) = next else {
                return self.finish(node, &threads, RejectReason::UnexpectedChar(c), cursor);
            };
            cursor.consume();
            node = next;
            let (advanced, error) = self.step(threads, c, cursor);
            threads = advanced;
            trace!("{} live paths in state {}", threads.len(), node);
            if threads.is_empty() {
                let reason =
                    error.map_or(RejectReason::UnexpectedChar(c), RejectReason::StateError);
                return Err(reject(reason, node, cursor));
            }
        }

        self.finish(node, &threads, RejectReason::Incomplete, cursor)
    }

    /// Returns true if any path has a successor for the character `c`.
    fn can_advance(&self, threads: &[RunState], c: char) -> bool {
        threads.iter().any(|thread| {
            self.graph[thread.current_node()]
                .next()
                .iter()
                .any(|n| self.graph[*n].guard().includes(c))
        })
    }

    /// Advance every path over the consumed character `c`. A path forks if several of its
    /// successors accept `c` and is dropped if it has none or its callbacks flag an error.
    /// Returns the remaining paths and the last flagged error.
    fn step<C: Cursor>(
        &self,
        threads: Vec<RunState>,
        c: char,
        cursor: &C,
    ) -> (Vec<RunState>, Option<String>) {
        let mut last_error = None;
        let mut advanced: Vec<RunState> = Vec::with_capacity(threads.len());
        for thread in threads {
            let member = &self.graph[thread.current_node()];
            for &next in member.next() {
                let target = &self.graph[next];
                if !target.guard().includes(c) {
                    continue;
                }
                let mut state = thread.clone();
                state.set_location(cursor.offset(), cursor.position());
                dispatch(member.on_exit(), &mut state);
                state.enter_node(next, target.terminal);
                dispatch(target.on_enter(), &mut state);
                match state.take_error() {
                    Some(msg) => last_error = Some(msg),
                    None => {
                        if !advanced.contains(&state) {
                            advanced.push(state);
                        }
                    }
                }
            }
        }
        (advanced, last_error)
    }

    /// End the run in the state `node`. The run is accepted if any path may end here.
    fn finish<C: Cursor>(
        &self,
        node: NodeID,
        threads: &[RunState],
        otherwise: RejectReason,
        cursor: &C,
    ) -> std::result::Result<Accepted, Rejection> {
        let mut last_error = None;
        for thread in threads {
            match self.accept(thread) {
                Some(Ok(())) => return Ok(self.accepted(cursor)),
                Some(Err(msg)) => last_error = Some(msg),
                None => (),
            }
        }
        let reason = last_error.map_or(otherwise, RejectReason::StateError);
        Err(reject(reason, node, cursor))
    }

    /// Returns true if the automaton accepts the whole text.
    pub fn matches(&self, text: &str) -> bool {
        let mut cursor = StrCursor::new(text);
        self.run(&mut cursor).is_ok() && cursor.is_end()
    }

    /// Render the reachable part of the automaton in graphviz dot format.
    #[cfg(feature = "dot_writer")]
    pub fn render_dot<W: std::io::Write>(&self, label: &str, output: &mut W) {
        let nodes = nfa::reachable(&self.graph, self.start);
        crate::internal::dot::graph_render(&self.graph, &nodes, Some(self.start), label, output);
    }

    /// Decide whether the match of a path may end in its current node.
    /// Returns `None` if the node is not terminal, otherwise whether the acceptance succeeded
    /// or the error message of the last failed accept path.
    fn accept(&self, state: &RunState) -> Option<std::result::Result<(), String>> {
        if state.is_terminal() {
            return Some(Ok(()));
        }
        let mut last_error = None;
        for path in self.graph[state.current_node()].accept_paths() {
            let mut trial = state.clone();
            dispatch(path, &mut trial);
            match trial.take_error() {
                None => return Some(Ok(())),
                Some(msg) => last_error = Some(msg),
            }
        }
        last_error.map(Err)
    }

    fn accepted<C: Cursor>(&self, cursor: &C) -> Accepted {
        let accepted = Accepted {
            offset: cursor.offset(),
            position: cursor.position(),
        };
        debug!("Accepted {} characters", accepted.offset);
        accepted
    }
}

fn reject<C: Cursor>(reason: RejectReason, node: NodeID, cursor: &C) -> Rejection {
    let rejection = Rejection {
        reason,
        node,
        offset: cursor.offset(),
        position: cursor.position(),
    };
    debug!("Rejected: {}", rejection);
    rejection
}

fn dispatch(callbacks: &[Callback], state: &mut RunState) {
    for callback in callbacks {
        if let Err(e) = callback.call(state) {
            warn!("Callback {} failed: {}", callback.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::CharRangeSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn automaton(text: &str) -> Automaton {
        Automaton::from_matcher(&text.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_literal_run() {
        init();
        let automaton = automaton("'ab'");
        assert!(automaton.is_deterministic());
        let mut cursor = StrCursor::new("abc");
        let accepted = automaton.run(&mut cursor).unwrap();
        assert_eq!(accepted.offset, 2);
        assert_eq!(accepted.position, Position::new(1, 3));
        assert_eq!(cursor.rest(), "c");

        let mut cursor = StrCursor::new("ac");
        let rejection = automaton.run(&mut cursor).unwrap_err();
        assert_eq!(rejection.reason, RejectReason::UnexpectedChar('c'));
        assert_eq!(rejection.offset, 1);

        let mut cursor = StrCursor::new("a");
        let rejection = automaton.run(&mut cursor).unwrap_err();
        assert_eq!(rejection.reason, RejectReason::Incomplete);
    }

    #[test]
    fn test_bounded_repeat() {
        init();
        let automaton = automaton("[a-z]{2,3}");
        assert!(automaton.matches("ab"));
        assert!(automaton.matches("abc"));

        let rejection = automaton.run(&mut StrCursor::new("a")).unwrap_err();
        assert_eq!(
            rejection.reason,
            RejectReason::StateError("Expected 2-3 repetitions, got 1".to_string())
        );
        let rejection = automaton.run(&mut StrCursor::new("abcd")).unwrap_err();
        assert_eq!(
            rejection.reason,
            RejectReason::StateError("Expected 2-3 repetitions, got 4".to_string())
        );
        assert_eq!(rejection.offset, 4);
    }

    #[test]
    fn test_empty_match() {
        init();
        let automaton = automaton("a*");
        let accepted = automaton.run(&mut StrCursor::new("")).unwrap();
        assert_eq!(accepted.offset, 0);
        assert!(automaton.matches("aaaa"));
        let accepted = automaton.run(&mut StrCursor::new("b")).unwrap();
        assert_eq!(accepted.offset, 0);
    }

    #[test]
    fn test_determinize_twice() {
        init();
        let mut automaton = automaton("a(b|c)*d");
        let nodes = automaton.graph().len();
        automaton.determinize();
        assert_eq!(automaton.graph().len(), nodes);
        assert!(automaton.matches("acbcd"));
    }

    #[test]
    fn test_custom_callbacks() {
        init();
        let entered = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let x = graph.add_node(CharRangeSet::from_char('x'));
        let y = graph.add_node(CharRangeSet::from_char('y'));
        graph.link(x, y);
        let counter = Arc::clone(&entered);
        graph.on_enter(
            x,
            Callback::new("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        graph.on_exit(x, Callback::new("fails", |_| Err("ignored".into())));
        graph.on_enter(
            y,
            Callback::new("reject_at_2", |state| {
                if state.offset() == 2 {
                    state.error("no y here");
                }
                Ok(())
            }),
        );
        let automaton = Automaton::new(graph, SubGraph::new(x, vec![y]));

        let rejection = automaton.run(&mut StrCursor::new("xy")).unwrap_err();
        assert!(rejection.is_state_error());
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_marks_terminal() {
        init();
        let mut graph = Graph::new();
        let x = graph.add_node(CharRangeSet::from_char('x'));
        let y = graph.add_node(CharRangeSet::from_char('y'));
        graph.link(x, y);
        graph.on_enter(
            x,
            Callback::new("terminal", |state| {
                state.mark_terminal();
                Ok(())
            }),
        );
        let automaton = Automaton::new(graph, SubGraph::new(x, vec![y]));
        assert!(automaton.matches("x"));
        assert!(automaton.matches("xy"));
    }

    #[test]
    fn test_overlapping_repeats_count_per_path() {
        init();
        let letters = automaton("[a-z]{2} [a-c]");
        assert!(letters.matches("abc"));
        assert!(!letters.matches("ac"));

        let pairs = automaton("(a{2})+");
        assert!(pairs.matches("aa"));
        assert!(pairs.matches("aaaa"));
        assert!(!pairs.matches("aaa"));

        let two_or_three = automaton("a{2} | a{3}");
        assert!(two_or_three.matches("aa"));
        assert!(two_or_three.matches("aaa"));
        assert!(!two_or_three.matches("aaaa"));

        let bounded = automaton("a{1,2} a");
        assert!(bounded.matches("aaa"));
        assert!(!bounded.matches("aaaa"));

        let words = automaton("(a | ab){2}");
        assert!(words.matches("aab"));
        assert!(!words.matches("ab"));

        let optional = automaton("(a?)+ b");
        assert!(optional.matches("aab"));
        assert!(optional.matches("b"));
    }

    #[test]
    fn test_paths_dispatch_own_callbacks() {
        init();
        // x1 -> y, x2 -> z, both entered on 'x'
        let mut graph = Graph::new();
        let root = graph.add_epsilon();
        let x1 = graph.add_node(CharRangeSet::from_char('x'));
        let x2 = graph.add_node(CharRangeSet::from_char('x'));
        let y = graph.add_node(CharRangeSet::from_char('y'));
        let z = graph.add_node(CharRangeSet::from_char('z'));
        graph.link(root, x1);
        graph.link(root, x2);
        graph.link(x1, y);
        graph.link(x2, z);
        graph.on_enter(
            x1,
            Callback::new("left", |state| {
                state.error("left path failed");
                Ok(())
            }),
        );
        let automaton = Automaton::new(graph, SubGraph::new(root, vec![y, z]));
        assert!(automaton.matches("xz"));
        let rejection = automaton.run(&mut StrCursor::new("xy")).unwrap_err();
        assert_eq!(rejection.reason, RejectReason::UnexpectedChar('y'));
        assert_eq!(rejection.offset, 1);
    }

    #[test]
    fn test_automaton_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Automaton>();
    }

    #[cfg(feature = "dot_writer")]
    #[test]
    fn test_render_dot() {
        let automaton = automaton("'cat' | 'car'");
        let mut output = Vec::new();
        automaton.render_dot("cat|car", &mut output);
        let dot = String::from_utf8(output).unwrap();
        assert!(dot.contains("cat|car"));
        assert!(dot.contains("[t]"));
        assert!(dot.contains("[r]"));
    }
}
