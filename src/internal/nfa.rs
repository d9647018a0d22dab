//! This module contains the compilation of a [Matcher] into a non-deterministic graph.
//! The graph uses epsilon nodes for choices and repetitions. It is later converted into a
//! deterministic automaton, see the `determinize` module.

use crate::{
    AutomatchErrorKind, Callback, CharRangeSet, Graph, Matcher, NodeID, Result, ScratchKey,
    SubGraph, CODE_POINT_MAX,
};

/// Compile the matcher into the graph and return the created fragment.
pub(crate) fn compile(matcher: &Matcher, graph: &mut Graph) -> Result<SubGraph> {
    match matcher {
        Matcher::Literal(text) => compile_literal(text, graph),
        Matcher::Chain(elements) => {
            if elements.is_empty() {
                return Err(AutomatchErrorKind::EmptyChain.into());
            }
            let mut fragments = elements
                .iter()
                .map(|element| compile(element, graph))
                .collect::<Result<Vec<_>>>()?
                .into_iter();
            // The chain is not empty, so there is a first fragment.
            let Some(first) = fragments.next() else {
                return Err(AutomatchErrorKind::EmptyChain.into());
            };
            let root = first.root;
            let mut tails = first.tails;
            for fragment in fragments {
                for tail in tails {
                    graph.link(tail, fragment.root);
                }
                tails = fragment.tails;
            }
            Ok(SubGraph::new(root, tails))
        }
        Matcher::Choice(alternatives) => {
            if alternatives.is_empty() {
                return Err(AutomatchErrorKind::EmptyChoice.into());
            }
            let root = graph.add_epsilon();
            let mut tails = Vec::new();
            for alternative in alternatives {
                let fragment = compile(alternative, graph)?;
                graph.link(root, fragment.root);
                tails.extend(fragment.tails);
            }
            Ok(SubGraph::new(root, tails))
        }
        Matcher::Any => Ok(single(graph, CharRangeSet::full())),
        Matcher::Ranges(set) => {
            if let Some(range) = set
                .ranges()
                .iter()
                .find(|r| r.begin > r.end || r.end > CODE_POINT_MAX)
            {
                return Err(AutomatchErrorKind::InvalidRange {
                    begin: range.begin,
                    end: range.end,
                }
                .into());
            }
            if set.is_empty() {
                return Err(AutomatchErrorKind::EmptyRanges.into());
            }
            Ok(single(graph, set.clone()))
        }
        Matcher::Repeat { matcher, min, max } => compile_repeat(matcher, *min, *max, graph),
        Matcher::Negate(inner) => {
            let set = inner
                .char_set()
                .ok_or_else(|| AutomatchErrorKind::UnsupportedNegation(inner.to_string()))?
                .complement();
            if set.is_empty() {
                return Err(AutomatchErrorKind::EmptyNegation(inner.to_string()).into());
            }
            Ok(single(graph, set))
        }
        Matcher::Rule(name) => Err(AutomatchErrorKind::UnresolvedRule(name.clone()).into()),
    }
}

fn single(graph: &mut Graph, guard: CharRangeSet) -> SubGraph {
    let node = graph.add_node(guard);
    SubGraph::new(node, vec![node])
}

fn compile_literal(text: &str, graph: &mut Graph) -> Result<SubGraph> {
    let mut chars = text.chars();
    let first = chars.next().ok_or(AutomatchErrorKind::EmptyLiteral)?;
    let root = graph.add_node(CharRangeSet::from_char(first));
    let mut tail = root;
    for c in chars {
        let node = graph.add_node(CharRangeSet::from_char(c));
        graph.link(tail, node);
        tail = node;
    }
    Ok(SubGraph::new(root, vec![tail]))
}

/// The bounds of a repetition, shared by its counting callbacks.
#[derive(Debug, Clone, Copy)]
struct RepeatBounds {
    min: u32,
    max: Option<u32>,
}

impl RepeatBounds {
    fn exceeded(&self, count: usize) -> bool {
        self.max.is_some_and(|max| count > max as usize)
    }

    fn satisfied(&self, count: usize) -> bool {
        count >= self.min as usize && !self.exceeded(count)
    }

    fn violation(&self, count: usize) -> String {
        match self.max {
            Some(max) => format!("Expected {}-{} repetitions, got {}", self.min, max, count),
            None => format!("Expected at least {} repetitions, got {}", self.min, count),
        }
    }
}

// entry --> loop root --> inner ... inner tails --+--> loop root
//               |                                 |
//               +---- (min == 0) ---> exit <------+
fn compile_repeat(
    matcher: &Matcher,
    min: u32,
    max: Option<u32>,
    graph: &mut Graph,
) -> Result<SubGraph> {
    if let Some(max) = max {
        if min > max {
            return Err(AutomatchErrorKind::InvalidRepeat { min, max }.into());
        }
    }
    // Iterations that match nothing can make up for missing ones.
    let min = if matcher.is_nullable() { 0 } else { min };
    let bounds = RepeatBounds { min, max };

    let entry = graph.add_epsilon();
    let key = ScratchKey::from(entry);
    graph.on_enter(
        entry,
        Callback::new(format!("repeat{}.push", key), move |state| {
            state.push_counter(key);
            Ok(())
        }),
    );

    let loop_root = graph.add_epsilon();
    graph.link(entry, loop_root);
    let inner = compile(matcher, graph)?;
    graph.link(loop_root, inner.root);

    let exit = graph.add_epsilon();
    if min == 0 {
        graph.link(loop_root, exit);
    }

    let increment = Callback::new(format!("repeat{}.increment", key), move |state| {
        let count = state.increment(key);
        if bounds.exceeded(count) {
            state.error(bounds.violation(count));
        }
        Ok(())
    });
    for tail in inner.tails {
        graph.on_enter(tail, increment.clone());
        graph.link(tail, loop_root);
        graph.link(tail, exit);
    }

    graph.on_enter(
        exit,
        Callback::new(format!("repeat{}.check", key), move |state| {
            let count = state.counter(key);
            if !bounds.satisfied(count) {
                state.error(bounds.violation(count));
            }
            Ok(())
        }),
    );
    graph.on_exit(
        exit,
        Callback::new(format!("repeat{}.pop", key), move |state| {
            state.pop_counter(key);
            Ok(())
        }),
    );

    Ok(SubGraph::new(entry, vec![exit]))
}

/// Returns the ids of all nodes reachable from `start`, in breadth-first order.
pub(crate) fn reachable(graph: &Graph, start: NodeID) -> Vec<NodeID> {
    let mut visited = rustc_hash::FxHashSet::default();
    let mut queue = std::collections::VecDeque::from([start]);
    let mut order = Vec::new();
    visited.insert(start);
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &next in graph[id].next() {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    order
}
