//! Conversion of a compiled graph into a deterministic automaton.
//!
//! The conversion runs in two passes over the part of the graph reachable from the start node.
//!
//! First epsilon nodes are elided: a node's epsilon successors are replaced by the non-epsilon
//! nodes they reach. Callbacks on the elided path move onto clones of the reached nodes, or onto
//! the accept paths of the visited node if the path ends in a terminal node. The result is a
//! graph without epsilon transitions that may still have siblings with overlapping guards.
//!
//! Then a subset construction adds state nodes on top of that graph. A state node has a guard,
//! disjoint successor guards and the list of epsilon-free nodes it stands for, its members. State
//! nodes carry no callbacks of their own; a run follows every member path with its own run state
//! so the callbacks of different paths never mix.
//!
//! The graph is changed in place. Nodes that are no longer reachable stay in the arena.

use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Callback, CharRangeSet, Graph, Node, NodeID};

/// Make the part of the graph that is reachable from `start` deterministic.
/// Returns the start state of the deterministic automaton.
pub(crate) fn determinize(graph: &mut Graph, start: NodeID) -> NodeID {
    let mut determinizer = Determinizer::new(graph);
    determinizer.eliminate_epsilons(start);
    let first = determinizer.build_states(start);
    trace!(
        "Determinization created {} clones and {} states",
        determinizer.clones.len(),
        determinizer.states.len()
    );
    first
}

/// Returns true if every node reachable from `start` has only non-epsilon successors with
/// pairwise disjoint guards.
pub(crate) fn is_deterministic(graph: &Graph, start: NodeID) -> bool {
    super::nfa::reachable(graph, start).into_iter().all(|id| {
        let next = graph[id].next();
        next.iter().enumerate().all(|(i, a)| {
            !graph[*a].is_epsilon()
                && next[i + 1..]
                    .iter()
                    .all(|b| graph[*a].guard().intersection(graph[*b].guard()).is_empty())
        })
    })
}

#[derive(Debug, Default)]
struct Closure {
    // Non-epsilon nodes reached through epsilon nodes, with the callbacks of the path
    targets: Vec<(NodeID, Vec<Callback>)>,
    // Callbacks of epsilon paths that end in a terminal epsilon node
    accept_paths: Vec<Vec<Callback>>,
}

type CallbackKeys = Vec<usize>;

fn keys(callbacks: &[Callback]) -> CallbackKeys {
    callbacks.iter().map(Callback::key).collect()
}

/// Add an accept path to the node unless the node accepts unconditionally.
fn add_accept_path(node: &mut Node, path: &[Callback]) {
    if node.terminal {
        return;
    }
    if path.is_empty() {
        node.terminal = true;
        node.accept_paths.clear();
    } else if !node.accept_paths.iter().any(|p| keys(p) == keys(path)) {
        node.accept_paths.push(path.to_vec());
    }
}

struct Determinizer<'a> {
    graph: &'a mut Graph,
    // Epsilon closures per epsilon node
    closures: FxHashMap<NodeID, Rc<Closure>>,
    // Nodes cloned with the callbacks of an epsilon path, keyed by node and path
    clones: FxHashMap<(NodeID, CallbackKeys), NodeID>,
    // State nodes, keyed by guard and sorted members
    states: FxHashMap<(CharRangeSet, Vec<NodeID>), NodeID>,
}

impl<'a> Determinizer<'a> {
    fn new(graph: &'a mut Graph) -> Self {
        Determinizer {
            graph,
            closures: FxHashMap::default(),
            clones: FxHashMap::default(),
            states: FxHashMap::default(),
        }
    }

    fn eliminate_epsilons(&mut self, start: NodeID) {
        let mut queue = VecDeque::from([start]);
        let mut visited = FxHashSet::default();
        visited.insert(start);
        while let Some(id) = queue.pop_front() {
            self.eliminate(id);
            for &next in self.graph[id].next() {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    /// Replace the epsilon successors of the node by the nodes their closures reach.
    fn eliminate(&mut self, id: NodeID) {
        let next = self.graph[id].next().to_vec();
        let mut successors: Vec<NodeID> = Vec::with_capacity(next.len());
        let mut accept_paths: Vec<Vec<Callback>> = Vec::new();
        for n in next {
            if !self.graph[n].is_epsilon() {
                if !successors.contains(&n) {
                    successors.push(n);
                }
                continue;
            }
            let closure = self.closure(n);
            for (target, path) in &closure.targets {
                let target = self.with_prefix(*target, path);
                if !successors.contains(&target) {
                    successors.push(target);
                }
            }
            accept_paths.extend(closure.accept_paths.iter().cloned());
        }
        trace!("Node {} has successors {:?}", id, successors);
        let node = self.graph.node_mut(id);
        node.next = successors;
        for path in &accept_paths {
            add_accept_path(node, path);
        }
    }

    fn closure(&mut self, id: NodeID) -> Rc<Closure> {
        if let Some(closure) = self.closures.get(&id) {
            return Rc::clone(closure);
        }
        let mut closure = Closure::default();
        let mut on_path = FxHashSet::default();
        let mut path = Vec::new();
        collect(self.graph, id, &mut path, &mut on_path, &mut closure);
        trace!(
            "Epsilon closure of node {}: {} targets, {} accept paths",
            id,
            closure.targets.len(),
            closure.accept_paths.len()
        );
        let closure = Rc::new(closure);
        self.closures.insert(id, Rc::clone(&closure));
        closure
    }

    /// Get a copy of `target` that runs the given callbacks before its own `on_enter` callbacks.
    fn with_prefix(&mut self, target: NodeID, path: &[Callback]) -> NodeID {
        if path.is_empty() {
            return target;
        }
        let key = (target, keys(path));
        if let Some(&id) = self.clones.get(&key) {
            return id;
        }
        let original = &self.graph[target];
        let mut node = original.clone();
        node.on_enter = path
            .iter()
            .chain(original.on_enter.iter())
            .cloned()
            .collect();
        let id = self.graph.push_copy(node);
        trace!(
            "Cloned node {} as {} with {} path callbacks",
            target,
            id,
            path.len()
        );
        self.clones.insert(key, id);
        id
    }

    /// Build the state nodes, starting with a state that stands for `start` alone.
    fn build_states(&mut self, start: NodeID) -> NodeID {
        let (first, _) = self.state(CharRangeSet::empty(), vec![start]);
        let mut queue = VecDeque::from([first]);
        while let Some(id) = queue.pop_front() {
            let mut successors: Vec<NodeID> = Vec::new();
            for member in &self.graph[id].members {
                for n in self.graph[*member].next() {
                    if !successors.contains(n) {
                        successors.push(*n);
                    }
                }
            }
            let parts = split(self.graph, successors);
            let mut next = Vec::with_capacity(parts.len());
            for (guard, members) in parts {
                let (state, created) = self.state(guard, members);
                if created {
                    queue.push_back(state);
                }
                next.push(state);
            }
            trace!("State {} has successors {:?}", id, next);
            self.graph.node_mut(id).next = next;
        }
        first
    }

    /// Get the state node for the guard and members. The flag is true if the state is new.
    fn state(&mut self, guard: CharRangeSet, members: Vec<NodeID>) -> (NodeID, bool) {
        let mut key_members = members.clone();
        key_members.sort_unstable();
        let key = (guard, key_members);
        if let Some(&id) = self.states.get(&key) {
            return (id, false);
        }
        let mut node = Node::new(NodeID::default(), key.0.clone());
        node.origin = self.graph[members[0]].origin();
        node.terminal = members.iter().any(|m| self.graph[*m].is_terminal());
        node.members = members;
        let id = self.graph.push_copy(node);
        trace!("State {} on {} for {:?}", id, key.0, key.1);
        self.states.insert(key, id);
        (id, true)
    }
}

/// Split the guards of the successors into disjoint parts, each with the successors whose guards
/// contain it.
fn split(graph: &Graph, successors: Vec<NodeID>) -> Vec<(CharRangeSet, Vec<NodeID>)> {
    let mut parts: Vec<(CharRangeSet, Vec<NodeID>)> = Vec::with_capacity(successors.len());
    for successor in successors {
        let mut rest = graph[successor].guard().clone();
        let mut refined = Vec::with_capacity(parts.len() + 1);
        for (guard, sources) in parts {
            if rest.is_empty() {
                refined.push((guard, sources));
                continue;
            }
            let (only_part, both, only_rest) = guard.unique(&rest);
            if both.is_empty() {
                refined.push((guard, sources));
                continue;
            }
            let mut shared = sources.clone();
            shared.push(successor);
            if !only_part.is_empty() {
                refined.push((only_part, sources));
            }
            refined.push((both, shared));
            rest = only_rest;
        }
        if !rest.is_empty() {
            refined.push((rest, vec![successor]));
        }
        parts = refined;
    }
    parts
}

/// Collect the non-epsilon nodes and terminal paths reachable from the epsilon node `id`.
/// A node that is already on the current path closes an epsilon cycle and is skipped.
fn collect(
    graph: &Graph,
    id: NodeID,
    path: &mut Vec<Callback>,
    on_path: &mut FxHashSet<NodeID>,
    closure: &mut Closure,
) {
    if !on_path.insert(id) {
        return;
    }
    let node = &graph[id];
    let len = path.len();
    path.extend(node.on_enter().iter().cloned());
    path.extend(node.on_exit().iter().cloned());
    if node.terminal {
        closure.accept_paths.push(path.clone());
    }
    for &next in node.next() {
        if graph[next].is_epsilon() {
            collect(graph, next, path, on_path, closure);
        } else {
            closure.targets.push((next, path.clone()));
        }
    }
    path.truncate(len);
    on_path.remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn node(graph: &mut Graph, c: char) -> NodeID {
        graph.add_node(CharRangeSet::from_char(c))
    }

    #[test]
    fn test_overlapping_siblings_are_merged() {
        init();
        // start -> c -> a -> t
        //       -> c -> a -> r
        let mut graph = Graph::new();
        let start = graph.add_epsilon();
        let c1 = node(&mut graph, 'c');
        let a1 = node(&mut graph, 'a');
        let t = node(&mut graph, 't');
        let c2 = node(&mut graph, 'c');
        let a2 = node(&mut graph, 'a');
        let r = node(&mut graph, 'r');
        graph.link(start, c1);
        graph.link(c1, a1);
        graph.link(a1, t);
        graph.link(start, c2);
        graph.link(c2, a2);
        graph.link(a2, r);
        graph.mark_terminal(t);
        graph.mark_terminal(r);

        let first = determinize(&mut graph, start);
        assert!(is_deterministic(&graph, first));
        assert_eq!(graph[first].members(), &[start]);
        let next = graph[first].next();
        assert_eq!(next.len(), 1);
        let c = next[0];
        assert_eq!(graph[c].members(), &[c1, c2]);
        assert_eq!(graph[c].origin(), c1);
        assert_eq!(graph[c].next().len(), 1);
        let a = graph[c].next()[0];
        assert_eq!(graph[a].members(), &[a1, a2]);
        let ends = graph[a]
            .next()
            .iter()
            .map(|n| graph[*n].members().to_vec())
            .collect::<Vec<_>>();
        assert_eq!(ends, vec![vec![t], vec![r]]);
        assert!(graph[graph[a].next()[0]].is_terminal());
    }

    #[test]
    fn test_partial_overlap_is_split() {
        init();
        let mut graph = Graph::new();
        let start = graph.add_epsilon();
        let lower = graph.add_node(CharRangeSet::from_range('a', 'm'));
        let upper = graph.add_node(CharRangeSet::from_range('h', 'z'));
        graph.link(start, lower);
        graph.link(start, upper);
        graph.mark_terminal(upper);

        let first = determinize(&mut graph, start);
        assert!(is_deterministic(&graph, first));
        let guards = graph[first]
            .next()
            .iter()
            .map(|n| graph[*n].guard().clone())
            .collect::<Vec<_>>();
        assert_eq!(
            guards,
            vec![
                CharRangeSet::from_range('a', 'g'),
                CharRangeSet::from_range('h', 'm'),
                CharRangeSet::from_range('n', 'z'),
            ]
        );
        let middle = graph[first].next()[1];
        assert_eq!(graph[middle].members(), &[lower, upper]);
        assert!(graph[middle].is_terminal());
        assert!(!graph[graph[first].next()[0]].is_terminal());
    }

    #[test]
    fn test_epsilon_paths_move_callbacks() {
        init();
        // start -> e1 (on_enter) -> e2 (terminal, on_exit) -> x
        let mut graph = Graph::new();
        let start = graph.add_epsilon();
        let e1 = graph.add_epsilon();
        let e2 = graph.add_epsilon();
        let x = node(&mut graph, 'x');
        let enter = Callback::new("enter", |_| Ok(()));
        let exit = Callback::new("exit", |_| Ok(()));
        graph.on_enter(e1, enter.clone());
        graph.on_exit(e2, exit.clone());
        graph.link(start, e1);
        graph.link(e1, e2);
        graph.link(e2, x);
        graph.mark_terminal(e2);

        let first = determinize(&mut graph, start);
        assert!(is_deterministic(&graph, first));
        let start_node = &graph[start];
        assert!(!start_node.terminal);
        assert_eq!(start_node.accept_paths().len(), 1);
        assert!(start_node.accept_paths()[0][0].same(&enter));
        assert!(start_node.accept_paths()[0][1].same(&exit));
        let clone = start_node.next()[0];
        assert_ne!(clone, x);
        assert_eq!(graph[clone].origin(), x);
        assert_eq!(graph[clone].on_enter().len(), 2);
        assert!(graph[x].on_enter().is_empty());
    }

    #[test]
    fn test_epsilon_cycle_is_cut() {
        init();
        let mut graph = Graph::new();
        let start = graph.add_epsilon();
        let e1 = graph.add_epsilon();
        let e2 = graph.add_epsilon();
        let y = node(&mut graph, 'y');
        graph.link(start, e1);
        graph.link(e1, e2);
        graph.link(e2, e1);
        graph.link(e2, y);
        graph.link(y, e1);
        graph.mark_terminal(y);

        let first = determinize(&mut graph, start);
        assert!(is_deterministic(&graph, first));
        assert_eq!(graph[start].next(), &[y]);
        assert_eq!(graph[y].next(), &[y]);
    }

    #[test]
    fn test_states_keep_member_callbacks_apart() {
        init();
        // start -> x1 (on_enter left) -> y
        //       -> x2 (on_enter right)
        let mut graph = Graph::new();
        let start = graph.add_epsilon();
        let x1 = node(&mut graph, 'x');
        let x2 = node(&mut graph, 'x');
        let y = node(&mut graph, 'y');
        let left = Callback::new("left", |_| Ok(()));
        let right = Callback::new("right", |_| Ok(()));
        graph.on_enter(x1, left.clone());
        graph.on_enter(x2, right.clone());
        graph.link(start, x1);
        graph.link(start, x2);
        graph.link(x1, y);
        graph.mark_terminal(x2);
        graph.mark_terminal(y);

        let first = determinize(&mut graph, start);
        assert!(is_deterministic(&graph, first));
        let x = graph[first].next()[0];
        assert_eq!(graph[x].members(), &[x1, x2]);
        assert!(graph[x].on_enter().is_empty());
        assert!(graph[x].is_terminal());
        assert_eq!(graph[x1].on_enter().len(), 1);
        assert!(graph[x1].on_enter()[0].same(&left));
        assert_eq!(graph[x2].on_enter().len(), 1);
        assert!(graph[x2].on_enter()[0].same(&right));
        let y_state = graph[x].next()[0];
        assert_eq!(graph[y_state].members(), &[y]);
    }
}
