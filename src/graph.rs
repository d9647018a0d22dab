//! Module with the arena-backed node graph that matchers compile into.
//!
//! Nodes are addressed by [NodeID]. Edges are lists of ids, so the cycles created by repetitions
//! are plain index references.

use std::sync::Arc;

use crate::{CharRangeSet, NodeID, RunState};

/// The result of a callback. A failing callback is logged and does not abort the run. Use
/// [RunState::error] to fail a run.
pub type CallbackResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

type CallbackFn = dyn Fn(&mut RunState) -> CallbackResult + Send + Sync;

/// A side effect that is dispatched when a node is entered or left, or when a match ends.
/// Cloning a callback is cheap. Clones are identical, see [Callback::same].
#[derive(Clone)]
pub struct Callback {
    name: Arc<str>,
    func: Arc<CallbackFn>,
}

impl Callback {
    /// Create a new callback. The name is used in diagnostics only.
    pub fn new<S, F>(name: S, func: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&mut RunState) -> CallbackResult + Send + Sync + 'static,
    {
        Callback {
            name: Arc::from(name.as_ref()),
            func: Arc::new(func),
        }
    }

    /// The name of the callback.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if both callbacks are clones of each other.
    #[inline]
    pub fn same(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }

    /// An identity of the callback that survives cloning.
    #[inline]
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.func) as *const () as usize
    }

    #[inline]
    pub(crate) fn call(&self, state: &mut RunState) -> CallbackResult {
        (self.func)(state)
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callback({})", self.name)
    }
}

/// A node of the compiled graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeID,
    // The characters that lead into this node, empty for epsilon nodes
    pub(crate) guard: CharRangeSet,
    pub(crate) next: Vec<NodeID>,
    pub(crate) on_enter: Vec<Callback>,
    pub(crate) on_exit: Vec<Callback>,
    // The match may end in this node
    pub(crate) terminal: bool,
    // Alternative callback sequences of elided terminal epsilon paths. The match may end in this
    // node if any of them runs without flagging an error.
    pub(crate) accept_paths: Vec<Vec<Callback>>,
    // The node this node was cloned from, or the first member of a state node
    pub(crate) origin: NodeID,
    // The epsilon-free nodes a state node of the deterministic automaton stands for
    pub(crate) members: Vec<NodeID>,
}

impl Node {
    pub(crate) fn new(id: NodeID, guard: CharRangeSet) -> Self {
        Node {
            id,
            guard,
            next: Vec::new(),
            on_enter: Vec::new(),
            on_exit: Vec::new(),
            terminal: false,
            accept_paths: Vec::new(),
            origin: id,
            members: Vec::new(),
        }
    }

    /// The id of the node.
    #[inline]
    pub fn id(&self) -> NodeID {
        self.id
    }

    /// The characters that lead into this node.
    #[inline]
    pub fn guard(&self) -> &CharRangeSet {
        &self.guard
    }

    /// Returns true if the node is entered without consuming a character.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.guard.is_empty()
    }

    /// The successors of the node.
    #[inline]
    pub fn next(&self) -> &[NodeID] {
        &self.next
    }

    /// The callbacks dispatched when the node is entered.
    #[inline]
    pub fn on_enter(&self) -> &[Callback] {
        &self.on_enter
    }

    /// The callbacks dispatched when the node is left.
    #[inline]
    pub fn on_exit(&self) -> &[Callback] {
        &self.on_exit
    }

    /// The alternative callback sequences that decide whether a match may end in this node.
    #[inline]
    pub fn accept_paths(&self) -> &[Vec<Callback>] {
        &self.accept_paths
    }

    /// Returns true if a match may end in this node, possibly subject to its accept paths.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal || !self.accept_paths.is_empty()
    }

    /// The node of the compiled graph this node was derived from during determinization.
    #[inline]
    pub fn origin(&self) -> NodeID {
        self.origin
    }

    /// The nodes a state of the deterministic automaton stands for.
    ///
    /// A run follows every member with its own [RunState] and dispatches the members' callbacks,
    /// never callbacks of the state itself. Empty for nodes that are not states.
    #[inline]
    pub fn members(&self) -> &[NodeID] {
        &self.members
    }
}

/// The arena of nodes a matcher compiles into.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Graph { nodes: Vec::new() }
    }

    /// Add a node that is entered on the given characters.
    pub fn add_node(&mut self, guard: CharRangeSet) -> NodeID {
        let id = NodeID::from_index(self.nodes.len());
        self.nodes.push(Node::new(id, guard));
        id
    }

    /// Add an epsilon node.
    #[inline]
    pub fn add_epsilon(&mut self) -> NodeID {
        self.add_node(CharRangeSet::empty())
    }

    /// Add a copy of the given node under a new id.
    pub(crate) fn push_copy(&mut self, mut node: Node) -> NodeID {
        let id = NodeID::from_index(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
    }

    /// Add an edge from `from` to `to`.
    #[inline]
    pub fn link(&mut self, from: NodeID, to: NodeID) {
        self.nodes[from].next.push(to);
    }

    /// Register a callback that is dispatched when the node is entered.
    #[inline]
    pub fn on_enter(&mut self, node: NodeID, callback: Callback) {
        self.nodes[node].on_enter.push(callback);
    }

    /// Register a callback that is dispatched when the node is left.
    #[inline]
    pub fn on_exit(&mut self, node: NodeID, callback: Callback) {
        self.nodes[node].on_exit.push(callback);
    }

    /// Allow a match to end in the given node.
    #[inline]
    pub fn mark_terminal(&mut self, node: NodeID) {
        self.nodes[node].terminal = true;
    }

    /// Get a node.
    #[inline]
    pub fn node(&self, id: NodeID) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeID) -> &mut Node {
        &mut self.nodes[id]
    }

    /// All nodes of the arena.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render the graph in graphviz dot format.
    #[cfg(feature = "dot_writer")]
    pub fn render_dot<W: std::io::Write>(&self, label: &str, output: &mut W) {
        let all = (0..self.nodes.len()).map(NodeID::from_index).collect::<Vec<_>>();
        crate::internal::dot::graph_render(self, &all, None, label, output);
    }
}

impl std::ops::Index<NodeID> for Graph {
    type Output = Node;

    #[inline]
    fn index(&self, index: NodeID) -> &Self::Output {
        &self.nodes[index]
    }
}

/// A compiled fragment of a graph: one root and the tail nodes that are not yet linked to a
/// continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGraph {
    /// The entry node of the fragment.
    pub root: NodeID,
    /// The nodes the fragment is left from.
    pub tails: Vec<NodeID>,
}

impl SubGraph {
    /// Create a new fragment.
    pub fn new(root: NodeID, tails: Vec<NodeID>) -> Self {
        SubGraph { root, tails }
    }
}
