/// Module that converts a compiled graph into a deterministic automaton.
pub(crate) mod determinize;

/// Module with conversion to graphviz dot format
#[cfg(feature = "dot_writer")]
pub(crate) mod dot;

/// Module for several ID types.
mod ids;
pub use ids::{NodeID, ScratchKey};

/// The nfa module compiles matchers into a node graph.
pub(crate) mod nfa;
