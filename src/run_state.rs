use rustc_hash::FxHashMap;

use crate::{NodeID, Position, ScratchKey};

/// The mutable state of a single run of an automaton.
///
/// A new `RunState` is created at the start of every run, so nothing leaks from one run into the
/// next and concurrent runs over the same automaton never share state. Within a run every path
/// through the compiled graph owns a copy of the state. Callbacks receive the
/// state mutably: they flag failures with [RunState::error], mark acceptable end points with
/// [RunState::mark_terminal] and keep data in the scratch map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    // The node of the compiled graph this path is in
    current_node: NodeID,
    // Set if the current node or one of its callbacks allows the match to end here
    is_terminal: bool,
    // Set by a callback to fail the run
    error: Option<String>,
    // Per-run scratch data, used by repetitions to count iterations.
    // Each key holds a stack so that re-entered repetitions do not share a counter.
    scratch: FxHashMap<ScratchKey, Vec<usize>>,
    // Cursor offset at the time of the callback dispatch
    offset: usize,
    // Cursor position at the time of the callback dispatch
    position: Position,
}

impl RunState {
    /// Create a new run state that starts in the given node.
    pub(crate) fn new(start: NodeID) -> Self {
        RunState {
            current_node: start,
            is_terminal: false,
            error: None,
            scratch: FxHashMap::default(),
            offset: 0,
            position: Position::default(),
        }
    }

    /// The node of the compiled graph the path of this state is currently in.
    #[inline]
    pub fn current_node(&self) -> NodeID {
        self.current_node
    }

    /// Move to the given node. The terminal flag is reset to the node's own flag. A pending error
    /// is kept so that errors raised while leaving the previous node are still observed.
    #[inline]
    pub(crate) fn enter_node(&mut self, node: NodeID, terminal: bool) {
        self.current_node = node;
        self.is_terminal = terminal;
    }

    /// Flag an error. The run fails as soon as the automaton observes it.
    pub fn error<S: Into<String>>(&mut self, msg: S) {
        self.error = Some(msg.into());
    }

    /// The error flagged by a callback, if any.
    #[inline]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[inline]
    pub(crate) fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Allow the match to end at the current node.
    #[inline]
    pub fn mark_terminal(&mut self) {
        self.is_terminal = true;
    }

    /// Returns true if the match may end at the current node.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// The number of characters consumed when the callback was dispatched.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The cursor position when the callback was dispatched.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub(crate) fn set_location(&mut self, offset: usize, position: Position) {
        self.offset = offset;
        self.position = position;
    }

    /// Push a new counter with value 0 for the given key.
    pub fn push_counter(&mut self, key: ScratchKey) {
        self.scratch.entry(key).or_default().push(0);
    }

    /// Increment the innermost counter of the given key and return the new count.
    /// A counter is created if none exists.
    pub fn increment(&mut self, key: ScratchKey) -> usize {
        let stack = self.scratch.entry(key).or_default();
        match stack.last_mut() {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                stack.push(1);
                1
            }
        }
    }

    /// The innermost counter of the given key, 0 if there is none.
    pub fn counter(&self, key: ScratchKey) -> usize {
        self.scratch
            .get(&key)
            .and_then(|stack| stack.last().copied())
            .unwrap_or_default()
    }

    /// Remove the innermost counter of the given key and return its value.
    pub fn pop_counter(&mut self, key: ScratchKey) -> Option<usize> {
        let stack = self.scratch.get_mut(&key)?;
        let count = stack.pop();
        if stack.is_empty() {
            self.scratch.remove(&key);
        }
        count
    }

    /// Returns true if no scratch data is held.
    #[inline]
    pub fn scratch_is_empty(&self) -> bool {
        self.scratch.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_stack() {
        let key = ScratchKey::new(3);
        let mut state = RunState::new(NodeID::new(0));
        assert_eq!(state.counter(key), 0);
        state.push_counter(key);
        assert_eq!(state.increment(key), 1);
        assert_eq!(state.increment(key), 2);
        state.push_counter(key);
        assert_eq!(state.counter(key), 0);
        assert_eq!(state.increment(key), 1);
        assert_eq!(state.pop_counter(key), Some(1));
        assert_eq!(state.counter(key), 2);
        assert_eq!(state.pop_counter(key), Some(2));
        assert_eq!(state.pop_counter(key), None);
        assert!(state.scratch_is_empty());
    }

    #[test]
    fn test_increment_without_push() {
        let key = ScratchKey::new(1);
        let mut state = RunState::new(NodeID::new(0));
        assert_eq!(state.increment(key), 1);
        assert_eq!(state.counter(key), 1);
    }

    #[test]
    fn test_flags() {
        let mut state = RunState::new(NodeID::new(0));
        state.error("boom");
        state.mark_terminal();
        assert_eq!(state.error_message(), Some("boom"));
        assert!(state.is_terminal());
        state.enter_node(NodeID::new(4), false);
        assert_eq!(state.current_node(), NodeID::new(4));
        assert!(!state.is_terminal());
        assert_eq!(state.take_error(), Some("boom".to_string()));
        assert_eq!(state.error_message(), None);
    }
}
