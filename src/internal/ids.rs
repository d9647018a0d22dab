macro_rules! impl_id {
    ($(#[$meta:meta])* $name:ident, $tp:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name($tp);

        impl $name {
            /// Create a new id.
            #[inline]
            pub const fn new(index: $tp) -> Self {
                $name(index)
            }

            /// Get the id as usize.
            #[inline]
            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            /// Get the raw id.
            #[inline]
            pub fn id(&self) -> $tp {
                self.0
            }
        }

        impl<T> std::ops::Index<$name> for [T] {
            type Output = T;

            #[inline]
            fn index(&self, index: $name) -> &Self::Output {
                &self[index.0 as usize]
            }
        }

        impl<T> std::ops::IndexMut<$name> for [T] {
            #[inline]
            fn index_mut(&mut self, index: $name) -> &mut T {
                &mut self[index.0 as usize]
            }
        }

        impl<T> std::ops::Index<$name> for Vec<T> {
            type Output = T;

            #[inline]
            fn index(&self, index: $name) -> &Self::Output {
                &self[index.0 as usize]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Vec<T> {
            #[inline]
            fn index_mut(&mut self, index: $name) -> &mut T {
                &mut self[index.0 as usize]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$tp> for $name {
            fn from(index: $tp) -> Self {
                $name::new(index)
            }
        }
    };
}

pub(crate) type NodeIDBase = u32;
impl_id!(
    /// The ID of a node in the arena of a [crate::Graph].
    NodeID,
    NodeIDBase
);

impl NodeID {
    /// Create a node id from an arena index.
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        NodeID(index as NodeIDBase)
    }
}

/// The base type of [ScratchKey].
pub(crate) type ScratchKeyBase = u32;
impl_id!(
    /// The key of a per-run scratch entry. Repetitions use the id of their entry node, so every
    /// compiled repetition owns a distinct key.
    ScratchKey,
    ScratchKeyBase
);

impl From<NodeID> for ScratchKey {
    fn from(node: NodeID) -> Self {
        ScratchKey(node.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_indexing() {
        let v = vec!['a', 'b', 'c'];
        assert_eq!(v[NodeID::new(1)], 'b');
        assert_eq!(NodeID::from_index(2).as_usize(), 2);
        assert_eq!(format!("{}", NodeID::new(7)), "7");
    }

    #[test]
    fn test_scratch_key_from_node() {
        let key: ScratchKey = NodeID::new(42).into();
        assert_eq!(key.id(), 42);
    }
}
