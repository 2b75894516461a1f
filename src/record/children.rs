//! Child state of a record

use crate::record::Record;

/// Children of a record
///
/// Only [`Children::Loaded`] is iterable; the other two states describe what
/// may exist without holding any records.
#[derive(Debug, Clone, Default)]
pub enum Children {
    /// No children possible
    #[default]
    Leaf,
    /// Expandable, not yet fetched
    Pending,
    /// Loaded, in current order
    Loaded(Vec<Record>),
}

impl Children {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Children::Leaf)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Children::Pending)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Children::Loaded(_))
    }

    /// Loaded children, or an empty slice
    pub fn as_slice(&self) -> &[Record] {
        match self {
            Children::Loaded(records) => records,
            _ => &[],
        }
    }

    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Children::Loaded(records) => records,
            _ => Vec::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.as_slice().get(index)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True when at least one loaded child exists
    pub fn has_any(&self) -> bool {
        !self.as_slice().is_empty()
    }

    /// Same state and, when loaded, the same records in the same order
    pub fn same_as(&self, other: &Children) -> bool {
        match (self, other) {
            (Children::Leaf, Children::Leaf) | (Children::Pending, Children::Pending) => true,
            (Children::Loaded(a), Children::Loaded(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.ptr_eq(y))
            }
            _ => false,
        }
    }
}
