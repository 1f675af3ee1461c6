//! Lock bookkeeping for blocks and wires.
//!
//! The registry is plain state. It never validates or refuses anything on its
//! own; the facade and the placement optimizer consult it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{BlockId, LockTarget, WireId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRegistry {
    locked: BTreeSet<LockTarget>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, target: impl Into<LockTarget>) -> bool {
        self.locked.contains(&target.into())
    }

    /// Returns true if the state actually changed.
    pub fn set_locked(&mut self, target: impl Into<LockTarget>, locked: bool) -> bool {
        let target = target.into();
        if locked {
            self.locked.insert(target)
        } else {
            self.locked.remove(&target)
        }
    }

    pub fn is_block_locked(&self, id: BlockId) -> bool {
        self.is_locked(id)
    }

    pub fn is_wire_locked(&self, id: WireId) -> bool {
        self.is_locked(id)
    }

    /// Drop the entry of an entity that no longer exists.
    pub(crate) fn forget(&mut self, target: impl Into<LockTarget>) {
        self.locked.remove(&target.into());
    }

    /// Clear every lock, returning how many were set.
    pub fn clear(&mut self) -> usize {
        let count = self.locked.len();
        self.locked.clear();
        count
    }

    pub fn iter(&self) -> impl Iterator<Item = LockTarget> + '_ {
        self.locked.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.locked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_and_unlock() {
        let mut locks = LockRegistry::new();
        assert!(!locks.is_locked(BlockId(1)));
        assert!(locks.set_locked(BlockId(1), true));
        assert!(!locks.set_locked(BlockId(1), true));
        assert!(locks.is_block_locked(BlockId(1)));
        assert!(!locks.is_wire_locked(WireId(1)));
        assert!(locks.set_locked(BlockId(1), false));
        assert!(locks.is_empty());
    }

    #[test]
    fn test_clear_counts() {
        let mut locks = LockRegistry::new();
        locks.set_locked(BlockId(1), true);
        locks.set_locked(WireId(2), true);
        assert_eq!(locks.clear(), 2);
        assert_eq!(locks.len(), 0);
    }
}
