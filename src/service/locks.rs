//! Per-group locks.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::GroupId;

/// Lazily created mutex per course group.
///
/// Creation holds the source group's mutex. Approval holds the mutexes of
/// both its groups, taken in ascending id order, so the recount, the commit
/// and the counter re-sync see no competing seat grants.
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `group_id`; lock it for the critical section.
    pub fn get(&self, group_id: &GroupId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(group_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of groups that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_group_same_mutex() {
        let locks = GroupLocks::new();
        let a = locks.get(&GroupId::new("G1"));
        let b = locks.get(&GroupId::new("G1"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);

        let _held = a.lock();
        assert!(b.try_lock().is_none());
        assert!(locks.get(&GroupId::new("G2")).try_lock().is_some());
    }
}
