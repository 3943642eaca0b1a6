//! Conflict collection

use mosaic_core::{Conflict, ConflictObserver};
use parking_lot::Mutex;

/// Observer keeping every reported conflict for later assertions
#[derive(Debug, Default)]
pub struct CollectingObserver {
    conflicts: Mutex<Vec<Conflict>>,
}

impl CollectingObserver {
    /// Empty observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Conflicts reported so far
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.conflicts.lock().clone()
    }

    /// Names of the conflicted members, in report order
    pub fn members(&self) -> Vec<String> {
        self.conflicts
            .lock()
            .iter()
            .map(|c| c.member.clone())
            .collect()
    }

    /// Number of conflicts reported
    pub fn len(&self) -> usize {
        self.conflicts.lock().len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.conflicts.lock().is_empty()
    }
}

impl ConflictObserver for CollectingObserver {
    fn on_conflict(&self, conflict: &Conflict) {
        self.conflicts.lock().push(conflict.clone());
    }
}
