//! Conflict diagnostics
//!
//! A merge that finds two unrelated definitions of the same member reports a
//! [`Conflict`] to a [`ConflictObserver`]. The default observer logs through
//! `tracing`; tests install a collecting observer instead.

use std::fmt;

use crate::function::Function;

/// Two unrelated sources supplied the same member and no later source
/// overrode it.
#[derive(Clone)]
pub struct Conflict {
    /// Member name
    pub member: String,
    /// Definition present before the conflicting source was merged
    pub existing: Function,
    /// Definition supplied by the conflicting source
    pub incoming: Function,
}

impl Conflict {
    /// Diagnostic text shown to the composer's author
    pub fn message(&self) -> String {
        format!(
            "conflicted method `{}`, final composer must explicitly override with correct method",
            self.member
        )
    }
}

impl fmt::Debug for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conflict")
            .field("member", &self.member)
            .field("existing", &self.existing)
            .field("incoming", &self.incoming)
            .finish()
    }
}

/// Receiver of conflict diagnostics
pub trait ConflictObserver: Send + Sync {
    /// Called once per unresolved conflict, after the merge finished
    fn on_conflict(&self, conflict: &Conflict);
}

/// Observer writing each conflict to the `tracing` error stream
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ConflictObserver for TracingObserver {
    fn on_conflict(&self, conflict: &Conflict) {
        tracing::error!(
            member = %conflict.member,
            existing = ?conflict.existing,
            incoming = ?conflict.incoming,
            "{}",
            conflict.message()
        );
    }
}
