//! Cross-task command types.
//!
//! Commands travel from the foreground (operator / routine) to the
//! background tasks as immutable [`Stamped`] snapshots through a single-slot
//! mailbox per mechanism. Only the latest command is ever honored; there is
//! no queue. A newer request supersedes an older one that the background
//! task has not picked up yet.

use super::state::LiftTarget;

/// Command for the lift task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiftCommand {
    /// Pursue a named target under closed-loop control.
    Move(LiftTarget),
    /// Drive at a fixed velocity while the operator holds an override.
    ///
    /// Must be refreshed; a manual command older than the configured TTL
    /// is treated as released.
    Manual { velocity: f64 },
}

/// Command for the intake task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntakeCommand {
    /// Run the intake for a bounded time. Supersedes any active run.
    Run { duration_ms: u64, speed: f64 },
    /// Stop the active run, if any.
    Cancel,
}

/// Immutable command snapshot as stored in a command slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamped<C> {
    /// Slot-local sequence number, strictly increasing per publish.
    pub seq: u64,
    /// Clock time at which the command was issued [ms].
    pub issued_at_ms: u64,
    /// The command itself.
    pub command: C,
}

impl<C> Stamped<C> {
    /// Age of the command at `now_ms`, saturating at zero for clock skew.
    #[inline]
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.issued_at_ms)
    }
}
