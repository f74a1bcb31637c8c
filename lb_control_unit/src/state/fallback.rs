//! Position → safe target table for out-of-bounds recovery.
//!
//! After a manual jog the label the lift last pursued says nothing about
//! where it actually is. A move request issued in that state is redirected
//! through this table so the lift never attempts a full-range sweep from an
//! unknown position.
//!
//! The table maps a position to the lowest labeled position at or above it
//! (within the settle tolerance), and to the top label above the table. The
//! mapping is monotonic: a higher position never yields a lower label.

use lb_common::control_unit::config::{OutOfBoundsPolicy, PositionTable};
use lb_common::control_unit::state::LiftTarget;

/// Monotonic position → label table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackTable {
    /// `(target, setpoint)` bottom to top.
    entries: [(LiftTarget, f64); 3],
    /// Slack below a setpoint that still counts as "at" it.
    tolerance: f64,
    policy: OutOfBoundsPolicy,
}

impl FallbackTable {
    pub fn new(positions: &PositionTable, tolerance: f64, policy: OutOfBoundsPolicy) -> Self {
        Self {
            entries: positions.entries(),
            tolerance,
            policy,
        }
    }

    /// Nearest labeled position at or above `position`.
    pub fn safe_target(&self, position: f64) -> LiftTarget {
        let floor = position - self.tolerance;
        self.entries
            .iter()
            .find(|&&(_, setpoint)| setpoint >= floor)
            .map_or(LiftTarget::Clear, |&(t, _)| t)
    }

    /// Effective target for a move requested while out of bounds.
    ///
    /// The requested label is discarded: the table (or the policy) alone
    /// decides where the lift goes first.
    pub fn resolve(&self, position: f64) -> LiftTarget {
        match self.policy {
            OutOfBoundsPolicy::SafeTable => self.safe_target(position),
            OutOfBoundsPolicy::ResetToIdle => LiftTarget::Idle,
        }
    }

    pub fn policy(&self) -> OutOfBoundsPolicy {
        self.policy
    }
}
