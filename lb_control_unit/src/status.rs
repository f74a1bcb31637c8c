//! Latest status snapshots published by the background tasks.

use lb_common::control_unit::state::{IntakeStatus, LiftStatus};
use parking_lot::RwLock;

/// Combined read-only view for telemetry and the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemStatus {
    pub lift: LiftStatus,
    pub intake: IntakeStatus,
}

/// Each task is the single writer of its own half.
#[derive(Debug, Default)]
pub struct StatusBoard {
    lift: RwLock<LiftStatus>,
    intake: RwLock<IntakeStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn publish_lift(&self, status: LiftStatus) {
        *self.lift.write() = status;
    }

    #[inline]
    pub fn publish_intake(&self, status: IntakeStatus) {
        *self.intake.write() = status;
    }

    #[inline]
    pub fn lift(&self) -> LiftStatus {
        *self.lift.read()
    }

    #[inline]
    pub fn intake(&self) -> IntakeStatus {
        *self.intake.read()
    }

    pub fn snapshot(&self) -> SystemStatus {
        SystemStatus {
            lift: self.lift(),
            intake: self.intake(),
        }
    }
}
