//! Command surface handed to the foreground.
//!
//! Every request is validated here, stamped with the shared clock, and
//! published to the owning task's slot. A rejected request never touches a
//! slot. All requests are fire-and-forget: effects show up on later ticks.

use std::sync::Arc;

use lb_common::consts::INTAKE_RUN_MS_MAX;
use lb_common::control_unit::command::{IntakeCommand, LiftCommand};
use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::error::CommandError;
use lb_common::control_unit::state::LiftTarget;
use tracing::debug;

use crate::clock::Clock;
use crate::command::slot::CommandSlot;
use crate::status::{StatusBoard, SystemStatus};

/// Bounds applied to incoming requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandLimits {
    /// Largest accepted manual lift velocity magnitude [rpm].
    pub max_manual_velocity: f64,
    /// Largest accepted intake speed magnitude [rpm].
    pub max_intake_speed: f64,
    /// Longest accepted intake run [ms].
    pub max_run_ms: u64,
}

impl CommandLimits {
    pub fn from_config(cfg: &ControlUnitConfig) -> Self {
        Self {
            max_manual_velocity: cfg.lift.max_manual_velocity,
            max_intake_speed: cfg.intake.max_speed,
            max_run_ms: INTAKE_RUN_MS_MAX,
        }
    }
}

/// Shared channels between the foreground and the background tasks.
#[derive(Debug)]
pub struct Channels {
    pub lift: CommandSlot<LiftCommand>,
    pub intake: CommandSlot<IntakeCommand>,
    pub status: StatusBoard,
}

impl Channels {
    pub fn new() -> Self {
        Self {
            lift: CommandSlot::new("lift"),
            intake: CommandSlot::new("intake"),
            status: StatusBoard::new(),
        }
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable command handle.
#[derive(Clone)]
pub struct CommandSurface {
    channels: Arc<Channels>,
    clock: Arc<dyn Clock>,
    limits: CommandLimits,
}

impl CommandSurface {
    pub fn new(channels: Arc<Channels>, clock: Arc<dyn Clock>, limits: CommandLimits) -> Self {
        Self {
            channels,
            clock,
            limits,
        }
    }

    #[inline]
    pub fn limits(&self) -> CommandLimits {
        self.limits
    }

    /// Move the lift to `target` under closed-loop control.
    pub fn request_automatic_move(&self, target: LiftTarget) -> Result<u64, CommandError> {
        let seq = self
            .channels
            .lift
            .publish(self.clock.now_ms(), LiftCommand::Move(target));
        debug!(%target, seq, "Move requested");
        Ok(seq)
    }

    /// Like [`Self::request_automatic_move`], parsing the label first.
    pub fn request_automatic_move_named(&self, label: &str) -> Result<u64, CommandError> {
        let target = label
            .parse::<LiftTarget>()
            .map_err(|e| CommandError::UnknownTarget(e.0))?;
        self.request_automatic_move(target)
    }

    /// Drive the lift at `velocity` until the command goes stale. Zero
    /// releases the override.
    pub fn request_manual_velocity(&self, velocity: f64) -> Result<u64, CommandError> {
        if !velocity.is_finite() {
            return Err(CommandError::NotFinite);
        }
        let max = self.limits.max_manual_velocity;
        if velocity.abs() > max {
            return Err(CommandError::VelocityOutOfRange { velocity, max });
        }
        Ok(self
            .channels
            .lift
            .publish(self.clock.now_ms(), LiftCommand::Manual { velocity }))
    }

    /// Run the intake at `speed` for `duration_ms`, superseding any active run.
    pub fn request_intake_run(&self, duration_ms: u64, speed: f64) -> Result<u64, CommandError> {
        if duration_ms == 0 || duration_ms > self.limits.max_run_ms {
            return Err(CommandError::InvalidDuration(duration_ms));
        }
        if !speed.is_finite() {
            return Err(CommandError::NotFinite);
        }
        let max = self.limits.max_intake_speed;
        if speed.abs() > max {
            return Err(CommandError::SpeedOutOfRange { speed, max });
        }
        Ok(self.channels.intake.publish(
            self.clock.now_ms(),
            IntakeCommand::Run { duration_ms, speed },
        ))
    }

    /// Stop the active intake run, if any.
    pub fn cancel_intake_run(&self) -> u64 {
        self.channels
            .intake
            .publish(self.clock.now_ms(), IntakeCommand::Cancel)
    }

    /// Latest published status.
    pub fn status(&self) -> SystemStatus {
        self.channels.status.snapshot()
    }
}
