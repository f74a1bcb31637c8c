//! Intake run state machine.
//!
//! Holds at most one bounded run command. While a run is active the eject
//! sub-machine decides the velocity; otherwise the intake is stopped. The
//! eject state is reset whenever a run starts, is cancelled, or expires.
//!
//! Color sorting only applies while the intake is pulling rings in
//! (`speed > 0`); reverse runs pass straight through.

use lb_common::control_unit::command::{IntakeCommand, Stamped};
use lb_common::control_unit::config::IntakeConfig;
use lb_common::control_unit::error::SensorFault;
use lb_common::control_unit::state::IntakeStatus;
use tracing::debug;

use crate::state::eject::EjectMachine;

/// Active bounded run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntakeRun {
    /// Issue time of the run command [ms].
    pub start_ms: u64,
    pub duration_ms: u64,
    /// Signed speed [rpm]; negative reverses the intake.
    pub speed: f64,
}

impl IntakeRun {
    #[inline]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start_ms) >= self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntakeInput {
    pub now_ms: u64,
    /// Hue reading; `None` when nothing is in front of the sensor or the
    /// read failed.
    pub hue: Option<f64>,
    pub command: Option<Stamped<IntakeCommand>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntakeOutput {
    pub velocity: f64,
    pub faults: SensorFault,
}

#[derive(Debug, Clone)]
pub struct IntakeStateMachine {
    run: Option<IntakeRun>,
    eject: EjectMachine,
    max_speed: f64,
    velocity: f64,
    faults: SensorFault,
    tick: u64,
}

impl IntakeStateMachine {
    pub fn new(cfg: &IntakeConfig) -> Self {
        Self {
            run: None,
            eject: EjectMachine::new(&cfg.color_sort),
            max_speed: cfg.max_speed,
            velocity: 0.0,
            faults: SensorFault::empty(),
            tick: 0,
        }
    }

    #[inline]
    pub const fn run(&self) -> Option<IntakeRun> {
        self.run
    }

    #[inline]
    pub const fn eject(&self) -> &EjectMachine {
        &self.eject
    }

    pub fn status(&self) -> IntakeStatus {
        IntakeStatus {
            running: self.run.is_some(),
            phase: self.eject.phase(),
            velocity: self.velocity,
            ejected: self.eject.ejected(),
            faults: self.faults,
            tick: self.tick,
        }
    }

    pub fn tick(&mut self, input: &IntakeInput) -> IntakeOutput {
        self.tick += 1;

        if let Some(cmd) = input.command {
            match cmd.command {
                IntakeCommand::Run { duration_ms, speed } => {
                    debug!(duration_ms, speed, "Intake run");
                    self.run = Some(IntakeRun {
                        start_ms: cmd.issued_at_ms,
                        duration_ms,
                        speed: speed.clamp(-self.max_speed, self.max_speed),
                    });
                }
                IntakeCommand::Cancel => {
                    if self.run.take().is_some() {
                        debug!("Intake run cancelled");
                    }
                }
            }
            self.eject.reset();
        }

        if self.run.is_some_and(|r| r.is_expired(input.now_ms)) {
            debug!(now_ms = input.now_ms, "Intake run expired");
            self.run = None;
            self.eject.reset();
        }

        let (velocity, faults) = match self.run {
            Some(run) if run.speed > 0.0 => {
                let out = self.eject.tick(input.hue, input.now_ms, run.speed);
                (out.velocity, out.faults)
            }
            Some(run) => (run.speed, SensorFault::empty()),
            None => (0.0, SensorFault::empty()),
        };

        self.velocity = velocity;
        self.faults = faults;
        IntakeOutput { velocity, faults }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
