//! Timed command routine.
//!
//! A routine is a list of steps, each issued once its `at_ms` offset from
//! the start of the period has passed. Steps are issued in file order.
//!
//! # TOML Example
//!
//! ```toml
//! name = "score-and-reset"
//! duration_ms = 6000
//!
//! [[step]]
//! at_ms = 0
//! action = "move"
//! target = "intake"
//!
//! [[step]]
//! at_ms = 500
//! action = "intake"
//! duration_ms = 2000
//!
//! [[step]]
//! at_ms = 3000
//! action = "manual"
//! velocity = -80.0
//! hold_ms = 400
//!
//! [[step]]
//! at_ms = 4000
//! action = "cancel_intake"
//! ```
//!
//! A `manual` step is refreshed every foreground period for `hold_ms` and
//! then released, after which the lift decays to zero on its own.

use std::path::Path;

use lb_common::config::{ConfigError, ConfigLoader};
use lb_common::control_unit::error::CommandError;
use lb_common::control_unit::state::LiftTarget;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::command::surface::CommandSurface;
use crate::foreground::{Foreground, ForegroundStep};

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutineAction {
    /// Closed-loop move to a named target.
    Move { target: LiftTarget },
    /// Manual lift velocity held for `hold_ms`.
    Manual {
        velocity: f64,
        #[serde(default)]
        hold_ms: u64,
    },
    /// Bounded intake run. Speed defaults to the configured nominal speed.
    Intake {
        duration_ms: u64,
        #[serde(default)]
        speed: Option<f64>,
    },
    CancelIntake,
}

/// One timed step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RoutineStep {
    /// Offset from the start of the period [ms].
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: RoutineAction,
}

/// On-disk routine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoutineFile {
    #[serde(default)]
    pub name: Option<String>,
    /// Minimum run time [ms]; defaults to the last step's offset.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default, rename = "step")]
    pub steps: Vec<RoutineStep>,
}

impl RoutineFile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        for (i, pair) in self.steps.windows(2).enumerate() {
            if pair[1].at_ms < pair[0].at_ms {
                return invalid(format!(
                    "step {} at_ms {} is before step {} at_ms {}",
                    i + 1,
                    pair[1].at_ms,
                    i,
                    pair[0].at_ms
                ));
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step.action {
                RoutineAction::Manual { velocity, .. } if !velocity.is_finite() => {
                    return invalid(format!("step {i} manual velocity is not finite"));
                }
                RoutineAction::Intake { duration_ms: 0, .. } => {
                    return invalid(format!("step {i} intake duration_ms must be > 0"));
                }
                RoutineAction::Intake {
                    speed: Some(s), ..
                } if !s.is_finite() => {
                    return invalid(format!("step {i} intake speed is not finite"));
                }
                _ => {}
            }
        }
        if let (Some(d), Some(last)) = (self.duration_ms, self.steps.last()) {
            if d < last.at_ms {
                return invalid(format!(
                    "duration_ms {d} ends before the last step at {}",
                    last.at_ms
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ManualHold {
    velocity: f64,
    until_ms: u64,
}

/// Routine executor.
#[derive(Debug, Clone)]
pub struct Routine {
    name: String,
    steps: Vec<RoutineStep>,
    next: usize,
    end_ms: u64,
    nominal_speed: f64,
    hold: Option<ManualHold>,
    rejected: usize,
}

impl Routine {
    pub fn new(file: RoutineFile, nominal_speed: f64) -> Result<Self, ConfigError> {
        file.validate()?;
        let last = file.steps.last().map_or(0, |s| s.at_ms);
        Ok(Self {
            name: file.name.unwrap_or_else(|| "routine".to_string()),
            end_ms: file.duration_ms.unwrap_or(last),
            steps: file.steps,
            next: 0,
            nominal_speed,
            hold: None,
            rejected: 0,
        })
    }

    pub fn load(path: &Path, nominal_speed: f64) -> Result<Self, ConfigError> {
        Self::new(RoutineFile::load(path)?, nominal_speed)
    }

    pub fn from_toml(content: &str, nominal_speed: f64) -> Result<Self, ConfigError> {
        Self::new(RoutineFile::from_toml(content)?, nominal_speed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps issued so far.
    pub fn issued(&self) -> usize {
        self.next
    }

    /// Steps the command surface rejected.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    fn issue(&mut self, index: usize, step: RoutineStep, surface: &CommandSurface) {
        debug!(
            routine = %self.name,
            index,
            at_ms = step.at_ms,
            action = ?step.action,
            "Routine step"
        );
        let result: Result<u64, CommandError> = match step.action {
            RoutineAction::Move { target } => {
                self.hold = None;
                surface.request_automatic_move(target)
            }
            RoutineAction::Manual { velocity, hold_ms } => {
                // Without a hold the command is a single pulse that goes
                // stale on its own.
                self.hold = (hold_ms > 0).then_some(ManualHold {
                    velocity,
                    until_ms: step.at_ms + hold_ms,
                });
                surface.request_manual_velocity(velocity)
            }
            RoutineAction::Intake { duration_ms, speed } => {
                surface.request_intake_run(duration_ms, speed.unwrap_or(self.nominal_speed))
            }
            RoutineAction::CancelIntake => Ok(surface.cancel_intake_run()),
        };
        if let Err(e) = result {
            warn!(routine = %self.name, index, error = %e, "Routine step rejected");
            self.rejected += 1;
            if matches!(step.action, RoutineAction::Manual { .. }) {
                self.hold = None;
            }
        }
    }
}

impl Foreground for Routine {
    fn step(&mut self, now_ms: u64, surface: &CommandSurface) -> ForegroundStep {
        let mut issued_manual = false;
        while let Some(&step) = self.steps.get(self.next) {
            if step.at_ms > now_ms {
                break;
            }
            let index = self.next;
            self.next += 1;
            issued_manual = matches!(step.action, RoutineAction::Manual { .. });
            self.issue(index, step, surface);
        }

        if let Some(hold) = self.hold.filter(|_| !issued_manual) {
            if now_ms >= hold.until_ms {
                // Release; the lift decays from here.
                let _ = surface.request_manual_velocity(0.0);
                self.hold = None;
            } else {
                let _ = surface.request_manual_velocity(hold.velocity);
            }
        }

        if self.next == self.steps.len() && self.hold.is_none() && now_ms >= self.end_ms {
            info!(
                routine = %self.name,
                issued = self.next,
                rejected = self.rejected,
                "Routine complete"
            );
            ForegroundStep::Finished
        } else {
            ForegroundStep::Continue
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
