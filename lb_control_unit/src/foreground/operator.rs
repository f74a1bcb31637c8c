//! Operator bindings: controller frame → commands.
//!
//! | Input                  | Effect                                        |
//! |------------------------|-----------------------------------------------|
//! | lift up / down (held)  | manual velocity, refreshed every frame        |
//! | preset cycle (press)   | move to the next target after the current one |
//! | home (press)           | move to IDLE                                  |
//! | intake fwd / rev (held)| short intake run, refreshed every frame       |
//! | intake toggle (press)  | long intake run, or cancel if toggled on      |
//!
//! Releasing the lift buttons sends nothing: the manual command goes stale
//! and the lift decays on its own. A held intake button overrides the
//! toggle only while held; on release the toggled run resumes, or the intake
//! is cancelled if the toggle is off. The toggle lapses when its run expires.
//!
//! Without a physical controller the bindings replay a frame script:
//!
//! ```toml
//! [[frame]]
//! at_ms = 0
//! intake_toggle = true
//!
//! [[frame]]
//! at_ms = 100
//! ```
//!
//! Each frame holds until the next one; omitted buttons are released.

use std::path::Path;

use lb_common::config::{ConfigError, ConfigLoader};
use lb_common::consts::INTAKE_RUN_MS_MAX;
use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::state::LiftTarget;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::command::surface::CommandSurface;
use crate::foreground::{Foreground, ForegroundStep};

/// Button state for one foreground period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ControllerFrame {
    pub lift_up: bool,
    pub lift_down: bool,
    pub preset_cycle: bool,
    pub home: bool,
    pub intake_forward: bool,
    pub intake_reverse: bool,
    pub intake_toggle: bool,
}

/// Controller polling seam.
pub trait ControllerSource {
    /// Frame at `now_ms`, or `None` when the controller is disconnected
    /// (treated as everything released).
    fn poll(&mut self, now_ms: u64) -> Option<ControllerFrame>;
}

/// Speeds and run lengths used by the bindings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingParams {
    /// Manual lift velocity magnitude [rpm].
    pub manual_velocity: f64,
    /// Intake speed magnitude [rpm].
    pub intake_speed: f64,
    /// Run length for held intake buttons, refreshed every frame [ms].
    pub held_run_ms: u64,
    /// Run length for the toggle [ms].
    pub toggle_run_ms: u64,
}

impl BindingParams {
    pub fn from_config(cfg: &ControlUnitConfig) -> Self {
        Self {
            manual_velocity: cfg.lift.max_manual_velocity,
            intake_speed: cfg.intake.nominal_speed,
            held_run_ms: cfg.cycle.foreground_period_ms * 4,
            toggle_run_ms: INTAKE_RUN_MS_MAX,
        }
    }
}

pub struct OperatorBindings<C> {
    source: C,
    params: BindingParams,
    prev: ControllerFrame,
    intake_held: bool,
    /// Expiry of the toggled run; `None` while the toggle is off.
    toggled_until_ms: Option<u64>,
}

impl<C: ControllerSource> OperatorBindings<C> {
    pub fn new(source: C, params: BindingParams) -> Self {
        Self {
            source,
            params,
            prev: ControllerFrame::default(),
            intake_held: false,
            toggled_until_ms: None,
        }
    }

    /// Whether the intake toggle is on.
    pub fn is_toggled(&self) -> bool {
        self.toggled_until_ms.is_some()
    }

    fn start_toggled_run(&mut self, now_ms: u64, surface: &CommandSurface) {
        match surface.request_intake_run(self.params.toggle_run_ms, self.params.intake_speed) {
            Ok(_) => self.toggled_until_ms = Some(now_ms + self.params.toggle_run_ms),
            Err(e) => {
                warn!(error = %e, "Intake toggle rejected");
                self.toggled_until_ms = None;
            }
        }
    }

    fn lift(&mut self, frame: &ControllerFrame, surface: &CommandSurface) {
        let v = self.params.manual_velocity;
        let velocity = match (frame.lift_up, frame.lift_down) {
            (true, false) => Some(v),
            (false, true) => Some(-v),
            _ => None,
        };
        if let Some(v) = velocity {
            if let Err(e) = surface.request_manual_velocity(v) {
                warn!(error = %e, "Manual lift rejected");
            }
        }

        if frame.home && !self.prev.home {
            let _ = surface.request_automatic_move(LiftTarget::Idle);
        } else if frame.preset_cycle && !self.prev.preset_cycle {
            let next = surface.status().lift.target.next();
            debug!(%next, "Preset cycle");
            let _ = surface.request_automatic_move(next);
        }
    }

    fn intake(&mut self, now_ms: u64, frame: &ControllerFrame, surface: &CommandSurface) {
        if self.toggled_until_ms.is_some_and(|until| now_ms >= until) {
            debug!("Intake toggle lapsed");
            self.toggled_until_ms = None;
        }

        let speed = self.params.intake_speed;
        let held = match (frame.intake_forward, frame.intake_reverse) {
            (true, false) => Some(speed),
            (false, true) => Some(-speed),
            _ => None,
        };
        match held {
            Some(s) => {
                if let Err(e) = surface.request_intake_run(self.params.held_run_ms, s) {
                    warn!(error = %e, "Intake run rejected");
                }
                self.intake_held = true;
            }
            None if self.intake_held => {
                self.intake_held = false;
                if self.is_toggled() {
                    self.start_toggled_run(now_ms, surface);
                } else {
                    surface.cancel_intake_run();
                }
            }
            None => {}
        }

        if frame.intake_toggle && !self.prev.intake_toggle {
            if self.is_toggled() {
                self.toggled_until_ms = None;
                if held.is_none() {
                    surface.cancel_intake_run();
                }
            } else if held.is_some() {
                // Takes over once the held button is released.
                self.toggled_until_ms = Some(now_ms + self.params.toggle_run_ms);
            } else {
                self.start_toggled_run(now_ms, surface);
            }
        }
    }
}

impl<C: ControllerSource> Foreground for OperatorBindings<C> {
    fn step(&mut self, now_ms: u64, surface: &CommandSurface) -> ForegroundStep {
        let frame = self.source.poll(now_ms).unwrap_or_default();
        self.lift(&frame, surface);
        self.intake(now_ms, &frame, surface);
        self.prev = frame;
        ForegroundStep::Continue
    }
}

/// One scripted frame, held from `at_ms` until the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimedFrame {
    pub at_ms: u64,
    #[serde(flatten)]
    pub frame: ControllerFrame,
}

/// Frame script as read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ControllerScript {
    #[serde(default, rename = "frame")]
    pub frames: Vec<TimedFrame>,
}

impl ControllerScript {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, pair) in self.frames.windows(2).enumerate() {
            if pair[1].at_ms < pair[0].at_ms {
                return Err(ConfigError::ValidationError(format!(
                    "frame {} at_ms {} is before frame {} at_ms {}",
                    i + 1,
                    pair[1].at_ms,
                    i,
                    pair[0].at_ms
                )));
            }
        }
        Ok(())
    }
}

/// Controller replaying frames by timestamp: each entry holds from its
/// time until the next one.
#[derive(Debug, Clone, Default)]
pub struct ScriptedController {
    frames: Vec<(u64, ControllerFrame)>,
}

impl ScriptedController {
    /// `frames` must be ordered by time.
    pub fn new(frames: Vec<(u64, ControllerFrame)>) -> Self {
        Self { frames }
    }

    pub fn from_script(script: ControllerScript) -> Result<Self, ConfigError> {
        script.validate()?;
        Ok(Self::new(
            script.frames.into_iter().map(|f| (f.at_ms, f.frame)).collect(),
        ))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_script(ControllerScript::load(path)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::from_script(ControllerScript::from_toml(content)?)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl ControllerSource for ScriptedController {
    fn poll(&mut self, now_ms: u64) -> Option<ControllerFrame> {
        self.frames
            .iter()
            .take_while(|(t, _)| *t <= now_ms)
            .last()
            .map(|&(_, f)| f)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
