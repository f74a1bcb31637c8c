//! Configuration structures for the control unit.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every field
//! has a `#[serde(default)]` so a minimal file only has to name what it
//! changes. Numeric parameters are bound-checked in `validate()` against
//! the constants in [`crate::consts`].

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    BACKGROUND_PERIOD_MS, COLOR_SORT_MS_MAX, DECAY_STEP_DEFAULT, EJECT_COOLDOWN_MS_DEFAULT,
    EJECT_DURATION_MS_DEFAULT, FOREGROUND_PERIOD_MS, INTAKE_SPEED_DEFAULT, INTAKE_SPEED_MAX,
    LIFT_MAX_VELOCITY_DEFAULT, LIFT_POSITION_CLEAR, LIFT_POSITION_IDLE, LIFT_POSITION_INTAKE,
    LIFT_VELOCITY_LIMIT_MAX, MANUAL_TTL_MS_DEFAULT, MANUAL_TTL_MS_MAX, MANUAL_TTL_MS_MIN,
    MIN_VELOCITY_DEFAULT, PERIOD_MS_MAX, PERIOD_MS_MIN, SETTLE_TOLERANCE_DEFAULT,
    TELEMETRY_INTERVAL_DEFAULT, TRAVEL_DELAY_MS_DEFAULT, TRAVEL_MAX_DEFAULT, TRAVEL_MIN_DEFAULT,
};

use super::color::HueBand;
use super::state::{Alliance, LiftTarget};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level control unit configuration. Immutable once the session starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ControlUnitConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub lift: LiftConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
}

impl ControlUnitConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.cycle.validate().map_err(ConfigError::ValidationError)?;
        self.lift.validate().map_err(ConfigError::ValidationError)?;
        self.intake.validate().map_err(ConfigError::ValidationError)?;
        Ok(())
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Task periods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// Period of the actuator-owning background tasks [ms] (default: 10).
    #[serde(default = "default_background_period")]
    pub background_period_ms: u64,

    /// Period of the foreground command loop [ms] (default: 25).
    #[serde(default = "default_foreground_period")]
    pub foreground_period_ms: u64,

    /// Telemetry log interval [background ticks] (default: 20).
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval: u32,
}

fn default_background_period() -> u64 {
    BACKGROUND_PERIOD_MS
}
fn default_foreground_period() -> u64 {
    FOREGROUND_PERIOD_MS
}
fn default_telemetry_interval() -> u32 {
    TELEMETRY_INTERVAL_DEFAULT
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            background_period_ms: BACKGROUND_PERIOD_MS,
            foreground_period_ms: FOREGROUND_PERIOD_MS,
            telemetry_interval: TELEMETRY_INTERVAL_DEFAULT,
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("background_period_ms", self.background_period_ms),
            ("foreground_period_ms", self.foreground_period_ms),
        ] {
            if !(PERIOD_MS_MIN..=PERIOD_MS_MAX).contains(&v) {
                return Err(format!(
                    "cycle.{name} {v} out of range [{PERIOD_MS_MIN}, {PERIOD_MS_MAX}]"
                ));
            }
        }
        if self.telemetry_interval == 0 {
            return Err("cycle.telemetry_interval must be at least 1".to_string());
        }
        Ok(())
    }
}

// ─── Lift ───────────────────────────────────────────────────────────

/// Sensor position of each named target. Must be strictly increasing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PositionTable {
    pub idle: f64,
    pub intake: f64,
    pub clear: f64,
}

impl Default for PositionTable {
    fn default() -> Self {
        Self {
            idle: LIFT_POSITION_IDLE,
            intake: LIFT_POSITION_INTAKE,
            clear: LIFT_POSITION_CLEAR,
        }
    }
}

impl PositionTable {
    /// Setpoint for a target.
    #[inline]
    pub const fn position(&self, target: LiftTarget) -> f64 {
        match target {
            LiftTarget::Idle => self.idle,
            LiftTarget::Intake => self.intake,
            LiftTarget::Clear => self.clear,
        }
    }

    /// `(target, position)` pairs, bottom to top.
    pub fn entries(&self) -> [(LiftTarget, f64); 3] {
        LiftTarget::ALL.map(|t| (t, self.position(t)))
    }

    pub fn validate(&self) -> Result<(), String> {
        let entries = self.entries();
        for (t, p) in entries {
            if !p.is_finite() {
                return Err(format!("lift.positions.{t} is not finite"));
            }
        }
        for pair in entries.windows(2) {
            let (lo_t, lo) = pair[0];
            let (hi_t, hi) = pair[1];
            if lo >= hi {
                return Err(format!(
                    "lift.positions must be strictly increasing: {lo_t}={lo} >= {hi_t}={hi}"
                ));
            }
        }
        Ok(())
    }
}

/// What to do with a move request while the position reference is untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfBoundsPolicy {
    /// Go to the nearest labeled position at or above the current reading.
    #[default]
    SafeTable,
    /// Always return home first.
    ResetToIdle,
}

/// PID gains for the lift position loop. Output limit comes from
/// `LiftConfig::max_velocity`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PidConfig {
    /// Proportional gain [rpm per sensor unit].
    #[serde(default = "default_kp")]
    pub kp: f64,
    /// Integral gain (0 = disabled).
    #[serde(default)]
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    #[serde(default)]
    pub kd: f64,
    /// Derivative filter time constant [s] (0 = unfiltered).
    #[serde(default)]
    pub tf: f64,
    /// Anti-windup tracking time constant [s] (0 = disabled).
    #[serde(default)]
    pub tt: f64,
}

fn default_kp() -> f64 {
    0.5
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: 0.0,
            kd: 0.0,
            tf: 0.0,
            tt: 0.0,
        }
    }
}

impl PidConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("tf", self.tf),
            ("tt", self.tt),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("lift.pid.{name} {v} must be finite and >= 0"));
            }
        }
        if self.kp == 0.0 && self.ki == 0.0 {
            return Err("lift.pid needs kp or ki > 0 to converge".to_string());
        }
        Ok(())
    }
}

/// Lift controller parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LiftConfig {
    #[serde(default)]
    pub positions: PositionTable,

    /// `|error|` below which an automatic move settles [sensor units].
    #[serde(default = "default_settle_tolerance")]
    pub settle_tolerance: f64,

    /// Closed-loop output limit [rpm].
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,

    /// Largest accepted manual velocity request [rpm].
    #[serde(default = "default_max_velocity")]
    pub max_manual_velocity: f64,

    /// Largest velocity change per tick while decaying to zero [rpm].
    #[serde(default = "default_decay_step")]
    pub decay_step: f64,

    /// Below this magnitude the decay snaps to zero [rpm].
    #[serde(default = "default_min_velocity")]
    pub min_velocity: f64,

    /// Manual command lifetime without refresh [ms].
    #[serde(default = "default_manual_ttl")]
    pub manual_ttl_ms: u64,

    /// Plausible sensor range; readings outside are discarded.
    #[serde(default = "default_travel_min")]
    pub travel_min: f64,
    #[serde(default = "default_travel_max")]
    pub travel_max: f64,

    /// Readings at or below this act as the zero event when no limit switch
    /// is fitted (None = limit switch only).
    #[serde(default)]
    pub zero_threshold: Option<f64>,

    #[serde(default)]
    pub out_of_bounds_policy: OutOfBoundsPolicy,

    #[serde(default)]
    pub pid: PidConfig,
}

fn default_settle_tolerance() -> f64 {
    SETTLE_TOLERANCE_DEFAULT
}
fn default_max_velocity() -> f64 {
    LIFT_MAX_VELOCITY_DEFAULT
}
fn default_decay_step() -> f64 {
    DECAY_STEP_DEFAULT
}
fn default_min_velocity() -> f64 {
    MIN_VELOCITY_DEFAULT
}
fn default_manual_ttl() -> u64 {
    MANUAL_TTL_MS_DEFAULT
}
fn default_travel_min() -> f64 {
    TRAVEL_MIN_DEFAULT
}
fn default_travel_max() -> f64 {
    TRAVEL_MAX_DEFAULT
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            positions: PositionTable::default(),
            settle_tolerance: SETTLE_TOLERANCE_DEFAULT,
            max_velocity: LIFT_MAX_VELOCITY_DEFAULT,
            max_manual_velocity: LIFT_MAX_VELOCITY_DEFAULT,
            decay_step: DECAY_STEP_DEFAULT,
            min_velocity: MIN_VELOCITY_DEFAULT,
            manual_ttl_ms: MANUAL_TTL_MS_DEFAULT,
            travel_min: TRAVEL_MIN_DEFAULT,
            travel_max: TRAVEL_MAX_DEFAULT,
            zero_threshold: None,
            out_of_bounds_policy: OutOfBoundsPolicy::SafeTable,
            pid: PidConfig::default(),
        }
    }
}

impl LiftConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.positions.validate()?;
        self.pid.validate()?;

        for (name, v) in [
            ("settle_tolerance", self.settle_tolerance),
            ("decay_step", self.decay_step),
            ("min_velocity", self.min_velocity),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(format!("lift.{name} {v} must be > 0"));
            }
        }
        for (name, v) in [
            ("max_velocity", self.max_velocity),
            ("max_manual_velocity", self.max_manual_velocity),
        ] {
            if !v.is_finite() || v <= 0.0 || v > LIFT_VELOCITY_LIMIT_MAX {
                return Err(format!(
                    "lift.{name} {v} out of range (0, {LIFT_VELOCITY_LIMIT_MAX}]"
                ));
            }
        }
        if self.min_velocity > self.decay_step {
            return Err(format!(
                "lift.min_velocity {} must not exceed lift.decay_step {}",
                self.min_velocity, self.decay_step
            ));
        }
        if !(MANUAL_TTL_MS_MIN..=MANUAL_TTL_MS_MAX).contains(&self.manual_ttl_ms) {
            return Err(format!(
                "lift.manual_ttl_ms {} out of range [{MANUAL_TTL_MS_MIN}, {MANUAL_TTL_MS_MAX}]",
                self.manual_ttl_ms
            ));
        }
        if !(self.travel_min.is_finite() && self.travel_max.is_finite())
            || self.travel_min >= self.travel_max
        {
            return Err(format!(
                "lift.travel_min {} must be below lift.travel_max {}",
                self.travel_min, self.travel_max
            ));
        }
        for (t, p) in self.positions.entries() {
            if p < self.travel_min || p > self.travel_max {
                return Err(format!(
                    "lift.positions.{t}={p} outside travel range [{}, {}]",
                    self.travel_min, self.travel_max
                ));
            }
        }
        if let Some(z) = self.zero_threshold {
            if !z.is_finite() || z >= self.positions.intake {
                return Err(format!(
                    "lift.zero_threshold {z} must be finite and below the intake position"
                ));
            }
        }
        Ok(())
    }
}

// ─── Intake ─────────────────────────────────────────────────────────

/// Ring color sorting parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ColorSortConfig {
    /// Disabled = intake is a pass-through at the commanded speed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Our side. Rings of the opponent's color are ejected.
    #[serde(default)]
    pub alliance: Alliance,

    /// Time from detection until the ring reaches the eject point [ms].
    #[serde(default = "default_travel_delay")]
    pub travel_delay_ms: u64,

    /// How long the intake stops to eject [ms].
    #[serde(default = "default_eject_duration")]
    pub eject_duration_ms: u64,

    /// Detections within this window after an accepted one are ignored [ms].
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    #[serde(default = "default_red_band")]
    pub red_band: HueBand,

    #[serde(default = "default_blue_band")]
    pub blue_band: HueBand,
}

fn default_true() -> bool {
    true
}
fn default_travel_delay() -> u64 {
    TRAVEL_DELAY_MS_DEFAULT
}
fn default_eject_duration() -> u64 {
    EJECT_DURATION_MS_DEFAULT
}
fn default_cooldown() -> u64 {
    EJECT_COOLDOWN_MS_DEFAULT
}
fn default_red_band() -> HueBand {
    HueBand::new(340.0, 20.0)
}
fn default_blue_band() -> HueBand {
    HueBand::new(180.0, 250.0)
}

impl Default for ColorSortConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alliance: Alliance::Red,
            travel_delay_ms: TRAVEL_DELAY_MS_DEFAULT,
            eject_duration_ms: EJECT_DURATION_MS_DEFAULT,
            cooldown_ms: EJECT_COOLDOWN_MS_DEFAULT,
            red_band: default_red_band(),
            blue_band: default_blue_band(),
        }
    }
}

impl ColorSortConfig {
    /// Band of the color to reject, fixed by the alliance side.
    #[inline]
    pub fn rejected_band(&self) -> HueBand {
        match self.alliance.opponent() {
            Alliance::Red => self.red_band,
            Alliance::Blue => self.blue_band,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.red_band.validate("intake.color_sort.red_band")?;
        self.blue_band.validate("intake.color_sort.blue_band")?;
        if self.red_band.overlaps(&self.blue_band) {
            return Err("intake.color_sort red_band and blue_band overlap".to_string());
        }
        for (name, v) in [
            ("travel_delay_ms", self.travel_delay_ms),
            ("eject_duration_ms", self.eject_duration_ms),
            ("cooldown_ms", self.cooldown_ms),
        ] {
            if v > COLOR_SORT_MS_MAX {
                return Err(format!(
                    "intake.color_sort.{name} {v} exceeds {COLOR_SORT_MS_MAX}"
                ));
            }
        }
        if self.eject_duration_ms == 0 {
            return Err("intake.color_sort.eject_duration_ms must be > 0".to_string());
        }
        Ok(())
    }
}

/// Intake parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Speed used by operator bindings and routines when none is given [rpm].
    #[serde(default = "default_intake_speed")]
    pub nominal_speed: f64,

    /// Largest accepted intake speed request [rpm].
    #[serde(default = "default_intake_max")]
    pub max_speed: f64,

    #[serde(default)]
    pub color_sort: ColorSortConfig,
}

fn default_intake_speed() -> f64 {
    INTAKE_SPEED_DEFAULT
}
fn default_intake_max() -> f64 {
    INTAKE_SPEED_MAX
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            nominal_speed: INTAKE_SPEED_DEFAULT,
            max_speed: INTAKE_SPEED_MAX,
            color_sort: ColorSortConfig::default(),
        }
    }
}

impl IntakeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 || self.max_speed > INTAKE_SPEED_MAX
        {
            return Err(format!(
                "intake.max_speed {} out of range (0, {INTAKE_SPEED_MAX}]",
                self.max_speed
            ));
        }
        if !self.nominal_speed.is_finite() || self.nominal_speed.abs() > self.max_speed {
            return Err(format!(
                "intake.nominal_speed {} exceeds max_speed {}",
                self.nominal_speed, self.max_speed
            ));
        }
        self.color_sort.validate()
    }
}
