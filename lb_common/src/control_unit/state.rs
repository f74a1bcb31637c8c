//! State enums and status snapshots shared across the control unit.
//!
//! The enums here are the externally visible vocabulary: target labels,
//! the coarse lift mode, the eject phase and the alliance side. The internal
//! tagged state of each machine lives in `lb_control_unit::state` and is
//! never exposed; callers only ever see the [`LiftStatus`] / [`IntakeStatus`]
//! snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SensorFault;

// ─── Lift ───────────────────────────────────────────────────────────

/// Named lift target position.
///
/// Ordered bottom to top; the position table keeps the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LiftTarget {
    /// Home / stowed. Settling here re-zeroes the position sensor.
    Idle = 0,
    /// Ring pick-up height.
    Intake = 1,
    /// Above the intake path, clear of rings.
    Clear = 2,
}

impl LiftTarget {
    /// All targets, bottom to top.
    pub const ALL: [Self; 3] = [Self::Idle, Self::Intake, Self::Clear];

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Intake),
            2 => Some(Self::Clear),
            _ => None,
        }
    }

    /// Table index of this target.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Next target in the operator toggle cycle (IDLE → INTAKE → CLEAR → IDLE).
    #[inline]
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Intake,
            Self::Intake => Self::Clear,
            Self::Clear => Self::Idle,
        }
    }

    /// Lowercase label, as used in config and routine files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Intake => "intake",
            Self::Clear => "clear",
        }
    }
}

impl Default for LiftTarget {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for LiftTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`LiftTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTarget(pub String);

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown lift target '{}'", self.0)
    }
}

impl std::error::Error for UnknownTarget {}

impl FromStr for LiftTarget {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "intake" => Ok(Self::Intake),
            "clear" => Ok(Self::Clear),
            _ => Err(UnknownTarget(s.to_string())),
        }
    }
}

/// Coarse lift mode, as reported in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LiftMode {
    /// Operator override is (or was last) driving the lift directly.
    Manual = 0,
    /// Closed-loop pursuit of a named target.
    Automatic = 1,
    /// Within tolerance of the target; holding at zero velocity.
    Settling = 2,
}

impl Default for LiftMode {
    fn default() -> Self {
        Self::Automatic
    }
}

/// Read-only lift snapshot published by the lift task every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiftStatus {
    /// Current mode.
    pub mode: LiftMode,
    /// Last accepted position reading [sensor units].
    pub position: f64,
    /// Target being pursued, or the last one pursued while in manual.
    pub target: LiftTarget,
    /// Velocity commanded this tick.
    pub velocity: f64,
    /// Position reference is untrusted after a manual excursion.
    pub out_of_bounds: bool,
    /// Sensor/actuator faults observed this tick.
    pub faults: SensorFault,
    /// Tick counter of the publishing task.
    pub tick: u64,
}

// ─── Intake / Ring Eject ────────────────────────────────────────────

/// Ring-eject sub-machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EjectPhase {
    /// Intake runs at the commanded velocity.
    Normal = 0,
    /// Rejected color seen; waiting for the ring to reach the eject point.
    Candidate = 1,
    /// Intake stopped to fling the ring off.
    Ejecting = 2,
}

impl Default for EjectPhase {
    fn default() -> Self {
        Self::Normal
    }
}

/// Alliance side. Fixed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alliance {
    Red,
    Blue,
}

impl Alliance {
    /// The other side; its rings are the ones to reject.
    #[inline]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

impl Default for Alliance {
    fn default() -> Self {
        Self::Red
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Blue => "blue",
        })
    }
}

impl FromStr for Alliance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            other => Err(format!("unknown alliance '{other}' (expected red or blue)")),
        }
    }
}

/// Read-only intake snapshot published by the intake task every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntakeStatus {
    /// Whether a run command is active.
    pub running: bool,
    /// Eject phase.
    pub phase: EjectPhase,
    /// Velocity commanded this tick.
    pub velocity: f64,
    /// Rings ejected since the task started.
    pub ejected: u32,
    /// Sensor/actuator faults observed this tick.
    pub faults: SensorFault,
    /// Tick counter of the publishing task.
    pub tick: u64,
}
