//! Prelude module for common re-exports.
//!
//! ```rust
//! use lb_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::{
    ColorSortConfig, ControlUnitConfig, CycleConfig, IntakeConfig, LiftConfig,
    OutOfBoundsPolicy, PidConfig, PositionTable,
};

// ─── Commands & State ───────────────────────────────────────────────
pub use crate::control_unit::color::HueBand;
pub use crate::control_unit::command::{IntakeCommand, LiftCommand, Stamped};
pub use crate::control_unit::error::{CommandError, SensorFault};
pub use crate::control_unit::state::{
    Alliance, EjectPhase, IntakeStatus, LiftMode, LiftStatus, LiftTarget,
};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{BACKGROUND_PERIOD_MS, FOREGROUND_PERIOD_MS};
