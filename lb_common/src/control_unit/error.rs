//! Error types for the control unit.
//!
//! Two families:
//! - [`SensorFault`] bitflags: per-tick observations carried as data in status
//!   snapshots. None of them is fatal; the tick that sees them degrades to
//!   "no new reading" and carries on.
//! - [`CommandError`]: synchronous rejection at the command surface. A
//!   rejected command never reaches a command slot.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Sensor and actuator faults observed during one tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SensorFault: u8 {
        /// Position reading outside the configured travel range.
        const POSITION_IMPLAUSIBLE  = 0x01;
        /// Position sensor read returned an error.
        const POSITION_READ_FAILED  = 0x02;
        /// Limit switch read returned an error.
        const LIMIT_READ_FAILED     = 0x04;
        /// Hue sensor saw no object while color sorting was active.
        const HUE_NO_READ           = 0x08;
        /// Hue reading was not a finite value in [0, 360), or the read failed.
        const HUE_IMPLAUSIBLE       = 0x10;
        /// Actuator write returned an error.
        const ACTUATOR_WRITE_FAILED = 0x20;
    }
}

impl SensorFault {
    /// Faults worth a warning when they appear. `HUE_NO_READ` is the normal
    /// state of an empty intake and only shows up at debug level.
    pub const WARN_MASK: Self = Self::from_bits_truncate(
        Self::POSITION_IMPLAUSIBLE.bits()
            | Self::POSITION_READ_FAILED.bits()
            | Self::LIMIT_READ_FAILED.bits()
            | Self::HUE_IMPLAUSIBLE.bits()
            | Self::ACTUATOR_WRITE_FAILED.bits(),
    );

    /// Returns true if any warn-level fault is set.
    #[inline]
    pub const fn has_warning(&self) -> bool {
        self.intersects(Self::WARN_MASK)
    }
}

impl Default for SensorFault {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rejection reasons for commands issued through the command surface.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    /// Target label not in the position table.
    #[error("unknown lift target '{0}'")]
    UnknownTarget(String),

    /// Manual velocity exceeds the configured manual limit.
    #[error("manual velocity {velocity} outside ±{max}")]
    VelocityOutOfRange { velocity: f64, max: f64 },

    /// Intake speed exceeds the configured limit.
    #[error("intake speed {speed} outside ±{max}")]
    SpeedOutOfRange { speed: f64, max: f64 },

    /// Intake run duration is zero or longer than the accepted maximum.
    #[error("intake run duration {0} ms out of range")]
    InvalidDuration(u64),

    /// NaN or infinite numeric argument.
    #[error("non-finite command argument")]
    NotFinite,
}
