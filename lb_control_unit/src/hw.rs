//! Hardware seams.
//!
//! Thin read/write traits over the motor and sensor drivers. The background
//! tasks own their devices exclusively and only touch them at the edges of a
//! tick: reads before the state machine runs, the actuator write after.
//!
//! Simulated implementations live in [`crate::sim`].

use thiserror::Error;

/// Error types for device I/O.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HwError {
    /// Device not answering on its port.
    #[error("device on port {port} disconnected")]
    Disconnected { port: u8 },

    /// Any other driver-level failure.
    #[error("device I/O error: {0}")]
    Io(String),
}

/// Motor behaviour at zero commanded velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrakeMode {
    /// Free-wheel.
    #[default]
    Coast,
    /// Short the windings.
    Brake,
    /// Actively hold position.
    Hold,
}

/// Absolute position sensor, resettable to zero.
pub trait PositionSensor: Send {
    /// Current reading [sensor units].
    fn position(&mut self) -> Result<f64, HwError>;

    /// Make the current physical position read as zero.
    fn reset_position(&mut self) -> Result<(), HwError>;
}

/// Binary zero/limit signal.
pub trait LimitSwitch: Send {
    fn is_pressed(&mut self) -> Result<bool, HwError>;
}

/// Optical hue sensor.
pub trait HueSensor: Send {
    /// Hue in `[0, 360)`, or `None` when no object is in front of the sensor.
    fn hue(&mut self) -> Result<Option<f64>, HwError>;
}

/// Velocity-controlled motor (or motor group).
pub trait Actuator: Send {
    /// Command a velocity [rpm].
    fn move_velocity(&mut self, rpm: f64) -> Result<(), HwError>;

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), HwError>;
}

impl<T: PositionSensor + ?Sized> PositionSensor for Box<T> {
    fn position(&mut self) -> Result<f64, HwError> {
        (**self).position()
    }

    fn reset_position(&mut self) -> Result<(), HwError> {
        (**self).reset_position()
    }
}

impl<T: LimitSwitch + ?Sized> LimitSwitch for Box<T> {
    fn is_pressed(&mut self) -> Result<bool, HwError> {
        (**self).is_pressed()
    }
}

impl<T: HueSensor + ?Sized> HueSensor for Box<T> {
    fn hue(&mut self) -> Result<Option<f64>, HwError> {
        (**self).hue()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn move_velocity(&mut self, rpm: f64) -> Result<(), HwError> {
        (**self).move_velocity(rpm)
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), HwError> {
        (**self).set_brake_mode(mode)
    }
}
