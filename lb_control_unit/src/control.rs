//! Control law primitives for the lift.

pub mod pid;
pub mod ramp;
