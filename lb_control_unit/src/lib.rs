//! # Lift/Intake Control Unit Library
//!
//! Periodic control of a competition robot's ring lift and intake. Two
//! background tasks own the actuators and run pure per-tick state machines;
//! a foreground source (operator bindings or a timed routine) issues
//! commands through a cloneable [`command::surface::CommandSurface`].
//!
//! ## Tasks
//!
//! 1. **Lift** - closed-loop moves to named targets, manual override with
//!    staleness decay, out-of-bounds fallback and sensor re-zeroing
//! 2. **Intake** - bounded runs with ring color sorting (detect, travel,
//!    eject, cooldown)
//! 3. **Foreground** - operator bindings or a timed routine
//!
//! ## Tick Order (lift)
//!
//! sensor read → zero event → latest command swap-out → control law →
//! actuator write → status publish. Background tasks never block on the
//! foreground: commands cross over through single-slot mailboxes and status
//! flows back through a snapshot board.

pub mod clock;
pub mod command;
pub mod config;
pub mod control;
pub mod cycle;
pub mod foreground;
pub mod hw;
pub mod session;
pub mod sim;
pub mod state;
pub mod status;
