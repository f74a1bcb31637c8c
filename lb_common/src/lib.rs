//! Lift/intake control unit common library
//!
//! Shared constants, configuration structures and cross-task types for the
//! lift position controller and the ring-eject intake controller.
//!
//! # Module Structure
//!
//! - [`consts`] - Default periods, parameter bounds and paths
//! - [`config`] - Configuration loading traits and shared fields
//! - [`control_unit`] - Commands, state enums, status snapshots, errors
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use lb_common::prelude::*;
//!
//! let table = PositionTable::default();
//! assert!(table.position(LiftTarget::Intake) > table.position(LiftTarget::Idle));
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod prelude;
