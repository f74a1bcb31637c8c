//! Control unit shared types.
//!
//! Everything the control unit exchanges with its callers lives here,
//! organized by domain: state enums and status snapshots, error types,
//! command snapshots, hue bands and configuration structures.

pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod state;
