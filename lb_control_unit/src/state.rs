//! State machine module root.
//!
//! Each mechanism has one explicit tagged state owned by exactly one
//! background task. All tick functions are pure: snapshot in, command out.

pub mod eject;
pub mod fallback;
pub mod intake;
pub mod lift;
