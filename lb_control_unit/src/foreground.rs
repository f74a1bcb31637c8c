//! Foreground command sources.
//!
//! The foreground loop runs at the foreground period and only ever talks to
//! the background tasks through a [`CommandSurface`]. Sources:
//!
//! - [`routine::Routine`]: timed command script loaded from TOML.
//! - [`operator::OperatorBindings`]: controller frame → command mapping.
//! - [`Idle`]: issues nothing.

pub mod operator;
pub mod routine;

use crate::command::surface::CommandSurface;

/// Whether the foreground wants the period to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundStep {
    Continue,
    /// Nothing left to issue; the session may end.
    Finished,
}

/// One foreground source.
pub trait Foreground {
    /// Called once per foreground period. `now_ms` counts from session start.
    fn step(&mut self, now_ms: u64, surface: &CommandSurface) -> ForegroundStep;
}

/// Foreground that never issues a command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Foreground for Idle {
    fn step(&mut self, _now_ms: u64, _surface: &CommandSurface) -> ForegroundStep {
        ForegroundStep::Continue
    }
}
