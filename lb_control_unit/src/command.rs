//! Cross-task command plumbing: per-mechanism slots and the validated
//! surface the foreground issues requests through.

pub mod slot;
pub mod surface;
