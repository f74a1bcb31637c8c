//! Bounded-slew decay toward zero velocity.
//!
//! Used when manual override is released: the lift never steps straight to
//! zero, it ramps down by at most `max_step` per tick and snaps to zero once
//! the magnitude is below `min_velocity`. Config validation keeps
//! `min_velocity <= max_step`, so the snap is itself a bounded step.

/// Slew parameters for the decay ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRamp {
    /// Largest velocity change per tick [rpm].
    pub max_step: f64,
    /// Magnitude below which the ramp snaps to zero [rpm].
    pub min_velocity: f64,
}

impl DecayRamp {
    pub const fn new(max_step: f64, min_velocity: f64) -> Self {
        Self {
            max_step,
            min_velocity,
        }
    }

    /// One decay step.
    ///
    /// Invariants: `|next| <= |current|`, `|current| - |next| <= max_step`,
    /// and `next` never changes sign.
    #[inline]
    pub fn step(&self, current: f64) -> f64 {
        if !current.is_finite() || current.abs() < self.min_velocity {
            return 0.0;
        }
        clamp_toward(0.0, current, self.max_step)
    }

    /// Ticks needed to reach zero from `current`.
    #[cfg(test)]
    fn ticks_to_zero(&self, mut current: f64) -> u32 {
        let mut n = 0;
        while current != 0.0 {
            current = self.step(current);
            n += 1;
        }
        n
    }
}

/// Move `current` toward `target` by at most `max_step`.
#[inline]
pub fn clamp_toward(target: f64, current: f64, max_step: f64) -> f64 {
    let delta = (target - current).clamp(-max_step, max_step);
    current + delta
}
