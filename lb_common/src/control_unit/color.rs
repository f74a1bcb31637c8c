//! Hue bands for the ring color sensor.
//!
//! Hue is an angle on the color wheel, `[0, 360)`. Red sits across the wrap
//! point, so a band with `min > max` is read as wrapping through zero
//! (e.g. `340..20`).

use serde::{Deserialize, Serialize};

use crate::consts::HUE_DEGREES;

/// Closed hue interval, possibly wrapping through 0°.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueBand {
    /// Lower edge [deg].
    pub min: f64,
    /// Upper edge [deg]. Less than `min` means the band wraps.
    pub max: f64,
}

impl HueBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether the band wraps through 0°.
    #[inline]
    pub fn wraps(&self) -> bool {
        self.min > self.max
    }

    /// Whether `hue` falls in the band. Non-finite hues never match.
    #[inline]
    pub fn contains(&self, hue: f64) -> bool {
        if !hue.is_finite() {
            return false;
        }
        if self.wraps() {
            hue >= self.min || hue <= self.max
        } else {
            hue >= self.min && hue <= self.max
        }
    }

    /// Split into at most two non-wrapping intervals.
    fn segments(&self) -> [(f64, f64); 2] {
        if self.wraps() {
            [(self.min, HUE_DEGREES), (0.0, self.max)]
        } else {
            [(self.min, self.max), (self.min, self.max)]
        }
    }

    /// Whether two bands share any hue.
    pub fn overlaps(&self, other: &HueBand) -> bool {
        self.segments().iter().any(|&(a_lo, a_hi)| {
            other
                .segments()
                .iter()
                .any(|&(b_lo, b_hi)| a_lo <= b_hi && b_lo <= a_hi)
        })
    }

    /// Validate edges lie on the hue wheel.
    pub fn validate(&self, name: &str) -> Result<(), String> {
        for (edge, v) in [("min", self.min), ("max", self.max)] {
            if !v.is_finite() || !(0.0..HUE_DEGREES).contains(&v) {
                return Err(format!("{name}.{edge} {v} out of range [0, {HUE_DEGREES})"));
            }
        }
        Ok(())
    }
}
