//! Lift position PID with backward Euler integration, derivative filter (Tf),
//! and anti-windup via back-calculation (Tt).
//!
//! Input is position error in sensor units, output is a velocity command in
//! rpm. Zero Ki disables integral; zero Kd disables derivative.

use lb_common::control_unit::config::PidConfig;

/// Internal state of the PID controller.
///
/// Must be reset whenever a new automatic move starts or manual override
/// takes over, so no integral or derivative history leaks between moves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Integral accumulator.
    integral: f64,
    /// Previous position error (for derivative).
    prev_error: f64,
    /// Whether `prev_error` holds a real sample.
    primed: bool,
    /// Filtered derivative term (low-pass via Tf).
    derivative_filtered: f64,
    /// Previous raw (unsaturated) output, for anti-windup.
    prev_raw_output: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current integral accumulator.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

/// PID gains plus output limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Derivative filter time constant [s].
    pub tf: f64,
    /// Anti-windup tracking time constant [s].
    pub tt: f64,
    /// Output saturation limit [rpm].
    pub out_max: f64,
}

impl PidGains {
    pub fn from_config(cfg: &PidConfig, out_max: f64) -> Self {
        Self {
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
            tf: cfg.tf,
            tt: cfg.tt,
            out_max,
        }
    }
}

/// Compute one raw (unsaturated) PID step.
///
/// The first call after a reset has no derivative history, so its D term
/// is zero rather than a spike from the initial error step.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 || !error.is_finite() {
        return 0.0;
    }

    // ── P term ──────────────────────────────────────────────
    let p_term = gains.kp * error;

    // ── I term (backward Euler) ─────────────────────────────
    let i_term = if gains.ki != 0.0 {
        // Back-calculation: feed the saturation excess back into the integral.
        let anti_windup = if gains.tt > 0.0 && gains.out_max > 0.0 {
            let saturated = state.prev_raw_output.clamp(-gains.out_max, gains.out_max);
            (saturated - state.prev_raw_output) / gains.tt
        } else {
            0.0
        };

        state.integral += (gains.ki * error + anti_windup) * dt;
        state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    // ── D term (with first-order filter) ────────────────────
    let d_term = if gains.kd != 0.0 && state.primed {
        let raw_derivative = (error - state.prev_error) / dt;

        if gains.tf > 0.0 {
            let alpha = dt / (gains.tf + dt);
            state.derivative_filtered += alpha * (raw_derivative - state.derivative_filtered);
            gains.kd * state.derivative_filtered
        } else {
            gains.kd * raw_derivative
        }
    } else {
        state.derivative_filtered = 0.0;
        0.0
    };

    state.prev_error = error;
    state.primed = true;

    let raw_output = p_term + i_term + d_term;
    state.prev_raw_output = raw_output;

    raw_output
}

/// PID step clamped to `±out_max`. This is the velocity the lift commands.
#[inline]
pub fn pid_velocity(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    pid_compute(state, gains, error, dt).clamp(-gains.out_max, gains.out_max)
}

// ─── Tests ──────────────────────────────────────────────────────────
