//! Ring-eject sub-machine.
//!
//! Normal → Candidate on a rejected-color detection, Candidate → Ejecting
//! once the ring has had `travel_delay_ms` to reach the eject point, and
//! Ejecting → Normal after `eject_duration_ms`. Phase timeouts are evaluated
//! before the velocity is chosen, so the intake is stopped for exactly
//! `[t0 + travel, t0 + travel + eject)` relative to the detection tick `t0`.
//!
//! Only one ring in flight is tracked: detections outside `Normal`, or
//! before `cooldown_until`, are ignored.

use lb_common::consts::HUE_DEGREES;
use lb_common::control_unit::color::HueBand;
use lb_common::control_unit::config::ColorSortConfig;
use lb_common::control_unit::error::SensorFault;
use lb_common::control_unit::state::EjectPhase;
use tracing::debug;

/// Velocity and faults from one eject tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EjectOutput {
    pub velocity: f64,
    pub faults: SensorFault,
}

#[derive(Debug, Clone)]
pub struct EjectMachine {
    phase: EjectPhase,
    phase_start_ms: u64,
    cooldown_until_ms: u64,
    /// `None` when color sorting is disabled.
    rejected: Option<HueBand>,
    travel_delay_ms: u64,
    eject_duration_ms: u64,
    cooldown_ms: u64,
    ejected: u32,
}

impl EjectMachine {
    pub fn new(cfg: &ColorSortConfig) -> Self {
        Self {
            phase: EjectPhase::Normal,
            phase_start_ms: 0,
            cooldown_until_ms: 0,
            rejected: cfg.enabled.then(|| cfg.rejected_band()),
            travel_delay_ms: cfg.travel_delay_ms,
            eject_duration_ms: cfg.eject_duration_ms,
            cooldown_ms: cfg.cooldown_ms,
            ejected: 0,
        }
    }

    #[inline]
    pub const fn phase(&self) -> EjectPhase {
        self.phase
    }

    /// Rings ejected so far.
    #[inline]
    pub const fn ejected(&self) -> u32 {
        self.ejected
    }

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.rejected.is_some()
    }

    /// Back to `Normal` with no cooldown pending.
    pub fn reset(&mut self) {
        self.phase = EjectPhase::Normal;
        self.phase_start_ms = 0;
        self.cooldown_until_ms = 0;
    }

    /// One tick while an intake run is active at `speed`.
    pub fn tick(&mut self, hue: Option<f64>, now_ms: u64, speed: f64) -> EjectOutput {
        let Some(band) = self.rejected else {
            return EjectOutput {
                velocity: speed,
                faults: SensorFault::empty(),
            };
        };

        let elapsed = now_ms.saturating_sub(self.phase_start_ms);
        match self.phase {
            EjectPhase::Candidate if elapsed >= self.travel_delay_ms => {
                self.enter(EjectPhase::Ejecting, now_ms);
            }
            EjectPhase::Ejecting if elapsed >= self.eject_duration_ms => {
                self.ejected += 1;
                self.enter(EjectPhase::Normal, now_ms);
            }
            _ => {}
        }

        let mut faults = SensorFault::empty();
        let observed = match hue {
            Some(h) if h.is_finite() && (0.0..HUE_DEGREES).contains(&h) => Some(h),
            Some(_) => {
                faults |= SensorFault::HUE_IMPLAUSIBLE;
                None
            }
            None => {
                faults |= SensorFault::HUE_NO_READ;
                None
            }
        };

        if self.phase == EjectPhase::Normal
            && now_ms >= self.cooldown_until_ms
            && observed.is_some_and(|h| band.contains(h))
        {
            self.cooldown_until_ms = now_ms + self.cooldown_ms;
            self.enter(EjectPhase::Candidate, now_ms);
        }

        let velocity = if self.phase == EjectPhase::Ejecting {
            0.0
        } else {
            speed
        };
        EjectOutput { velocity, faults }
    }

    fn enter(&mut self, phase: EjectPhase, now_ms: u64) {
        debug!(from = ?self.phase, to = ?phase, now_ms, "Eject phase");
        self.phase = phase;
        self.phase_start_ms = now_ms;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
