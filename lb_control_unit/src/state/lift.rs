//! Lift position state machine.
//!
//! Pure tick: a sensor snapshot and the latest command go in, a velocity
//! command comes out. All hardware I/O stays in the owning task
//! ([`crate::session::LiftTask`]); this module never blocks and never fails.
//!
//! ```text
//!            Move(L)                     |error| < tol
//!   ┌──────────────────► Automatic(L) ─────────────────► Settling(L)
//!   │                        ▲  │                            │
//!   │              Move(L')  │  │ Manual(v)                  │ Manual(v)
//!   │                        │  ▼                            ▼
//!   └─────────────────────── Manual ◄────────────────────────┘
//! ```
//!
//! Within one tick: sensor read → zero event → command swap → idle settle
//! on a zero event → control law.

use lb_common::control_unit::command::{LiftCommand, Stamped};
use lb_common::control_unit::config::{LiftConfig, PositionTable};
use lb_common::control_unit::error::SensorFault;
use lb_common::control_unit::state::{LiftMode, LiftStatus, LiftTarget};
use tracing::{debug, info};

use crate::control::pid::{PidGains, PidState, pid_velocity};
use crate::control::ramp::DecayRamp;
use crate::state::fallback::FallbackTable;

/// Tagged lift state. Illegal combinations (e.g. a target while manual) are
/// not representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiftPhase {
    /// Operator override.
    Manual {
        /// Velocity requested by the last manual command [rpm].
        requested: f64,
        /// Issue time of the last manual command [ms].
        refreshed_at_ms: u64,
    },
    /// Closed-loop pursuit of `target`.
    Automatic { target: LiftTarget },
    /// Within tolerance of `target`, commanding zero.
    Settling { target: LiftTarget },
}

impl LiftPhase {
    pub const fn mode(&self) -> LiftMode {
        match self {
            Self::Manual { .. } => LiftMode::Manual,
            Self::Automatic { .. } => LiftMode::Automatic,
            Self::Settling { .. } => LiftMode::Settling,
        }
    }
}

/// Sensor and command snapshot for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiftInput {
    /// Clock time of this tick [ms].
    pub now_ms: u64,
    /// Position reading; `None` if the read failed.
    pub position: Option<f64>,
    /// Limit switch state; `None` if the read failed.
    pub limit_pressed: Option<bool>,
    /// Command swapped out of the slot this tick, if any.
    pub command: Option<Stamped<LiftCommand>>,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiftOutput {
    /// Velocity to command [rpm].
    pub velocity: f64,
    /// The sensor must be re-zeroed before the next read.
    pub reset_sensor: bool,
    /// Faults observed this tick.
    pub faults: SensorFault,
}

/// Lift controller owned by exactly one task.
#[derive(Debug, Clone)]
pub struct LiftStateMachine {
    phase: LiftPhase,
    /// Last accepted position [sensor units].
    position: f64,
    /// Last commanded velocity [rpm].
    velocity: f64,
    /// Last target pursued; reported while manual.
    last_target: LiftTarget,
    out_of_bounds: bool,
    faults: SensorFault,
    tick: u64,

    positions: PositionTable,
    tolerance: f64,
    max_manual_velocity: f64,
    manual_ttl_ms: u64,
    travel: (f64, f64),
    zero_threshold: Option<f64>,
    fallback: FallbackTable,
    ramp: DecayRamp,
    gains: PidGains,
    pid: PidState,
    dt: f64,
}

impl LiftStateMachine {
    /// Create in `Automatic(Idle)` at position zero.
    pub fn new(cfg: &LiftConfig, period_ms: u64) -> Self {
        Self {
            phase: LiftPhase::Automatic {
                target: LiftTarget::Idle,
            },
            position: 0.0,
            velocity: 0.0,
            last_target: LiftTarget::Idle,
            out_of_bounds: false,
            faults: SensorFault::empty(),
            tick: 0,
            positions: cfg.positions,
            tolerance: cfg.settle_tolerance,
            max_manual_velocity: cfg.max_manual_velocity,
            manual_ttl_ms: cfg.manual_ttl_ms,
            travel: (cfg.travel_min, cfg.travel_max),
            zero_threshold: cfg.zero_threshold,
            fallback: FallbackTable::new(
                &cfg.positions,
                cfg.settle_tolerance,
                cfg.out_of_bounds_policy,
            ),
            ramp: DecayRamp::new(cfg.decay_step, cfg.min_velocity),
            gains: PidGains::from_config(&cfg.pid, cfg.max_velocity),
            pid: PidState::default(),
            dt: period_ms as f64 / 1000.0,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub const fn phase(&self) -> LiftPhase {
        self.phase
    }

    #[inline]
    pub const fn mode(&self) -> LiftMode {
        self.phase.mode()
    }

    #[inline]
    pub const fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub const fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    pub const fn is_out_of_bounds(&self) -> bool {
        self.out_of_bounds
    }

    /// Target being pursued, or the last one pursued while manual.
    pub const fn target(&self) -> LiftTarget {
        match self.phase {
            LiftPhase::Automatic { target } | LiftPhase::Settling { target } => target,
            LiftPhase::Manual { .. } => self.last_target,
        }
    }

    /// Snapshot for the status board.
    pub fn status(&self) -> LiftStatus {
        LiftStatus {
            mode: self.mode(),
            position: self.position,
            target: self.target(),
            velocity: self.velocity,
            out_of_bounds: self.out_of_bounds,
            faults: self.faults,
            tick: self.tick,
        }
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Run one control period.
    pub fn tick(&mut self, input: &LiftInput) -> LiftOutput {
        self.tick += 1;
        let mut faults = SensorFault::empty();

        // ── Sensor read ─────────────────────────────────────────
        let fresh = match input.position {
            Some(p) if p.is_finite() && p >= self.travel.0 && p <= self.travel.1 => {
                self.position = p;
                true
            }
            Some(_) => {
                faults |= SensorFault::POSITION_IMPLAUSIBLE;
                false
            }
            None => {
                faults |= SensorFault::POSITION_READ_FAILED;
                false
            }
        };
        let limit = input.limit_pressed.unwrap_or_else(|| {
            faults |= SensorFault::LIMIT_READ_FAILED;
            false
        });

        // ── Zero event ──────────────────────────────────────────
        // Precedes the command swap: a move issued on this tick sees the
        // cleared flag.
        let proxy = fresh && self.zero_threshold.is_some_and(|z| self.position <= z);
        let zero_event = limit || proxy;
        if zero_event && self.out_of_bounds {
            debug!(limit, proxy, "Zero event clears out-of-bounds");
            self.out_of_bounds = false;
        }

        // ── Command swap ────────────────────────────────────────
        if let Some(cmd) = input.command {
            self.apply(&cmd);
        }

        let mut reset_sensor = false;
        if zero_event
            && matches!(
                self.phase,
                LiftPhase::Automatic {
                    target: LiftTarget::Idle
                }
            )
        {
            reset_sensor = self.settle(LiftTarget::Idle);
        }

        // ── Control law ─────────────────────────────────────────
        let velocity = match self.phase {
            LiftPhase::Manual {
                requested,
                refreshed_at_ms,
            } => {
                let age = input.now_ms.saturating_sub(refreshed_at_ms);
                if requested != 0.0 && age <= self.manual_ttl_ms {
                    // On the switch the reading is what drifted, not the lift.
                    if fresh
                        && !zero_event
                        && (self.position - self.positions.idle).abs() > self.tolerance
                    {
                        self.out_of_bounds = true;
                    }
                    requested
                } else {
                    self.ramp.step(self.velocity)
                }
            }
            LiftPhase::Automatic { target } if fresh => {
                let error = self.positions.position(target) - self.position;
                if error.abs() < self.tolerance {
                    reset_sensor |= self.settle(target);
                    0.0
                } else {
                    pid_velocity(&mut self.pid, &self.gains, error, self.dt)
                }
            }
            // No trustworthy reading: ramp down, keep the phase.
            LiftPhase::Automatic { .. } => self.ramp.step(self.velocity),
            LiftPhase::Settling { .. } => 0.0,
        };

        self.velocity = velocity;
        self.faults = faults;
        LiftOutput {
            velocity,
            reset_sensor,
            faults,
        }
    }

    /// Apply a command swapped in at the start of the tick.
    fn apply(&mut self, cmd: &Stamped<LiftCommand>) {
        match cmd.command {
            LiftCommand::Move(requested) => self.request_move(requested),
            LiftCommand::Manual { velocity } => {
                let requested = if velocity.is_finite() {
                    velocity.clamp(-self.max_manual_velocity, self.max_manual_velocity)
                } else {
                    0.0
                };
                if !matches!(self.phase, LiftPhase::Manual { .. }) {
                    debug!(from = ?self.mode(), velocity = requested, "Manual override");
                    self.last_target = self.target();
                    self.pid.reset();
                }
                self.phase = LiftPhase::Manual {
                    requested,
                    refreshed_at_ms: cmd.issued_at_ms,
                };
            }
        }
    }

    fn request_move(&mut self, requested: LiftTarget) {
        let target = if self.out_of_bounds {
            let safe = self.fallback.resolve(self.position);
            if safe != requested {
                info!(
                    %requested,
                    fallback = %safe,
                    position = self.position,
                    policy = ?self.fallback.policy(),
                    "Out of bounds, redirecting move"
                );
            }
            safe
        } else {
            requested
        };

        match self.phase {
            // Same target already in flight: keep the trajectory.
            LiftPhase::Automatic { target: t } if t == target => return,
            // Already settled there and still within tolerance.
            LiftPhase::Settling { target: t }
                if t == target
                    && (self.positions.position(t) - self.position).abs() < self.tolerance =>
            {
                return;
            }
            _ => {}
        }

        debug!(from = ?self.mode(), %target, "Automatic move");
        self.phase = LiftPhase::Automatic { target };
        self.last_target = target;
        self.pid.reset();
    }

    /// Enter `Settling(target)`. Returns whether the sensor must be re-zeroed.
    fn settle(&mut self, target: LiftTarget) -> bool {
        debug!(%target, position = self.position, tick = self.tick, "Settled");
        self.phase = LiftPhase::Settling { target };
        self.last_target = target;
        self.out_of_bounds = false;
        self.pid.reset();
        if target == LiftTarget::Idle {
            self.position = 0.0;
            true
        } else {
            false
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
