//! Simulated devices.
//!
//! - [`SimLift`]: first-order lift plant. One shared plant is exposed as a
//!   position sensor, a limit switch and a velocity actuator, so each role
//!   can be handed to the lift task as its own clone.
//! - [`SimMotor`]: intake motor that records what it was told.
//! - [`ScriptedHue`]: hue source replaying ring passes by timestamp.
//!
//! All devices integrate against the shared [`Clock`], so with a
//! [`crate::clock::ManualClock`] the simulation is fully deterministic.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::clock::Clock;
use crate::hw::{Actuator, BrakeMode, HueSensor, HwError, LimitSwitch, PositionSensor};

// ─── Lift Plant ─────────────────────────────────────────────────────

/// Lift plant parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftPlantParams {
    /// Position rate per rpm of motor velocity [units/(rpm·s)].
    pub units_per_rpm_s: f64,
    /// Motor velocity lag time constant [s].
    pub lag_s: f64,
    /// Lower hard stop, physical [units].
    pub floor: f64,
    /// Upper hard stop, physical [units].
    pub ceiling: f64,
    /// Limit switch closes at or below this physical height [units].
    pub limit_height: f64,
    /// Physical start position [units].
    pub start: f64,
}

impl Default for LiftPlantParams {
    fn default() -> Self {
        Self {
            units_per_rpm_s: 20.0,
            lag_s: 0.03,
            floor: 0.0,
            ceiling: 7500.0,
            limit_height: 5.0,
            start: 0.0,
        }
    }
}

#[derive(Debug)]
struct LiftPlant {
    params: LiftPlantParams,
    /// Physical height [units].
    physical: f64,
    /// Actual motor velocity [rpm].
    velocity: f64,
    /// Commanded motor velocity [rpm].
    commanded: f64,
    /// Sensor zero, physical [units].
    offset: f64,
    brake: BrakeMode,
    last_ms: u64,
    fail_reads: bool,
}

impl LiftPlant {
    fn advance(&mut self, now_ms: u64) {
        if now_ms <= self.last_ms {
            return;
        }
        let dt = (now_ms - self.last_ms) as f64 / 1000.0;
        self.last_ms = now_ms;

        let p = &self.params;
        self.velocity += (self.commanded - self.velocity) * dt / (p.lag_s + dt);
        self.physical += self.velocity * p.units_per_rpm_s * dt;
        if self.physical <= p.floor {
            self.physical = p.floor;
            self.velocity = self.velocity.max(0.0);
        } else if self.physical >= p.ceiling {
            self.physical = p.ceiling;
            self.velocity = self.velocity.min(0.0);
        }
    }
}

/// Shared handle to a simulated lift.
#[derive(Clone)]
pub struct SimLift {
    plant: Arc<Mutex<LiftPlant>>,
    clock: Arc<dyn Clock>,
}

impl SimLift {
    pub fn new(params: LiftPlantParams, clock: Arc<dyn Clock>) -> Self {
        let last_ms = clock.now_ms();
        Self {
            plant: Arc::new(Mutex::new(LiftPlant {
                params,
                physical: params.start,
                velocity: 0.0,
                commanded: 0.0,
                offset: 0.0,
                brake: BrakeMode::Coast,
                last_ms,
                fail_reads: false,
            })),
            clock,
        }
    }

    /// Physical height after integrating up to now [units].
    pub fn physical_position(&self) -> f64 {
        let mut plant = self.plant.lock();
        plant.advance(self.clock.now_ms());
        plant.physical
    }

    /// Last commanded velocity [rpm].
    pub fn commanded_velocity(&self) -> f64 {
        self.plant.lock().commanded
    }

    pub fn brake_mode(&self) -> BrakeMode {
        self.plant.lock().brake
    }

    /// Make position reads fail until cleared.
    pub fn set_read_failure(&self, fail: bool) {
        self.plant.lock().fail_reads = fail;
    }
}

impl PositionSensor for SimLift {
    fn position(&mut self) -> Result<f64, HwError> {
        let mut plant = self.plant.lock();
        if plant.fail_reads {
            return Err(HwError::Disconnected { port: 1 });
        }
        plant.advance(self.clock.now_ms());
        Ok(plant.physical - plant.offset)
    }

    fn reset_position(&mut self) -> Result<(), HwError> {
        let mut plant = self.plant.lock();
        plant.advance(self.clock.now_ms());
        plant.offset = plant.physical;
        trace!(physical = plant.physical, "Sim lift sensor zeroed");
        Ok(())
    }
}

impl LimitSwitch for SimLift {
    fn is_pressed(&mut self) -> Result<bool, HwError> {
        let mut plant = self.plant.lock();
        plant.advance(self.clock.now_ms());
        Ok(plant.physical <= plant.params.limit_height)
    }
}

impl Actuator for SimLift {
    fn move_velocity(&mut self, rpm: f64) -> Result<(), HwError> {
        let mut plant = self.plant.lock();
        plant.advance(self.clock.now_ms());
        plant.commanded = rpm;
        Ok(())
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), HwError> {
        self.plant.lock().brake = mode;
        Ok(())
    }
}

// ─── Recording Motor ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MotorLog {
    velocity: f64,
    brake: BrakeMode,
    /// `(time, velocity)` for every change of commanded velocity, starting
    /// from rest.
    changes: Vec<(u64, f64)>,
}

/// Motor that records velocity changes with their timestamps.
#[derive(Clone)]
pub struct SimMotor {
    log: Arc<Mutex<MotorLog>>,
    clock: Arc<dyn Clock>,
}

impl SimMotor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            log: Arc::new(Mutex::new(MotorLog::default())),
            clock,
        }
    }

    pub fn velocity(&self) -> f64 {
        self.log.lock().velocity
    }

    pub fn brake_mode(&self) -> BrakeMode {
        self.log.lock().brake
    }

    /// Every velocity change so far.
    pub fn changes(&self) -> Vec<(u64, f64)> {
        self.log.lock().changes.clone()
    }
}

impl Actuator for SimMotor {
    fn move_velocity(&mut self, rpm: f64) -> Result<(), HwError> {
        let mut log = self.log.lock();
        if log.velocity != rpm {
            log.changes.push((self.clock.now_ms(), rpm));
        }
        log.velocity = rpm;
        Ok(())
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), HwError> {
        self.log.lock().brake = mode;
        Ok(())
    }
}

// ─── Scripted Hue ───────────────────────────────────────────────────

/// One ring passing the sensor over `[start_ms, end_ms)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPass {
    pub start_ms: u64,
    pub end_ms: u64,
    pub hue: f64,
}

/// Hue source replaying a fixed list of ring passes.
#[derive(Clone)]
pub struct ScriptedHue {
    passes: Arc<Vec<RingPass>>,
    clock: Arc<dyn Clock>,
}

impl ScriptedHue {
    pub fn new(passes: Vec<RingPass>, clock: Arc<dyn Clock>) -> Self {
        Self {
            passes: Arc::new(passes),
            clock,
        }
    }

    /// Rings of alternating `hues`, one every `spacing_ms` from `first_ms`,
    /// each in view for `pass_ms`.
    pub fn alternating(
        hues: &[f64],
        first_ms: u64,
        spacing_ms: u64,
        pass_ms: u64,
        count: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let passes = (0..count)
            .filter_map(|i| {
                let hue = *hues.get(i % hues.len().max(1))?;
                let start_ms = first_ms + i as u64 * spacing_ms;
                Some(RingPass {
                    start_ms,
                    end_ms: start_ms + pass_ms,
                    hue,
                })
            })
            .collect();
        Self::new(passes, clock)
    }
}

impl HueSensor for ScriptedHue {
    fn hue(&mut self) -> Result<Option<f64>, HwError> {
        let now = self.clock.now_ms();
        Ok(self
            .passes
            .iter()
            .find(|p| p.start_ms <= now && now < p.end_ms)
            .map(|p| p.hue))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
