//! Background tasks and the enabled-period session.
//!
//! Each background task owns one state machine and its devices. Per tick:
//! read sensors → take the latest command → pure tick → write actuator →
//! publish status. Device errors become fault flags for that tick and are
//! logged on the rising and falling edge only.
//!
//! [`Session`] spawns both tasks on their own threads, runs the foreground
//! on the calling thread, and on end of period clears the shared `running`
//! flag and joins everything. Every task zeroes its actuator on the way out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use lb_common::config::ConfigError;
use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::error::SensorFault;
use lb_common::control_unit::state::{EjectPhase, LiftMode};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::command::surface::{Channels, CommandLimits, CommandSurface};
use crate::cycle::{CycleStats, run_periodic};
use crate::foreground::{Foreground, ForegroundStep};
use crate::hw::{Actuator, BrakeMode, HueSensor, LimitSwitch, PositionSensor};
use crate::state::intake::{IntakeInput, IntakeOutput, IntakeStateMachine};
use crate::state::lift::{LiftInput, LiftOutput, LiftStateMachine};
use crate::status::SystemStatus;

/// Session-level failures. Nothing inside a tick produces one.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn {task} task: {source}")]
    Spawn {
        task: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} task panicked")]
    TaskPanicked(&'static str),

    #[error("failed to install signal handler: {0}")]
    Signal(String),
}

// ─── Fault Edge Logging ─────────────────────────────────────────────

/// Logs fault flags when they appear and when they clear.
#[derive(Debug, Clone)]
pub struct FaultLog {
    task: &'static str,
    active: SensorFault,
}

impl FaultLog {
    pub const fn new(task: &'static str) -> Self {
        Self {
            task,
            active: SensorFault::empty(),
        }
    }

    /// Record this tick's faults; returns the newly raised ones.
    pub fn update(&mut self, faults: SensorFault) -> SensorFault {
        let raised = faults - self.active;
        let cleared = self.active - faults;

        if raised.has_warning() {
            warn!(task = self.task, faults = ?raised, "Sensor fault raised");
        } else if !raised.is_empty() {
            debug!(task = self.task, faults = ?raised, "Sensor condition raised");
        }
        if !cleared.is_empty() {
            if cleared.has_warning() {
                info!(task = self.task, faults = ?cleared, "Sensor fault cleared");
            } else {
                debug!(task = self.task, faults = ?cleared, "Sensor condition cleared");
            }
        }

        self.active = faults;
        raised
    }

    #[inline]
    pub const fn active(&self) -> SensorFault {
        self.active
    }
}

// ─── Lift Task ──────────────────────────────────────────────────────

/// Lift background task: owns the lift state machine and its devices.
pub struct LiftTask<S, L, A> {
    machine: LiftStateMachine,
    sensor: S,
    limit: L,
    motor: A,
    channels: Arc<Channels>,
    clock: Arc<dyn Clock>,
    faults: FaultLog,
    mode: LiftMode,
}

impl<S, L, A> LiftTask<S, L, A>
where
    S: PositionSensor,
    L: LimitSwitch,
    A: Actuator,
{
    pub fn new(
        cfg: &ControlUnitConfig,
        sensor: S,
        limit: L,
        motor: A,
        channels: Arc<Channels>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let machine = LiftStateMachine::new(&cfg.lift, cfg.cycle.background_period_ms);
        let mode = machine.mode();
        Self {
            machine,
            sensor,
            limit,
            motor,
            channels,
            clock,
            faults: FaultLog::new("lift"),
            mode,
        }
    }

    #[inline]
    pub fn machine(&self) -> &LiftStateMachine {
        &self.machine
    }

    /// Put the motor in hold before the first tick.
    pub fn start(&mut self) {
        if let Err(e) = self.motor.set_brake_mode(BrakeMode::Hold) {
            warn!(error = %e, "Lift brake mode not set");
        }
        self.channels.status.publish_lift(self.machine.status());
    }

    /// One tick.
    pub fn tick(&mut self) -> LiftOutput {
        let now_ms = self.clock.now_ms();

        let position = self
            .sensor
            .position()
            .map_err(|e| trace!(error = %e, "Lift position read failed"))
            .ok();
        let limit_pressed = self
            .limit
            .is_pressed()
            .map_err(|e| trace!(error = %e, "Limit switch read failed"))
            .ok();
        let command = self.channels.lift.take();

        let mut out = self.machine.tick(&LiftInput {
            now_ms,
            position,
            limit_pressed,
            command,
        });

        if out.reset_sensor {
            match self.sensor.reset_position() {
                Ok(()) => debug!(now_ms, "Lift sensor re-zeroed"),
                Err(e) => warn!(error = %e, "Lift sensor re-zero failed"),
            }
        }
        if let Err(e) = self.motor.move_velocity(out.velocity) {
            trace!(error = %e, "Lift motor write failed");
            out.faults |= SensorFault::ACTUATOR_WRITE_FAILED;
        }

        self.faults.update(out.faults);
        let mut status = self.machine.status();
        status.faults = out.faults;
        if status.mode != self.mode {
            info!(
                from = ?self.mode,
                to = ?status.mode,
                target = %status.target,
                position = status.position,
                "Lift mode"
            );
            self.mode = status.mode;
        }
        self.channels.status.publish_lift(status);
        out
    }

    /// Command zero velocity. Called once the loop has exited.
    pub fn stop(&mut self) {
        if let Err(e) = self.motor.move_velocity(0.0) {
            warn!(error = %e, "Lift motor not zeroed on stop");
        }
        let mut status = self.machine.status();
        status.velocity = 0.0;
        self.channels.status.publish_lift(status);
    }

    /// Run until `running` is cleared.
    pub fn run(mut self, period: Duration, running: &AtomicBool) -> CycleStats {
        self.start();
        let stats = run_periodic("lift", period, running, || {
            self.tick();
        });
        self.stop();
        stats
    }
}

// ─── Intake Task ────────────────────────────────────────────────────

/// Intake background task: owns the intake/eject machine and its devices.
pub struct IntakeTask<H, A> {
    machine: IntakeStateMachine,
    hue: H,
    motor: A,
    channels: Arc<Channels>,
    clock: Arc<dyn Clock>,
    faults: FaultLog,
    phase: EjectPhase,
    running: bool,
}

impl<H, A> IntakeTask<H, A>
where
    H: HueSensor,
    A: Actuator,
{
    pub fn new(
        cfg: &ControlUnitConfig,
        hue: H,
        motor: A,
        channels: Arc<Channels>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            machine: IntakeStateMachine::new(&cfg.intake),
            hue,
            motor,
            channels,
            clock,
            faults: FaultLog::new("intake"),
            phase: EjectPhase::Normal,
            running: false,
        }
    }

    #[inline]
    pub fn machine(&self) -> &IntakeStateMachine {
        &self.machine
    }

    pub fn start(&mut self) {
        if let Err(e) = self.motor.set_brake_mode(BrakeMode::Coast) {
            warn!(error = %e, "Intake brake mode not set");
        }
        self.channels.status.publish_intake(self.machine.status());
    }

    pub fn tick(&mut self) -> IntakeOutput {
        let now_ms = self.clock.now_ms();

        let (hue, read_failed) = match self.hue.hue() {
            Ok(h) => (h, false),
            Err(e) => {
                trace!(error = %e, "Hue read failed");
                (None, true)
            }
        };
        let command = self.channels.intake.take();

        let mut out = self.machine.tick(&IntakeInput {
            now_ms,
            hue,
            command,
        });
        if read_failed && out.faults.contains(SensorFault::HUE_NO_READ) {
            out.faults.remove(SensorFault::HUE_NO_READ);
            out.faults |= SensorFault::HUE_IMPLAUSIBLE;
        }

        if let Err(e) = self.motor.move_velocity(out.velocity) {
            trace!(error = %e, "Intake motor write failed");
            out.faults |= SensorFault::ACTUATOR_WRITE_FAILED;
        }

        self.faults.update(out.faults);
        let mut status = self.machine.status();
        status.faults = out.faults;
        if status.running != self.running {
            info!(running = status.running, "Intake");
            self.running = status.running;
        }
        if status.phase != self.phase {
            debug!(from = ?self.phase, to = ?status.phase, ejected = status.ejected, "Eject");
            self.phase = status.phase;
        }
        self.channels.status.publish_intake(status);
        out
    }

    pub fn stop(&mut self) {
        if let Err(e) = self.motor.move_velocity(0.0) {
            warn!(error = %e, "Intake motor not zeroed on stop");
        }
        let mut status = self.machine.status();
        status.velocity = 0.0;
        self.channels.status.publish_intake(status);
    }

    pub fn run(mut self, period: Duration, running: &AtomicBool) -> CycleStats {
        self.start();
        let stats = run_periodic("intake", period, running, || {
            self.tick();
        });
        self.stop();
        stats
    }
}

// ─── Session ────────────────────────────────────────────────────────

/// Outcome of one enabled period.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub lift: CycleStats,
    pub intake: CycleStats,
    pub foreground: CycleStats,
    /// Status after both tasks stopped.
    pub final_status: SystemStatus,
}

/// One enabled period: two background tasks plus a foreground source.
pub struct Session {
    config: ControlUnitConfig,
    clock: Arc<dyn Clock>,
    channels: Arc<Channels>,
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: ControlUnitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            channels: Arc::new(Channels::new()),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn config(&self) -> &ControlUnitConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn channels(&self) -> Arc<Channels> {
        Arc::clone(&self.channels)
    }

    /// Global run flag. Clearing it ends the period.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn surface(&self) -> CommandSurface {
        CommandSurface::new(
            Arc::clone(&self.channels),
            Arc::clone(&self.clock),
            CommandLimits::from_config(&self.config),
        )
    }

    /// Run the period to completion.
    ///
    /// Ends when `duration` elapses, the foreground reports
    /// [`ForegroundStep::Finished`], or the run flag is cleared externally.
    pub fn run<S, L, LA, H, IA, F>(
        &self,
        lift: LiftTask<S, L, LA>,
        intake: IntakeTask<H, IA>,
        foreground: &mut F,
        duration: Option<Duration>,
    ) -> Result<SessionReport, SessionError>
    where
        S: PositionSensor + 'static,
        L: LimitSwitch + 'static,
        LA: Actuator + 'static,
        H: HueSensor + 'static,
        IA: Actuator + 'static,
        F: Foreground,
    {
        let bg_period = Duration::from_millis(self.config.cycle.background_period_ms);
        let fg_period = Duration::from_millis(self.config.cycle.foreground_period_ms);
        let telemetry_interval = u64::from(self.config.cycle.telemetry_interval.max(1));

        info!(
            background_ms = bg_period.as_millis() as u64,
            foreground_ms = fg_period.as_millis() as u64,
            duration_ms = duration.map(|d| d.as_millis() as u64),
            "Session starting"
        );

        let lift_handle = self.spawn("lift", move |running| lift.run(bg_period, &running))?;
        let intake_handle = match self.spawn("intake", move |running| {
            intake.run(bg_period, &running)
        }) {
            Ok(h) => h,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                let _ = lift_handle.join();
                return Err(e);
            }
        };

        let surface = self.surface();
        let start_ms = self.clock.now_ms();
        let end_ms = duration.map(|d| start_ms + d.as_millis() as u64);
        let mut steps = 0u64;

        let foreground_stats = run_periodic("foreground", fg_period, &self.running, || {
            let now_ms = self.clock.now_ms();
            if end_ms.is_some_and(|end| now_ms >= end) {
                info!(now_ms, "Session duration elapsed");
                self.running.store(false, Ordering::Release);
                return;
            }
            let step = foreground.step(now_ms.saturating_sub(start_ms), &surface);
            if step == ForegroundStep::Finished {
                info!(now_ms, "Foreground finished");
                self.running.store(false, Ordering::Release);
            }
            steps += 1;
            if steps % telemetry_interval == 0 {
                log_telemetry(&surface.status());
            }
        });

        // Covers an external stop that raced the foreground loop.
        self.running.store(false, Ordering::Release);

        let lift_stats = lift_handle
            .join()
            .map_err(|_| SessionError::TaskPanicked("lift"))?;
        let intake_stats = intake_handle
            .join()
            .map_err(|_| SessionError::TaskPanicked("intake"))?;

        let final_status = self.channels.status.snapshot();
        info!(
            lift_ticks = lift_stats.cycle_count,
            intake_ticks = intake_stats.cycle_count,
            ejected = final_status.intake.ejected,
            "Session stopped"
        );

        Ok(SessionReport {
            lift: lift_stats,
            intake: intake_stats,
            foreground: foreground_stats,
            final_status,
        })
    }

    fn spawn<T>(
        &self,
        task: &'static str,
        body: impl FnOnce(Arc<AtomicBool>) -> T + Send + 'static,
    ) -> Result<JoinHandle<T>, SessionError>
    where
        T: Send + 'static,
    {
        let running = Arc::clone(&self.running);
        std::thread::Builder::new()
            .name(format!("lb-{task}"))
            .spawn(move || body(running))
            .map_err(|source| SessionError::Spawn { task, source })
    }
}

/// One telemetry line.
pub fn log_telemetry(status: &SystemStatus) {
    let (lift, intake) = (&status.lift, &status.intake);
    info!(
        lift_mode = ?lift.mode,
        lift_target = %lift.target,
        lift_position = lift.position,
        lift_velocity = lift.velocity,
        out_of_bounds = lift.out_of_bounds,
        intake_running = intake.running,
        eject_phase = ?intake.phase,
        intake_velocity = intake.velocity,
        ejected = intake.ejected,
        "Telemetry"
    );
}

// ─── Tests ──────────────────────────────────────────────────────────
