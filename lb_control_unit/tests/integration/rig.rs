//! Shared test rigs: a task, its simulated devices and a manual clock.

use std::sync::Arc;

use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::state::{IntakeStatus, LiftStatus};

use lb_control_unit::clock::ManualClock;
use lb_control_unit::command::surface::{Channels, CommandLimits, CommandSurface};
use lb_control_unit::session::{IntakeTask, LiftTask};
use lb_control_unit::sim::{LiftPlantParams, RingPass, ScriptedHue, SimLift, SimMotor};
use lb_control_unit::state::intake::IntakeOutput;
use lb_control_unit::state::lift::LiftOutput;

fn surface(cfg: &ControlUnitConfig, channels: &Arc<Channels>, clock: &ManualClock) -> CommandSurface {
    CommandSurface::new(
        Arc::clone(channels),
        Arc::new(clock.clone()),
        CommandLimits::from_config(cfg),
    )
}

// ─── Lift ───────────────────────────────────────────────────────────

pub struct LiftRig {
    pub clock: ManualClock,
    pub plant: SimLift,
    pub task: LiftTask<SimLift, SimLift, SimLift>,
    pub channels: Arc<Channels>,
    pub surface: CommandSurface,
    period_ms: u64,
}

impl LiftRig {
    pub fn new(cfg: &ControlUnitConfig, params: LiftPlantParams) -> Self {
        let clock = ManualClock::new(0);
        let plant = SimLift::new(params, Arc::new(clock.clone()));
        let channels = Arc::new(Channels::new());
        let mut task = LiftTask::new(
            cfg,
            plant.clone(),
            plant.clone(),
            plant.clone(),
            Arc::clone(&channels),
            Arc::new(clock.clone()),
        );
        task.start();
        let surface = surface(cfg, &channels, &clock);
        Self {
            clock,
            plant,
            task,
            channels,
            surface,
            period_ms: cfg.cycle.background_period_ms,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ControlUnitConfig::default(), LiftPlantParams::default())
    }

    /// Advance one period and tick.
    pub fn step(&mut self) -> LiftOutput {
        self.clock.advance(self.period_ms);
        self.task.tick()
    }

    pub fn status(&self) -> LiftStatus {
        self.channels.status.lift()
    }

    /// Tick until `done` holds for the published status. Returns the number
    /// of ticks taken, or `None` after `max_ticks`.
    pub fn run_until(&mut self, max_ticks: usize, done: impl Fn(&LiftStatus) -> bool) -> Option<usize> {
        (1..=max_ticks).find(|_| {
            self.step();
            done(&self.status())
        })
    }
}

// ─── Intake ─────────────────────────────────────────────────────────

pub struct IntakeRig {
    pub clock: ManualClock,
    pub motor: SimMotor,
    pub task: IntakeTask<ScriptedHue, SimMotor>,
    pub channels: Arc<Channels>,
    pub surface: CommandSurface,
    period_ms: u64,
}

impl IntakeRig {
    pub fn new(cfg: &ControlUnitConfig, passes: Vec<RingPass>) -> Self {
        let clock = ManualClock::new(0);
        let hue = ScriptedHue::new(passes, Arc::new(clock.clone()));
        let motor = SimMotor::new(Arc::new(clock.clone()));
        let channels = Arc::new(Channels::new());
        let mut task = IntakeTask::new(
            cfg,
            hue,
            motor.clone(),
            Arc::clone(&channels),
            Arc::new(clock.clone()),
        );
        task.start();
        let surface = surface(cfg, &channels, &clock);
        Self {
            clock,
            motor,
            task,
            channels,
            surface,
            period_ms: cfg.cycle.background_period_ms,
        }
    }

    pub fn step(&mut self) -> IntakeOutput {
        self.clock.advance(self.period_ms);
        self.task.tick()
    }

    /// Tick until the clock reaches `until_ms`.
    pub fn run_to(&mut self, until_ms: u64) {
        use lb_control_unit::clock::Clock;
        while self.clock.now_ms() < until_ms {
            self.step();
        }
    }

    pub fn status(&self) -> IntakeStatus {
        self.channels.status.intake()
    }
}
