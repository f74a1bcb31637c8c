//! Integration test: foreground sources driving both tasks.
//!
//! Validates: a routine's timed steps reach the lift and intake in order,
//! a manual excursion inside a routine redirects the following move, and
//! operator bindings cycle presets and hold-to-run the intake.

use std::sync::Arc;

use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::state::{LiftMode, LiftTarget};

use lb_control_unit::clock::{Clock, ManualClock};
use lb_control_unit::command::surface::{Channels, CommandLimits, CommandSurface};
use lb_control_unit::foreground::operator::{
    BindingParams, ControllerFrame, OperatorBindings, ScriptedController,
};
use lb_control_unit::foreground::routine::Routine;
use lb_control_unit::foreground::{Foreground, ForegroundStep};
use lb_control_unit::session::{IntakeTask, LiftTask};
use lb_control_unit::sim::{LiftPlantParams, ScriptedHue, SimLift, SimMotor};

const FG_EVERY_MS: u64 = 20;

/// Both tasks on one set of channels, ticked by hand.
struct Bench {
    clock: ManualClock,
    lift: LiftTask<SimLift, SimLift, SimLift>,
    intake: IntakeTask<ScriptedHue, SimMotor>,
    intake_motor: SimMotor,
    surface: CommandSurface,
    channels: Arc<Channels>,
}

impl Bench {
    fn new() -> Self {
        let cfg = ControlUnitConfig::default();
        let clock = ManualClock::new(0);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let channels = Arc::new(Channels::new());

        let plant = SimLift::new(LiftPlantParams::default(), Arc::clone(&shared));
        let mut lift = LiftTask::new(
            &cfg,
            plant.clone(),
            plant.clone(),
            plant,
            Arc::clone(&channels),
            Arc::clone(&shared),
        );
        lift.start();

        let intake_motor = SimMotor::new(Arc::clone(&shared));
        let mut intake = IntakeTask::new(
            &cfg,
            ScriptedHue::new(Vec::new(), Arc::clone(&shared)),
            intake_motor.clone(),
            Arc::clone(&channels),
            Arc::clone(&shared),
        );
        intake.start();

        let surface = CommandSurface::new(
            Arc::clone(&channels),
            shared,
            CommandLimits::from_config(&cfg),
        );
        Self {
            clock,
            lift,
            intake,
            intake_motor,
            surface,
            channels,
        }
    }

    /// Advance 10 ms: foreground first when due, then both tasks.
    fn step<F: Foreground>(&mut self, fg: &mut F) -> ForegroundStep {
        let now = self.clock.advance(10);
        let step = if now % FG_EVERY_MS == 0 {
            fg.step(now, &self.surface)
        } else {
            ForegroundStep::Continue
        };
        self.lift.tick();
        self.intake.tick();
        step
    }

    fn run_to<F: Foreground>(&mut self, fg: &mut F, until_ms: u64) -> Option<u64> {
        while self.clock.now_ms() < until_ms {
            if self.step(fg) == ForegroundStep::Finished {
                return Some(self.clock.now_ms());
            }
        }
        None
    }
}

const PICKUP: &str = r#"
name = "pickup"
duration_ms = 3000

[[step]]
at_ms = 0
action = "move"
target = "intake"

[[step]]
at_ms = 100
action = "intake"
duration_ms = 1500

[[step]]
at_ms = 2000
action = "manual"
velocity = 150.0
hold_ms = 200

[[step]]
at_ms = 2600
action = "move"
target = "idle"
"#;

#[test]
fn routine_drives_lift_and_intake() {
    let mut bench = Bench::new();
    let mut routine = Routine::from_toml(PICKUP, 600.0).unwrap();

    assert_eq!(bench.run_to(&mut routine, 1900), None);
    let lift = bench.channels.status.lift();
    assert_eq!(lift.mode, LiftMode::Settling);
    assert_eq!(lift.target, LiftTarget::Intake);
    assert_eq!(
        bench.intake_motor.changes(),
        vec![(100, 600.0), (1600, 0.0)]
    );

    // Manual hold lifts past INTAKE.
    bench.run_to(&mut routine, 2100);
    let lift = bench.channels.status.lift();
    assert_eq!(lift.mode, LiftMode::Manual);
    assert_eq!(lift.velocity, 150.0);
    assert!(lift.out_of_bounds);

    // The move to IDLE after the excursion is redirected to CLEAR.
    bench.run_to(&mut routine, 2620);
    let lift = bench.channels.status.lift();
    assert_eq!(lift.mode, LiftMode::Automatic);
    assert_eq!(lift.target, LiftTarget::Clear);

    let finished = bench.run_to(&mut routine, 4000);
    assert_eq!(finished, Some(3000));
    assert_eq!(routine.issued(), 4);
    assert_eq!(routine.rejected(), 0);
}

#[test]
fn routine_counts_rejected_steps() {
    let toml = r#"
[[step]]
at_ms = 0
action = "manual"
velocity = 900.0

[[step]]
at_ms = 20
action = "intake"
duration_ms = 100
speed = 50.0
"#;
    let mut bench = Bench::new();
    let mut routine = Routine::from_toml(toml, 600.0).unwrap();
    let finished = bench.run_to(&mut routine, 200);
    assert_eq!(finished, Some(20));
    assert_eq!(routine.rejected(), 1);
    assert_eq!(bench.channels.status.lift().mode, LiftMode::Settling);
    assert_eq!(bench.intake_motor.changes()[0], (20, 50.0));
}

fn press(f: impl FnOnce(&mut ControllerFrame)) -> ControllerFrame {
    let mut frame = ControllerFrame::default();
    f(&mut frame);
    frame
}

#[test]
fn operator_cycles_presets_and_holds_intake() {
    let released = ControllerFrame::default();
    let controller = ScriptedController::new(vec![
        (0, press(|f| f.preset_cycle = true)),
        (100, released),
        (200, press(|f| f.intake_forward = true)),
        (600, released),
        (2000, press(|f| f.preset_cycle = true)),
        (2100, released),
        (3500, press(|f| f.home = true)),
        (3600, released),
    ]);
    let params = BindingParams::from_config(&ControlUnitConfig::default());
    let mut operator = OperatorBindings::new(controller, params);
    let mut bench = Bench::new();

    bench.run_to(&mut operator, 1900);
    let lift = bench.channels.status.lift();
    assert_eq!((lift.mode, lift.target), (LiftMode::Settling, LiftTarget::Intake));
    assert_eq!(
        bench.intake_motor.changes(),
        vec![(200, 600.0), (600, 0.0)]
    );

    bench.run_to(&mut operator, 3400);
    let lift = bench.channels.status.lift();
    assert_eq!((lift.mode, lift.target), (LiftMode::Settling, LiftTarget::Clear));

    bench.run_to(&mut operator, 6000);
    let lift = bench.channels.status.lift();
    assert_eq!((lift.mode, lift.target), (LiftMode::Settling, LiftTarget::Idle));
    // Re-zeroed on settle; only the coast since then shows.
    assert!(lift.position.abs() < 100.0, "position {}", lift.position);
}

#[test]
fn operator_manual_hold_and_release() {
    let up = press(|f| f.lift_up = true);
    let controller = ScriptedController::new(vec![(0, up), (400, ControllerFrame::default())]);
    let params = BindingParams::from_config(&ControlUnitConfig::default());
    let mut operator = OperatorBindings::new(controller, params);
    let mut bench = Bench::new();

    bench.run_to(&mut operator, 390);
    let lift = bench.channels.status.lift();
    assert_eq!(lift.mode, LiftMode::Manual);
    assert_eq!(lift.velocity, params.manual_velocity);

    // Released: the last command goes stale and the lift decays to rest.
    bench.run_to(&mut operator, 700);
    let lift = bench.channels.status.lift();
    assert_eq!(lift.mode, LiftMode::Manual);
    assert_eq!(lift.velocity, 0.0);
}

#[test]
fn operator_held_reverse_overrides_toggle() {
    let released = ControllerFrame::default();
    let controller = ScriptedController::new(vec![
        (0, press(|f| f.intake_toggle = true)),
        (100, released),
        (200, press(|f| f.intake_reverse = true)),
        (600, released),
        (1000, press(|f| f.intake_toggle = true)),
        (1100, released),
    ]);
    let params = BindingParams::from_config(&ControlUnitConfig::default());
    let mut operator = OperatorBindings::new(controller, params);
    let mut bench = Bench::new();

    bench.run_to(&mut operator, 900);
    // Reverse only while held; the toggled run resumes on release.
    assert_eq!(
        bench.intake_motor.changes(),
        vec![(20, 600.0), (200, -600.0), (600, 600.0)]
    );
    assert!(bench.channels.status.intake().running);
    assert!(operator.is_toggled());

    bench.run_to(&mut operator, 1300);
    assert_eq!(bench.intake_motor.changes().last(), Some(&(1000, 0.0)));
    assert!(!bench.channels.status.intake().running);
    assert!(!operator.is_toggled());
}
