//! Integration test: full session on real threads.
//!
//! Validates: both tasks start and stop with the period, actuators are left
//! at zero velocity, the session ends on duration, on foreground completion
//! and on an external stop, commands issued through the session's surface
//! reach the tasks, and a scripted controller drives the operator bindings.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::state::LiftTarget;

use lb_control_unit::clock::MonotonicClock;
use lb_control_unit::command::surface::CommandSurface;
use lb_control_unit::foreground::operator::{BindingParams, OperatorBindings, ScriptedController};
use lb_control_unit::foreground::routine::Routine;
use lb_control_unit::foreground::{Foreground, ForegroundStep, Idle};
use lb_control_unit::hw::BrakeMode;
use lb_control_unit::session::{IntakeTask, LiftTask, Session};
use lb_control_unit::sim::{LiftPlantParams, ScriptedHue, SimLift, SimMotor};

struct Devices {
    lift: SimLift,
    intake: SimMotor,
}

fn tasks(
    session: &Session,
) -> (
    LiftTask<SimLift, SimLift, SimLift>,
    IntakeTask<ScriptedHue, SimMotor>,
    Devices,
) {
    let clock = session.clock();
    let lift = SimLift::new(LiftPlantParams::default(), Arc::clone(&clock));
    let motor = SimMotor::new(Arc::clone(&clock));
    let lift_task = LiftTask::new(
        session.config(),
        lift.clone(),
        lift.clone(),
        lift.clone(),
        session.channels(),
        Arc::clone(&clock),
    );
    let intake_task = IntakeTask::new(
        session.config(),
        ScriptedHue::new(Vec::new(), Arc::clone(&clock)),
        motor.clone(),
        session.channels(),
        clock,
    );
    (
        lift_task,
        intake_task,
        Devices {
            lift,
            intake: motor,
        },
    )
}

fn session() -> Session {
    Session::new(ControlUnitConfig::default(), Arc::new(MonotonicClock::new()))
}

#[test]
fn session_ends_after_duration_with_actuators_zeroed() {
    let session = session();
    let (lift, intake, devices) = tasks(&session);

    // Keep both actuators busy until the end of the period.
    let surface = session.surface();
    surface.request_manual_velocity(100.0).unwrap();
    surface.request_intake_run(10_000, 600.0).unwrap();

    struct KeepLifting;
    impl Foreground for KeepLifting {
        fn step(&mut self, _now_ms: u64, surface: &CommandSurface) -> ForegroundStep {
            let _ = surface.request_manual_velocity(100.0);
            ForegroundStep::Continue
        }
    }

    let started = Instant::now();
    let report = session
        .run(lift, intake, &mut KeepLifting, Some(Duration::from_millis(200)))
        .unwrap();
    let elapsed = started.elapsed();

    // Millisecond clock: allow for truncation at both ends.
    assert!(elapsed >= Duration::from_millis(190), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    assert!(report.lift.cycle_count > 0);
    assert!(report.intake.cycle_count > 0);
    assert!(report.foreground.cycle_count > 0);

    assert_eq!(devices.lift.commanded_velocity(), 0.0);
    assert_eq!(devices.lift.brake_mode(), BrakeMode::Hold);
    assert_eq!(devices.intake.velocity(), 0.0);
    assert_eq!(devices.intake.brake_mode(), BrakeMode::Coast);
    assert!(
        devices.intake.changes().iter().any(|&(_, v)| v == 600.0),
        "intake never ran"
    );

    assert_eq!(report.final_status.lift.velocity, 0.0);
    assert_eq!(report.final_status.intake.velocity, 0.0);
    assert!(!session.running().load(Ordering::Acquire));
}

#[test]
fn session_ends_when_routine_finishes() {
    let toml = r#"
duration_ms = 150

[[step]]
at_ms = 0
action = "move"
target = "intake"
"#;
    let session = session();
    let (lift, intake, devices) = tasks(&session);
    let mut routine = Routine::from_toml(toml, 600.0).unwrap();

    let report = session
        .run(lift, intake, &mut routine, Some(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(routine.issued(), 1);
    assert_eq!(report.final_status.lift.target, LiftTarget::Intake);
    // Stopped mid-move: the lift was rising and is now commanded to rest.
    assert!(devices.lift.physical_position() > 0.0);
    assert_eq!(devices.lift.commanded_velocity(), 0.0);
}

#[test]
fn external_stop_ends_an_open_ended_session() {
    let session = session();
    let (lift, intake, _devices) = tasks(&session);

    let running = session.running();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        running.store(false, Ordering::Release);
    });

    let report = session.run(lift, intake, &mut Idle, None).unwrap();
    stopper.join().unwrap();

    assert!(report.lift.cycle_count > 0);
    assert!(report.foreground.cycle_count > 0);
}

#[test]
fn status_is_visible_from_the_surface_while_running() {
    let session = session();
    let (lift, intake, _devices) = tasks(&session);
    let surface = session.surface();
    surface.request_automatic_move(LiftTarget::Clear).unwrap();

    struct Watch {
        saw_target: bool,
        start: Option<u64>,
    }
    impl Foreground for Watch {
        fn step(&mut self, now_ms: u64, surface: &CommandSurface) -> ForegroundStep {
            let start = *self.start.get_or_insert(now_ms);
            self.saw_target |= surface.status().lift.target == LiftTarget::Clear;
            if self.saw_target || now_ms.saturating_sub(start) > 1000 {
                ForegroundStep::Finished
            } else {
                ForegroundStep::Continue
            }
        }
    }

    let mut watch = Watch {
        saw_target: false,
        start: None,
    };
    session.run(lift, intake, &mut watch, None).unwrap();
    assert!(watch.saw_target);
}

#[test]
fn scripted_operator_runs_in_a_session() {
    let script = r#"
[[frame]]
at_ms = 0
intake_toggle = true

[[frame]]
at_ms = 60
"#;
    let session = session();
    let (lift, intake, devices) = tasks(&session);
    let controller = ScriptedController::from_toml(script).unwrap();
    let params = BindingParams::from_config(session.config());
    let mut operator = OperatorBindings::new(controller, params);

    let report = session
        .run(lift, intake, &mut operator, Some(Duration::from_millis(200)))
        .unwrap();

    assert!(operator.is_toggled());
    assert!(report.foreground.cycle_count > 0);
    assert!(
        devices.intake.changes().iter().any(|&(_, v)| v == 600.0),
        "toggle never started the intake"
    );
    // Stopped at the end of the period even though the toggle is on.
    assert_eq!(devices.intake.velocity(), 0.0);
}
