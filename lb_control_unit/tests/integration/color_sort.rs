//! Integration test: intake task with ring color sorting.
//!
//! Validates: the stop window after a rejected ring, cooldown suppression
//! of a second detection, run expiry and cancellation, reverse runs and the
//! wrap-around red band.

use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::error::SensorFault;
use lb_common::control_unit::state::{Alliance, EjectPhase};

use lb_control_unit::hw::BrakeMode;
use lb_control_unit::sim::RingPass;

use super::rig::IntakeRig;

const BLUE: f64 = 215.0;
const RED: f64 = 5.0;

fn ring(start_ms: u64, hue: f64) -> RingPass {
    RingPass {
        start_ms,
        end_ms: start_ms + 40,
        hue,
    }
}

#[test]
fn rejected_rings_stop_the_intake_for_the_eject_window() {
    let cfg = ControlUnitConfig::default();
    let mut rig = IntakeRig::new(
        &cfg,
        vec![
            ring(100, BLUE),
            // Still inside the cooldown of the first detection.
            ring(300, BLUE),
            // Our own color passes straight through.
            ring(520, RED),
            ring(700, BLUE),
        ],
    );
    assert_eq!(rig.motor.brake_mode(), BrakeMode::Coast);

    rig.surface.request_intake_run(2000, 600.0).unwrap();
    rig.run_to(2000);

    assert_eq!(
        rig.motor.changes(),
        vec![
            (10, 600.0),
            (160, 0.0),
            (310, 600.0),
            (760, 0.0),
            (910, 600.0),
            (2000, 0.0),
        ]
    );
    let s = rig.status();
    assert_eq!(s.ejected, 2);
    assert!(!s.running);
    assert_eq!(s.phase, EjectPhase::Normal);
}

#[test]
fn cancel_mid_eject_resets_the_sorter() {
    let cfg = ControlUnitConfig::default();
    let mut rig = IntakeRig::new(&cfg, vec![ring(100, BLUE)]);

    rig.surface.request_intake_run(5000, 600.0).unwrap();
    rig.run_to(180);
    assert_eq!(rig.status().phase, EjectPhase::Ejecting);

    rig.surface.cancel_intake_run();
    rig.step();
    let s = rig.status();
    assert!(!s.running);
    assert_eq!(s.phase, EjectPhase::Normal);
    assert_eq!(s.velocity, 0.0);
    // The ring never finished ejecting.
    assert_eq!(s.ejected, 0);

    rig.surface.request_intake_run(500, 600.0).unwrap();
    assert_eq!(rig.step().velocity, 600.0);
}

#[test]
fn reverse_run_ignores_color() {
    let cfg = ControlUnitConfig::default();
    let mut rig = IntakeRig::new(&cfg, vec![ring(100, BLUE), ring(300, BLUE)]);

    rig.surface.request_intake_run(1000, -600.0).unwrap();
    rig.run_to(500);

    assert_eq!(rig.motor.changes(), vec![(10, -600.0)]);
    let s = rig.status();
    assert_eq!(s.phase, EjectPhase::Normal);
    assert!(s.faults.is_empty());
}

#[test]
fn blue_alliance_rejects_red_across_the_wrap() {
    let mut cfg = ControlUnitConfig::default();
    cfg.intake.color_sort.alliance = Alliance::Blue;
    let mut rig = IntakeRig::new(&cfg, vec![ring(100, 355.0), ring(700, BLUE)]);

    rig.surface.request_intake_run(1000, 600.0).unwrap();
    rig.run_to(1000);

    assert_eq!(
        rig.motor.changes(),
        vec![(10, 600.0), (160, 0.0), (310, 600.0), (1000, 0.0)]
    );
    assert_eq!(rig.status().ejected, 1);
}

#[test]
fn disabled_sorting_is_pass_through() {
    let mut cfg = ControlUnitConfig::default();
    cfg.intake.color_sort.enabled = false;
    let mut rig = IntakeRig::new(&cfg, vec![ring(100, BLUE)]);

    rig.surface.request_intake_run(400, 600.0).unwrap();
    rig.run_to(400);

    assert_eq!(rig.motor.changes(), vec![(10, 600.0), (400, 0.0)]);
    assert_eq!(rig.status().ejected, 0);
}

#[test]
fn empty_sensor_reports_no_read_without_warning() {
    let cfg = ControlUnitConfig::default();
    let mut rig = IntakeRig::new(&cfg, Vec::new());

    rig.surface.request_intake_run(200, 600.0).unwrap();
    let out = rig.step();
    assert_eq!(out.velocity, 600.0);
    assert_eq!(out.faults, SensorFault::HUE_NO_READ);
    assert!(!out.faults.has_warning());
}

#[test]
fn superseding_run_restarts_the_timer() {
    let cfg = ControlUnitConfig::default();
    let mut rig = IntakeRig::new(&cfg, Vec::new());

    rig.surface.request_intake_run(200, 600.0).unwrap();
    rig.run_to(150);
    rig.surface.request_intake_run(200, 300.0).unwrap();
    rig.run_to(400);

    assert_eq!(
        rig.motor.changes(),
        vec![(10, 600.0), (160, 300.0), (350, 0.0)]
    );
}
