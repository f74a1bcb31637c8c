//! # Lift/Intake Control Unit
//!
//! Runs one enabled period against the simulated lift and intake: loads the
//! configuration, spawns the lift and intake tasks and drives the foreground
//! from a routine file or a scripted controller through the operator
//! bindings (or idles until the duration elapses or Ctrl-C).

use clap::Parser;
use lb_common::consts::DEFAULT_CONFIG_PATH;
use lb_common::control_unit::state::Alliance;
use lb_control_unit::clock::{Clock, MonotonicClock};
use lb_control_unit::config::{Overrides, load_config};
use lb_control_unit::foreground::Idle;
use lb_control_unit::foreground::operator::{BindingParams, OperatorBindings, ScriptedController};
use lb_control_unit::foreground::routine::Routine;
use lb_control_unit::session::{IntakeTask, LiftTask, Session, SessionError, SessionReport};
use lb_control_unit::sim::{LiftPlantParams, ScriptedHue, SimLift, SimMotor};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Lift/intake control unit, simulated plant
#[derive(Parser, Debug)]
#[command(name = "lb_control_unit")]
#[command(version)]
#[command(about = "Lift position control and ring-eject intake control")]
struct Args {
    /// Path to the configuration TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Routine TOML to run as the foreground. Idles when omitted.
    #[arg(long, value_name = "FILE")]
    routine: Option<PathBuf>,

    /// Controller frame script replayed through the operator bindings.
    #[arg(long, value_name = "FILE", conflicts_with = "routine")]
    controller: Option<PathBuf>,

    /// Alliance side, overriding the config file (red | blue).
    #[arg(long)]
    alliance: Option<Alliance>,

    /// End the period after this many milliseconds.
    #[arg(long, value_name = "MS")]
    duration_ms: Option<u64>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Control unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Control unit shutdown complete");
}

fn run(args: &Args) -> Result<(), SessionError> {
    let overrides = Overrides {
        alliance: args.alliance,
    };
    let config = load_config(&args.config, &overrides)?;
    info!(
        service = %config.shared.service_name,
        log_level = config.shared.log_level.as_directive(),
        alliance = %config.intake.color_sort.alliance,
        color_sort = config.intake.color_sort.enabled,
        "Config OK"
    );

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let session = Session::new(config, Arc::clone(&clock));

    let running = session.running();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::Release);
    })
    .map_err(|e| SessionError::Signal(e.to_string()))?;

    let cfg = session.config();
    let lift = SimLift::new(LiftPlantParams::default(), Arc::clone(&clock));
    let lift_task = LiftTask::new(
        cfg,
        lift.clone(),
        lift.clone(),
        lift,
        session.channels(),
        Arc::clone(&clock),
    );

    // One red and one blue ring per second, from half a second in.
    let hue = ScriptedHue::alternating(
        &[0.0, 215.0],
        clock.now_ms() + 500,
        500,
        40,
        240,
        Arc::clone(&clock),
    );
    let intake_task = IntakeTask::new(
        cfg,
        hue,
        SimMotor::new(Arc::clone(&clock)),
        session.channels(),
        Arc::clone(&clock),
    );

    let duration = args.duration_ms.map(Duration::from_millis);
    let report = match (&args.routine, &args.controller) {
        (Some(path), _) => {
            let mut routine = Routine::load(path, cfg.intake.nominal_speed)?;
            info!(routine = routine.name(), "Running routine");
            let report = session.run(lift_task, intake_task, &mut routine, duration)?;
            info!(
                issued = routine.issued(),
                rejected = routine.rejected(),
                "Routine done"
            );
            report
        }
        (None, Some(path)) => {
            let controller = ScriptedController::load(path)?;
            info!(frames = controller.len(), "Running operator bindings");
            let mut operator = OperatorBindings::new(controller, BindingParams::from_config(cfg));
            session.run(lift_task, intake_task, &mut operator, duration)?
        }
        (None, None) => session.run(lift_task, intake_task, &mut Idle, duration)?,
    };

    log_report(&report);
    Ok(())
}

fn log_report(report: &SessionReport) {
    for (task, stats) in [
        ("lift", &report.lift),
        ("intake", &report.intake),
        ("foreground", &report.foreground),
    ] {
        info!(
            task,
            ticks = stats.cycle_count,
            avg_us = stats.avg_cycle_ns() / 1000,
            overruns = stats.overruns,
            "Cycle summary"
        );
    }
    let lift = &report.final_status.lift;
    info!(
        mode = ?lift.mode,
        target = %lift.target,
        position = lift.position,
        ejected = report.final_status.intake.ejected,
        "Final status"
    );
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
