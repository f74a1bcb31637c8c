//! Workspace-wide constants for the lift/intake control unit.
//!
//! Single source of truth for default periods, parameter bounds and the
//! default configuration path. Config validation checks against the
//! `*_MIN` / `*_MAX` pairs defined here.

// ─── Task Periods ───────────────────────────────────────────────────

/// Default background (actuator-owning) task period [ms].
pub const BACKGROUND_PERIOD_MS: u64 = 10;

/// Default foreground (operator / routine) task period [ms].
pub const FOREGROUND_PERIOD_MS: u64 = 25;

/// Bounds for any task period [ms].
pub const PERIOD_MS_MIN: u64 = 1;
pub const PERIOD_MS_MAX: u64 = 1000;

/// Default telemetry log interval [background ticks].
pub const TELEMETRY_INTERVAL_DEFAULT: u32 = 20;

// ─── Lift Defaults ──────────────────────────────────────────────────

/// Default lift positions [sensor centidegrees].
pub const LIFT_POSITION_IDLE: f64 = 0.0;
pub const LIFT_POSITION_INTAKE: f64 = 4800.0;
pub const LIFT_POSITION_CLEAR: f64 = 6000.0;

/// Default settle tolerance [centidegrees].
pub const SETTLE_TOLERANCE_DEFAULT: f64 = 100.0;

/// Default closed-loop velocity limit [rpm].
pub const LIFT_MAX_VELOCITY_DEFAULT: f64 = 200.0;

/// Upper bound for any lift velocity limit [rpm].
pub const LIFT_VELOCITY_LIMIT_MAX: f64 = 600.0;

/// Default per-tick decay step for manual release [rpm/tick].
pub const DECAY_STEP_DEFAULT: f64 = 20.0;

/// Default snap-to-zero threshold during decay [rpm].
pub const MIN_VELOCITY_DEFAULT: f64 = 5.0;

/// Default lifetime of a manual velocity command [ms].
pub const MANUAL_TTL_MS_DEFAULT: u64 = 50;

/// Bounds for the manual command lifetime [ms].
pub const MANUAL_TTL_MS_MIN: u64 = 1;
pub const MANUAL_TTL_MS_MAX: u64 = 1000;

/// Default plausible travel range [centidegrees].
pub const TRAVEL_MIN_DEFAULT: f64 = -1000.0;
pub const TRAVEL_MAX_DEFAULT: f64 = 8000.0;

// ─── Intake Defaults ────────────────────────────────────────────────

/// Default nominal intake speed [rpm].
pub const INTAKE_SPEED_DEFAULT: f64 = 600.0;

/// Upper bound for intake speed [rpm].
pub const INTAKE_SPEED_MAX: f64 = 600.0;

/// Longest accepted single intake run [ms].
pub const INTAKE_RUN_MS_MAX: u64 = 15 * 60 * 1000;

/// Default color-sort timings [ms].
pub const TRAVEL_DELAY_MS_DEFAULT: u64 = 60;
pub const EJECT_DURATION_MS_DEFAULT: u64 = 150;
pub const EJECT_COOLDOWN_MS_DEFAULT: u64 = 400;

/// Upper bound for any color-sort timing [ms].
pub const COLOR_SORT_MS_MAX: u64 = 5000;

/// Hue wheel size [degrees].
pub const HUE_DEGREES: f64 = 360.0;

// ─── Paths ──────────────────────────────────────────────────────────

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/lb.toml";
