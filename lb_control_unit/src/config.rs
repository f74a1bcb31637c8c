//! TOML configuration loader with validation.
//!
//! Loads [`ControlUnitConfig`] from a single file, applies command-line
//! overrides and runs every section's bound checks. The result is fixed for
//! the whole session; nothing here is re-read once the tasks start.

use std::path::Path;

use lb_common::config::{ConfigError, ConfigLoader};
use lb_common::control_unit::config::ControlUnitConfig;
use lb_common::control_unit::state::Alliance;
use tracing::{debug, info};

// ─── Overrides ──────────────────────────────────────────────────────

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    /// Alliance side, evaluated once at startup.
    pub alliance: Option<Alliance>,
}

impl Overrides {
    /// Apply to a parsed config. Returns true if anything changed.
    pub fn apply(&self, config: &mut ControlUnitConfig) -> bool {
        let mut changed = false;
        if let Some(alliance) = self.alliance {
            if config.intake.color_sort.alliance != alliance {
                debug!(
                    from = %config.intake.color_sort.alliance,
                    to = %alliance,
                    "Alliance overridden"
                );
                config.intake.color_sort.alliance = alliance;
                changed = true;
            }
        }
        changed
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load, override and validate the configuration file.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<ControlUnitConfig, ConfigError> {
    let mut config = ControlUnitConfig::load(path)?;
    overrides.apply(&mut config);
    config.validate()?;
    info!(path = %path.display(), "Configuration loaded");
    log_summary(&config);
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::from_toml(content)?;
    config.validate()?;
    Ok(config)
}

fn log_summary(config: &ControlUnitConfig) {
    let lift = &config.lift;
    let sort = &config.intake.color_sort;
    debug!(
        background_ms = config.cycle.background_period_ms,
        foreground_ms = config.cycle.foreground_period_ms,
        idle = lift.positions.idle,
        intake = lift.positions.intake,
        clear = lift.positions.clear,
        tolerance = lift.settle_tolerance,
        manual_ttl_ms = lift.manual_ttl_ms,
        policy = ?lift.out_of_bounds_policy,
        "Lift parameters"
    );
    debug!(
        enabled = sort.enabled,
        alliance = %sort.alliance,
        travel_delay_ms = sort.travel_delay_ms,
        eject_ms = sort.eject_duration_ms,
        cooldown_ms = sort.cooldown_ms,
        "Color sort parameters"
    );
}

// ─── Tests ──────────────────────────────────────────────────────────
