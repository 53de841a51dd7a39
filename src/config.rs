//! Run configuration shared, read-only, by every engine component.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransitError};

/// Parameters of the Savitzky-Golay baseline used by the minima finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Window length in timesteps. Must be odd.
    pub window: usize,
    /// Order of the fitted polynomial.
    pub order: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        // One semidiurnal cycle (~12.4h) at 5 minute steps.
        Self { window: 149, order: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Sampling interval of every velocity series, in seconds.
    pub timestep_seconds: f64,
    /// Tolerance, in timesteps, above a minimum that still counts as inside its window.
    pub timestep_margin: u32,
    /// Signed boat speeds over water in knots.
    pub boat_speeds: Vec<f64>,
    /// Wall-clock time of timestep index 0. Taken from the currents table when absent.
    pub reference_epoch: Option<DateTime<Utc>>,
    pub smoothing: SmoothingConfig,
    /// Directory for memoized per-segment artifacts. No caching when absent.
    pub cache_dir: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timestep_seconds: 300.0,
            timestep_margin: 6,
            boat_speeds: vec![5.0],
            reference_epoch: None,
            smoothing: SmoothingConfig::default(),
            cache_dir: None,
        }
    }
}

impl PlannerConfig {
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading planner configuration from {:?}", path.as_ref());
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.timestep_seconds.is_finite() && self.timestep_seconds > 0.0) {
            return Err(TransitError::InvalidConfig(format!(
                "timestep_seconds must be positive, got {}",
                self.timestep_seconds
            )));
        }
        if self.boat_speeds.is_empty() {
            return Err(TransitError::InvalidConfig("boat_speeds is empty".into()));
        }
        if let Some(bad) = self.boat_speeds.iter().find(|s| !s.is_finite()) {
            return Err(TransitError::InvalidConfig(format!("non-finite boat speed {bad}")));
        }
        if self.smoothing.window % 2 == 0 {
            return Err(TransitError::InvalidConfig(format!(
                "smoothing window must be odd, got {}",
                self.smoothing.window
            )));
        }
        if self.smoothing.order >= self.smoothing.window {
            return Err(TransitError::InvalidConfig(format!(
                "smoothing order {} must be below window {}",
                self.smoothing.order, self.smoothing.window
            )));
        }
        Ok(())
    }

    /// Fraction of an hour covered by one timestep.
    pub fn timestep_hours(&self) -> f64 {
        self.timestep_seconds / 3600.0
    }

    pub fn timestep(&self) -> TimeDelta {
        TimeDelta::milliseconds((self.timestep_seconds * 1000.0).round() as i64)
    }
}
