//! Board configuration.
//!
//! Every tunable of the editor core lives in [`BoardConfig`]. Hosts either use
//! the defaults or deserialize a JSON document and validate it with
//! [`BoardConfig::from_json`]. Missing keys fall back to their defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Error returned when a configuration document is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("zoom range must satisfy 0 < zoom_min <= zoom_max (got {min}..{max})")]
    ZoomRange { min: f64, max: f64 },
    #[error("wheel_zoom_factor must be greater than 1 (got {0})")]
    WheelFactor(f64),
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
}

/// Tunables for the board core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Lower zoom bound.
    pub zoom_min: f64,
    /// Upper zoom bound.
    pub zoom_max: f64,
    /// Multiplicative zoom step applied per wheel tick.
    pub wheel_zoom_factor: f64,
    /// Grid pitch in world units, used for snapping and grid lines.
    pub grid_size: f64,
    /// Snap single-click placements to the grid.
    pub snap_to_grid: bool,
    /// Draw grid lines.
    pub show_grid: bool,
    /// Width of the world-space rectangle the map image is fitted into.
    pub board_width: f64,
    /// Height of the world-space rectangle the map image is fitted into.
    pub board_height: f64,
    /// Maximum number of history snapshots kept; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Minimum distance between consecutive freehand line samples.
    pub line_sample_distance: f64,
    /// Ask the host for text content instead of placing default text.
    pub prompt_for_text: bool,
    /// Per-gadget placement limits, keyed by gadget id.
    pub gadget_limits: HashMap<String, usize>,
    /// Placement limit for gadgets missing from `gadget_limits`.
    pub default_gadget_limit: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        let gadget_limits = [("smoke-grenade", 10), ("flashbang", 10)]
            .into_iter()
            .map(|(id, limit)| (id.to_owned(), limit))
            .collect();
        Self {
            zoom_min: 0.1,
            zoom_max: 3.0,
            wheel_zoom_factor: 1.1,
            grid_size: 10.0,
            snap_to_grid: true,
            show_grid: false,
            board_width: 1000.0,
            board_height: 600.0,
            history_limit: None,
            line_sample_distance: 1.0,
            prompt_for_text: false,
            gadget_limits,
            default_gadget_limit: 2,
        }
    }
}

impl BoardConfig {
    /// Parse a JSON document and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the matching
    /// validation error for out-of-range values.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max) {
            return Err(ConfigError::ZoomRange { min: self.zoom_min, max: self.zoom_max });
        }
        if self.wheel_zoom_factor <= 1.0 {
            return Err(ConfigError::WheelFactor(self.wheel_zoom_factor));
        }
        for (field, value) in [
            ("grid_size", self.grid_size),
            ("board_width", self.board_width),
            ("board_height", self.board_height),
            ("line_sample_distance", self.line_sample_distance),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }

    /// Placement limit for a gadget id.
    #[must_use]
    pub fn gadget_limit(&self, gadget_id: &str) -> usize {
        self.gadget_limits
            .get(gadget_id)
            .copied()
            .unwrap_or(self.default_gadget_limit)
    }
}
