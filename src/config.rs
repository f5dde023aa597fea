use serde::Serialize;

use crate::error::ConfigError;

/// Largest surface raster accepted, in pixels (4096 x 4096).
pub const MAX_SURFACE_PIXELS: usize = 4096 * 4096;

/// Longest run accepted, in steps.
pub const MAX_TARGET_STEPS: u64 = 2_000_000;

/// All tunable parameters of a sweep run. Physical quantities are in meters
/// and seconds; the simulation itself works in surface pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Params {
    // Surface
    pub width_m: f64,
    pub height_m: f64,
    pub pixels_per_meter: f64,

    // Robot
    pub tool_width_m: f64,
    pub speed_m_s: f64,
    pub step_interval_s: f64,

    // Run length
    pub simulated_seconds: f64,
    pub realtime_budget_s: f64,

    // Crossing detection
    pub cell_size_m: f64,
    pub proximity_radius_px: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            width_m: 20.0,
            height_m: 15.0,
            pixels_per_meter: 40.0,
            tool_width_m: 0.5,
            speed_m_s: 0.2,
            step_interval_s: 1.0,
            simulated_seconds: 2.0 * 60.0 * 60.0,
            realtime_budget_s: 2.0,
            cell_size_m: 1.0,
            proximity_radius_px: 10.0,
        }
    }
}

impl Params {
    pub fn surface_width_px(&self) -> f64 {
        self.width_m * self.pixels_per_meter
    }

    pub fn surface_height_px(&self) -> f64 {
        self.height_m * self.pixels_per_meter
    }

    /// Distance covered by one step.
    pub fn step_px(&self) -> f64 {
        self.speed_m_s * self.step_interval_s * self.pixels_per_meter
    }

    /// Image size covering the whole surface, at least one pixel each way.
    pub fn surface_size(&self) -> Result<(usize, usize), ConfigError> {
        let w = self.surface_width_px().ceil().max(1.0);
        let h = self.surface_height_px().ceil().max(1.0);
        let (wu, hu) = (w as usize, h as usize);
        match wu.checked_mul(hu) {
            Some(n) if n <= MAX_SURFACE_PIXELS => Ok((wu, hu)),
            _ => Err(ConfigError::OutOfRange {
                name: "surface_pixels",
                value: w * h,
                min: 1.0,
                max: MAX_SURFACE_PIXELS as f64,
            }),
        }
    }

    pub fn tool_width_px(&self) -> f64 {
        self.tool_width_m * self.pixels_per_meter
    }

    pub fn cell_size_px(&self) -> f64 {
        self.cell_size_m * self.pixels_per_meter
    }

    /// One step per interval of simulated time, whole steps only.
    pub fn target_steps(&self) -> u64 {
        (self.simulated_seconds / self.step_interval_s).floor() as u64
    }

    pub fn px_to_m(&self, px: f64) -> f64 {
        px / self.pixels_per_meter
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("width_m", self.width_m),
            ("height_m", self.height_m),
            ("pixels_per_meter", self.pixels_per_meter),
            ("tool_width_m", self.tool_width_m),
            ("speed_m_s", self.speed_m_s),
            ("step_interval_s", self.step_interval_s),
            ("simulated_seconds", self.simulated_seconds),
            ("realtime_budget_s", self.realtime_budget_s),
            ("cell_size_m", self.cell_size_m),
            ("proximity_radius_px", self.proximity_radius_px),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name });
            }
        }

        if self.width_m <= 0.0 || self.height_m <= 0.0 {
            return Err(ConfigError::InvalidDimensions(format!(
                "surface must be positive, got {} x {} m",
                self.width_m, self.height_m
            )));
        }

        let positive = [
            ("pixels_per_meter", self.pixels_per_meter),
            ("tool_width_m", self.tool_width_m),
            ("speed_m_s", self.speed_m_s),
            ("step_interval_s", self.step_interval_s),
            ("cell_size_m", self.cell_size_m),
        ];
        for (name, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        let non_negative = [
            ("simulated_seconds", self.simulated_seconds),
            ("realtime_budget_s", self.realtime_budget_s),
            ("proximity_radius_px", self.proximity_radius_px),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }

        self.surface_size()?;

        let steps = self.simulated_seconds / self.step_interval_s;
        if steps > MAX_TARGET_STEPS as f64 {
            return Err(ConfigError::OutOfRange {
                name: "target_steps",
                value: steps,
                min: 0.0,
                max: MAX_TARGET_STEPS as f64,
            });
        }

        // A tool wider than one side just finishes that sweep on its first turn.
        if self.tool_width_m > self.width_m.max(self.height_m) {
            return Err(ConfigError::ToolTooWide {
                tool_width: self.tool_width_m,
                width: self.width_m,
                height: self.height_m,
            });
        }

        Ok(())
    }
}
