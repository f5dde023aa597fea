//! Error types for parameter validation and output encoding.

use thiserror::Error;

/// Rejected simulation parameters. The stepping core itself never fails;
/// everything that can go wrong is caught here, before a run starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Parameter '{name}' is not a finite number")]
    NotFinite { name: &'static str },

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Parameter '{name}' must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Tool width {tool_width} m does not fit a {width} x {height} m surface")]
    ToolTooWide {
        tool_width: f64,
        width: f64,
        height: f64,
    },
}

#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}
