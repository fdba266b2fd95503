//! # Error Types
//!
//! Custom error types for Joystick Shift using `thiserror`.

use thiserror::Error;

/// Main error type for Joystick Shift
#[derive(Debug, Error)]
pub enum JoystickShiftError {
    /// Configuration errors (TOML parsing and validation)
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Shift mapping rejected at construction
    #[error("Invalid shift mapping: {0}")]
    InvalidMapping(String),

    /// Physical joystick could not be opened
    #[error("Failed to open joystick device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Virtual (uinput) device errors
    #[error("Virtual device error: {0}")]
    VirtualDevice(String),

    /// The physical joystick stream ended
    #[error("Joystick device closed its event stream")]
    EndOfStream,

    /// Fatal environment setup errors
    #[error("System setup error: {0}")]
    System(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joystick Shift
pub type Result<T> = std::result::Result<T, JoystickShiftError>;
