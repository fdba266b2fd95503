//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; a missing section takes its defaults.
//! Command-line values overwrite fields after loading, before
//! [`Config::validate`] runs.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{JoystickShiftError, Result};
use crate::joystick::codec::AxisByte;
use crate::mapper::shift::ShiftConfig;
use crate::system::SystemSettings;
use crate::virtual_device::{VirtualDeviceDescriptor, DEFAULT_DEVICE_NAME};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub shift: ShiftSection,
    #[serde(default)]
    pub virtual_device: VirtualDeviceConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

/// Physical joystick configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_device_path")]
    pub path: String,

    #[serde(default = "default_axes")]
    pub axes: u16,

    #[serde(default = "default_buttons")]
    pub buttons: u16,

    #[serde(default)]
    pub axis_byte: AxisByte,
}

/// Shift behaviour configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ShiftSection {
    /// Required, either here or on the command line
    #[serde(default)]
    pub button: Option<u16>,

    #[serde(default)]
    pub toggle: bool,

    #[serde(default)]
    pub emit_shift_events: bool,
}

/// Virtual joystick configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VirtualDeviceConfig {
    #[serde(default = "default_virtual_name")]
    pub name: String,

    #[serde(default = "default_true")]
    pub load_uinput_module: bool,
}

/// Host environment configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_true")]
    pub hide_physical_device: bool,

    #[serde(default = "default_true")]
    pub disable_xinput: bool,

    #[serde(default = "default_true")]
    pub drop_privileges: bool,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_group")]
    pub group: String,
}

// Default value functions
fn default_device_path() -> String { "/dev/input/js0".to_string() }
fn default_axes() -> u16 { 6 }
fn default_buttons() -> u16 { 16 }

fn default_virtual_name() -> String { DEFAULT_DEVICE_NAME.to_string() }
fn default_true() -> bool { true }

fn default_user() -> String { "nobody".to_string() }
fn default_group() -> String { "nogroup".to_string() }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            axes: default_axes(),
            buttons: default_buttons(),
            axis_byte: AxisByte::default(),
        }
    }
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            name: default_virtual_name(),
            load_uinput_module: default_true(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            hide_physical_device: default_true(),
            disable_xinput: default_true(),
            drop_privileges: default_true(),
            user: default_user(),
            group: default_group(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> JoystickShiftError {
    JoystickShiftError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// The result is not validated yet, since command-line overrides may
    /// still fill in required values.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_shift::config::Config;
    ///
    /// let config = Config::load("joystick-shift.toml")?;
    /// config.validate()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Turn off every host environment side effect.
    pub fn disable_system_setup(&mut self) {
        self.virtual_device.load_uinput_module = false;
        self.system.hide_physical_device = false;
        self.system.disable_xinput = false;
        self.system.drop_privileges = false;
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is missing or out of range
    pub fn validate(&self) -> Result<()> {
        if self.device.path.is_empty() {
            return Err(invalid("device path cannot be empty"));
        }

        // Doubled counts must fit the virtual device limits
        if self.device.axes == 0 || self.device.axes > 20 {
            return Err(invalid("axes must be between 1 and 20"));
        }

        if self.device.buttons == 0 || self.device.buttons > 256 {
            return Err(invalid("buttons must be between 1 and 256"));
        }

        match self.shift.button {
            None => return Err(invalid("shift button must be set")),
            // One past the last physical button is accepted
            Some(button) if button > self.device.buttons => {
                return Err(invalid(format!(
                    "shift button {} is out of range (must be 0-{})",
                    button, self.device.buttons
                )));
            }
            Some(_) => {}
        }

        if self.virtual_device.name.is_empty() {
            return Err(invalid("virtual device name cannot be empty"));
        }

        if self.system.drop_privileges
            && (self.system.user.is_empty() || self.system.group.is_empty())
        {
            return Err(invalid("user and group cannot be empty when dropping privileges"));
        }

        Ok(())
    }

    /// Shift mapper configuration for the physical device.
    ///
    /// # Errors
    ///
    /// Returns error if no shift button is configured
    pub fn shift_config(&self) -> Result<ShiftConfig> {
        let button = self
            .shift
            .button
            .ok_or_else(|| invalid("shift button must be set"))?;

        Ok(ShiftConfig::for_device(self.device.axes, self.device.buttons, button)
            .with_toggle(self.shift.toggle)
            .with_shift_control_events(self.shift.emit_shift_events))
    }

    /// Descriptor of the doubled virtual joystick.
    pub fn virtual_descriptor(&self) -> Result<VirtualDeviceDescriptor> {
        VirtualDeviceDescriptor::doubled(
            &self.virtual_device.name,
            self.device.axes,
            self.device.buttons,
        )
    }

    /// Environment settings for the host setup collaborator.
    pub fn system_settings(&self) -> SystemSettings {
        SystemSettings {
            hide_physical_device: self.system.hide_physical_device,
            disable_xinput: self.system.disable_xinput,
            drop_privileges: self.system.drop_privileges,
            user: self.system.user.clone(),
            group: self.system.group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::shift::ShiftMapper;

    fn create_valid_config() -> Config {
        let mut config = Config::default();
        config.shift.button = Some(4);
        config
    }

    #[test]
    fn test_default_config_needs_shift_button() {
        assert!(Config::default().validate().is_err());
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[device]
path = "/dev/input/js1"
axes = 4
axis_byte = "high"

[shift]
button = 2
toggle = true

[virtual_device]
name = "shifted stick"

[system]
drop_privileges = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.path, "/dev/input/js1");
        assert_eq!(config.device.axes, 4);
        assert_eq!(config.device.buttons, 16);
        assert_eq!(config.device.axis_byte, AxisByte::High);
        assert_eq!(config.shift.button, Some(2));
        assert!(config.shift.toggle);
        assert!(!config.shift.emit_shift_events);
        assert_eq!(config.virtual_device.name, "shifted stick");
        assert!(config.virtual_device.load_uinput_module);
        assert!(!config.system.drop_privileges);
        assert!(config.system.hide_physical_device);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.device.path, "/dev/input/js0");
        assert_eq!(config.shift.button, None);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/joystick-shift.toml");
        assert!(matches!(result, Err(JoystickShiftError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;

        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(b"[device]\naxes = \"six\"\n").unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(matches!(result, Err(JoystickShiftError::Config(_))));
    }

    #[test]
    fn test_invalid_axis_byte() {
        let result: std::result::Result<Config, _> = toml::from_str("[device]\naxis_byte = \"middle\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_device_path() {
        let mut config = create_valid_config();
        config.device.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_axes_range() {
        let mut config = create_valid_config();
        config.device.axes = 0;
        assert!(config.validate().is_err());
        config.device.axes = 21;
        assert!(config.validate().is_err());
        config.device.axes = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_buttons_range() {
        let mut config = create_valid_config();
        config.device.buttons = 0;
        assert!(config.validate().is_err());
        config.device.buttons = 257;
        assert!(config.validate().is_err());
        config.device.buttons = 256;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shift_button_out_of_range() {
        let mut config = create_valid_config();
        config.shift.button = Some(17);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("0-16"));

        config.shift.button = Some(15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shift_button_equal_to_button_count() {
        let mut config = create_valid_config();
        config.shift.button = Some(16);
        assert!(config.validate().is_ok());

        let shift = config.shift_config().unwrap();
        assert_eq!(shift.shiftable_buttons.len(), 16);
        assert!(!shift.shiftable_buttons.contains(&16));
        assert!(ShiftMapper::new(shift).is_ok());
    }

    #[test]
    fn test_empty_virtual_name() {
        let mut config = create_valid_config();
        config.virtual_device.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_user_only_matters_when_dropping() {
        let mut config = create_valid_config();
        config.system.user = String::new();
        assert!(config.validate().is_err());

        config.system.drop_privileges = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disable_system_setup() {
        let mut config = create_valid_config();
        config.disable_system_setup();
        assert!(!config.virtual_device.load_uinput_module);
        assert!(!config.system.hide_physical_device);
        assert!(!config.system.disable_xinput);
        assert!(!config.system.drop_privileges);
    }

    #[test]
    fn test_shift_config_from_config() {
        let mut config = create_valid_config();
        config.shift.toggle = true;

        let shift = config.shift_config().unwrap();
        assert_eq!(shift.shift_button, 4);
        assert_eq!(shift.button_offset, 16);
        assert_eq!(shift.axis_offset, 6);
        assert!(shift.toggle);
        assert!(!shift.emit_shift_control_events);
        assert!(!shift.shiftable_buttons.contains(&4));

        assert!(Config::default().shift_config().is_err());
    }

    #[test]
    fn test_virtual_descriptor_from_config() {
        let descriptor = create_valid_config().virtual_descriptor().unwrap();
        assert_eq!(descriptor.name, "joystick_shift");
        assert_eq!(descriptor.axis_count, 12);
        assert_eq!(descriptor.button_count, 32);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_device_path(), "/dev/input/js0");
        assert_eq!(default_axes(), 6);
        assert_eq!(default_buttons(), 16);
        assert_eq!(default_virtual_name(), "joystick_shift");
        assert_eq!(default_user(), "nobody");
        assert_eq!(default_group(), "nogroup");
    }
}
