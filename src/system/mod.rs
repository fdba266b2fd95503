//! # System Module
//!
//! Host side effects around the pipeline.
//!
//! This module handles:
//! - Loading the `uinput` kernel module when `/dev/uinput` is missing
//! - Hiding the physical joystick from other programs, so games do not see
//!   both the physical and the virtual device
//! - Stopping X from using the virtual joystick as a mouse
//! - Dropping root privileges once every device is open
//! - Putting the physical joystick back on exit
//!
//! Only the privilege drop is fatal when it fails; everything else is
//! reported as a warning.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{JoystickShiftError, Result};

/// uinput control device
pub const UINPUT_PATH: &str = "/dev/uinput";

/// Which host side effects to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSettings {
    pub hide_physical_device: bool,
    pub disable_xinput: bool,
    pub drop_privileges: bool,
    pub user: String,
    pub group: String,
}

impl SystemSettings {
    /// Settings that touch nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            hide_physical_device: false,
            disable_xinput: false,
            drop_privileges: false,
            user: String::new(),
            group: String::new(),
        }
    }
}

/// Setup and teardown of the host around a pumping session.
#[cfg_attr(test, mockall::automock)]
pub trait Environment {
    /// Called once both devices are open, before pumping.
    fn prepare(&mut self, physical_path: &str, virtual_name: &str) -> Result<()>;

    /// Called after pumping stops, whatever the reason.
    fn restore(&mut self, physical_path: &str);
}

/// [`Environment`] acting on the local machine.
#[derive(Debug)]
pub struct SystemEnvironment {
    settings: SystemSettings,
    saved_mode: Option<u32>,
}

impl SystemEnvironment {
    #[must_use]
    pub fn new(settings: SystemSettings) -> Self {
        Self {
            settings,
            saved_mode: None,
        }
    }

    /// Permission bits the physical device had before it was hidden.
    #[must_use]
    pub fn saved_mode(&self) -> Option<u32> {
        self.saved_mode
    }

    fn hide_physical_device(&mut self, path: &Path) -> std::io::Result<()> {
        let mode = fs::metadata(path)?.permissions().mode();
        fs::set_permissions(path, fs::Permissions::from_mode(mode & !0o777))?;
        self.saved_mode = Some(mode);
        Ok(())
    }
}

impl Environment for SystemEnvironment {
    fn prepare(&mut self, physical_path: &str, virtual_name: &str) -> Result<()> {
        if self.settings.hide_physical_device {
            info!("Making physical joystick unusable by other programs");
            if let Err(e) = self.hide_physical_device(Path::new(physical_path)) {
                warn!(
                    "Failed to hide {}: {}. Move the device file out of the way yourself, \
                     or games may receive duplicate events",
                    physical_path, e
                );
            }
        }

        if self.settings.disable_xinput {
            debug!("Preventing X from using the virtual joystick as a mouse");
            if let Err(e) = run_command("xinput", &["set-prop", virtual_name, "Device Enabled", "0"]) {
                warn!("xinput set-prop failed: {}", e);
            }
        }

        if self.settings.drop_privileges {
            drop_privileges(&self.settings.user, &self.settings.group)?;
        }

        Ok(())
    }

    fn restore(&mut self, physical_path: &str) {
        let Some(mode) = self.saved_mode.take() else {
            return;
        };

        info!("Making physical joystick usable by other programs");
        if let Err(e) = fs::set_permissions(physical_path, fs::Permissions::from_mode(mode & 0o7777)) {
            // Expected once root privileges are gone
            warn!(
                "Could not restore permissions of {} ({}); it stays unusable by other programs until re-plugged",
                physical_path, e
            );
        }
    }
}

/// Load the `uinput` kernel module unless its device node already exists.
///
/// A failure is only logged: creating the virtual device reports the
/// actual problem.
pub fn load_uinput_module() {
    if Path::new(UINPUT_PATH).exists() {
        debug!("{} present, not loading uinput", UINPUT_PATH);
        return;
    }

    info!("Loading kernel module uinput");
    if let Err(e) = run_command("modprobe", &["uinput"]) {
        warn!("Failed to load uinput: {}", e);
    }
}

/// Switch to `user`:`group`, clear supplementary groups and tighten the
/// umask. A no-op when not running as root.
///
/// # Errors
///
/// Returns `System` if the user or group does not exist or a switch fails.
pub fn drop_privileges(user: &str, group: &str) -> Result<()> {
    use nix::sys::stat::{umask, Mode};
    use nix::unistd::{geteuid, setgid, setgroups, setuid, Group, User};

    if !geteuid().is_root() {
        debug!("Not running as root, keeping current privileges");
        return Ok(());
    }

    info!("Dropping root privileges to {}:{}", user, group);
    let system_err = |what: &str, e: nix::Error| JoystickShiftError::System(format!("{}: {}", what, e));

    let uid = User::from_name(user)
        .map_err(|e| system_err("user lookup", e))?
        .ok_or_else(|| JoystickShiftError::System(format!("unknown user {}", user)))?
        .uid;
    let gid = Group::from_name(group)
        .map_err(|e| system_err("group lookup", e))?
        .ok_or_else(|| JoystickShiftError::System(format!("unknown group {}", group)))?
        .gid;

    setgroups(&[]).map_err(|e| system_err("setgroups", e))?;
    setgid(gid).map_err(|e| system_err("setgid", e))?;
    setuid(uid).map_err(|e| system_err("setuid", e))?;
    umask(Mode::from_bits_truncate(0o077));

    Ok(())
}

/// Run a command, capturing its output.
fn run_command(program: &str, args: &[&str]) -> std::result::Result<(), String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("{}: {}", program, e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
