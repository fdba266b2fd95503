//! # Physical Joystick Device
//!
//! Opens a Linux joystick device file (`/dev/input/jsN`) for non-blocking
//! reads and exposes it as a tokio [`AsyncRead`] byte stream.
//!
//! The device is registered with the tokio reactor instead of being read on
//! a blocking thread, so a stalled joystick never prevents a Ctrl+C from
//! shutting the process down.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::info;

use crate::error::{JoystickShiftError, Result};

/// Handle to an open physical joystick.
pub struct PhysicalJoystick {
    inner: AsyncFd<File>,
    device_path: String,
}

impl std::fmt::Debug for PhysicalJoystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalJoystick")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl PhysicalJoystick {
    /// Open the joystick device at `path`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DeviceOpen` if the file cannot be opened or registered with
    /// the reactor (e.g. the path does not exist, or permission is denied).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_shift::joystick::device::PhysicalJoystick;
    ///
    /// # async fn run() -> joystick_shift::error::Result<()> {
    /// let joystick = PhysicalJoystick::open("/dev/input/js0")?;
    /// println!("Reading from {}", joystick.device_path());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device_path = path.to_string_lossy().to_string();

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| JoystickShiftError::DeviceOpen {
                path: device_path.clone(),
                source,
            })?;

        let inner = AsyncFd::new(file).map_err(|source| JoystickShiftError::DeviceOpen {
            path: device_path.clone(),
            source,
        })?;

        info!("Opened physical joystick at {}", device_path);
        Ok(Self { inner, device_path })
    }

    /// Path the joystick was opened from.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl AsyncRead for PhysicalJoystick {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;

            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| {
                let mut file = inner.get_ref();
                file.read(unfilled)
            }) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                // Spurious readiness, wait again
                Err(_would_block) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_open_missing_device_fails() {
        let err = PhysicalJoystick::open("/dev/input/js_does_not_exist").unwrap_err();
        match err {
            JoystickShiftError::DeviceOpen { path, source } => {
                assert_eq!(path, "/dev/input/js_does_not_exist");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("Expected DeviceOpen error, got: {:?}", other),
        }
    }

    // Integration test - only runs with real hardware
    #[tokio::test]
    #[ignore]
    async fn test_read_record_with_real_hardware() {
        // Opening a joystick makes the kernel send initial-state records
        let mut joystick = PhysicalJoystick::open("/dev/input/js0").expect("Joystick not found");
        let mut record = [0u8; crate::joystick::codec::RECORD_SIZE];
        joystick.read_exact(&mut record).await.unwrap();
        println!("Received record: {:02X?}", record);
    }
}
