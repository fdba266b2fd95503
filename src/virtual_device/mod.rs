//! # Virtual Device Module
//!
//! The output side of the pipeline: a virtual joystick registered through
//! uinput, with twice the axes and buttons of the physical one.
//!
//! ## Control Codes
//!
//! | Control | evdev Code | Range |
//! |---------|------------|-------|
//! | Axis `i` | `ABS_X + i` | -128..127 |
//! | Button `i` | `BTN_0 + i` | 0/1 |
//!
//! Every emitted event is followed by a `SYN_REPORT`.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup,
};
use tracing::{debug, info};

use crate::error::{JoystickShiftError, Result};
use crate::joystick::event::{Event, EventKind};

/// Axis value range registered on the virtual device.
pub const AXIS_MIN: i32 = -128;
/// Axis value range registered on the virtual device.
pub const AXIS_MAX: i32 = 127;

/// Highest number of axes: `ABS_X` up to, not including, `ABS_MISC`.
pub const MAX_AXES: u16 = 0x28;

/// Highest number of buttons: `BTN_0` up to `KEY_MAX`.
pub const MAX_BUTTONS: u16 = 0x2ff - 0x100 + 1;

/// Default virtual device name.
pub const DEFAULT_DEVICE_NAME: &str = "joystick_shift";

/// What a sink did with an event it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the output device
    Emitted,
    /// Outside the controls the device declares
    Dropped,
}

/// Anything that accepts remapped events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink {
    /// Emit one event.
    fn send(&mut self, event: Event) -> Result<Delivery>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn send(&mut self, event: Event) -> Result<Delivery> {
        (**self).send(event)
    }
}

/// Shape of the virtual device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDeviceDescriptor {
    pub name: String,
    pub axis_count: u16,
    pub button_count: u16,
}

impl VirtualDeviceDescriptor {
    /// Descriptor for a device with twice the controls of a physical
    /// joystick with `n_axes` axes and `n_buttons` buttons.
    ///
    /// # Errors
    ///
    /// Returns `VirtualDevice` if the doubled counts exceed what evdev can
    /// express ([`MAX_AXES`], [`MAX_BUTTONS`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use joystick_shift::virtual_device::VirtualDeviceDescriptor;
    ///
    /// let descriptor = VirtualDeviceDescriptor::doubled("shifted", 6, 16)?;
    /// assert_eq!(descriptor.axis_count, 12);
    /// assert_eq!(descriptor.button_count, 32);
    /// # Ok::<(), joystick_shift::error::JoystickShiftError>(())
    /// ```
    pub fn doubled(name: &str, n_axes: u16, n_buttons: u16) -> Result<Self> {
        let axis_count = n_axes
            .checked_mul(2)
            .filter(|&n| n <= MAX_AXES)
            .ok_or_else(|| {
                JoystickShiftError::VirtualDevice(format!(
                    "{} axes doubled exceeds the {} supported",
                    n_axes, MAX_AXES
                ))
            })?;
        let button_count = n_buttons
            .checked_mul(2)
            .filter(|&n| n <= MAX_BUTTONS)
            .ok_or_else(|| {
                JoystickShiftError::VirtualDevice(format!(
                    "{} buttons doubled exceeds the {} supported",
                    n_buttons, MAX_BUTTONS
                ))
            })?;

        Ok(Self {
            name: name.to_string(),
            axis_count,
            button_count,
        })
    }

    /// evdev axis for virtual axis `id`, if the device declares it.
    #[must_use]
    pub fn axis_code(&self, id: u16) -> Option<AbsoluteAxisType> {
        (id < self.axis_count).then(|| AbsoluteAxisType(AbsoluteAxisType::ABS_X.0 + id))
    }

    /// evdev key for virtual button `id`, if the device declares it.
    #[must_use]
    pub fn button_code(&self, id: u16) -> Option<Key> {
        (id < self.button_count).then(|| Key::new(Key::BTN_0.code() + id))
    }

    /// Translate an event into the evdev event the device should emit.
    #[must_use]
    pub fn input_event(&self, event: &Event) -> Option<InputEvent> {
        match event.kind {
            EventKind::Axis => self
                .axis_code(event.id)
                .map(|axis| InputEvent::new(EventType::ABSOLUTE, axis.0, event.value)),
            EventKind::Button => self
                .button_code(event.id)
                .map(|key| InputEvent::new(EventType::KEY, key.code(), event.value)),
        }
    }
}

/// Virtual joystick backed by a uinput device.
///
/// The device is removed from the system when this value is dropped.
pub struct VirtualJoystick {
    device: VirtualDevice,
    descriptor: VirtualDeviceDescriptor,
}

impl std::fmt::Debug for VirtualJoystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualJoystick")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl VirtualJoystick {
    /// Register a virtual joystick described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns `VirtualDevice` if `/dev/uinput` is unavailable or the kernel
    /// rejects the device.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_shift::virtual_device::{VirtualDeviceDescriptor, VirtualJoystick};
    ///
    /// let descriptor = VirtualDeviceDescriptor::doubled("joystick_shift", 6, 16)?;
    /// let joystick = VirtualJoystick::create(descriptor)?;
    /// # Ok::<(), joystick_shift::error::JoystickShiftError>(())
    /// ```
    pub fn create(descriptor: VirtualDeviceDescriptor) -> Result<Self> {
        let device = Self::build(&descriptor).map_err(|e| {
            JoystickShiftError::VirtualDevice(format!(
                "Failed to create {}: {}",
                descriptor.name, e
            ))
        })?;

        info!(
            "Created virtual joystick '{}' ({} axes, {} buttons)",
            descriptor.name, descriptor.axis_count, descriptor.button_count
        );
        Ok(Self { device, descriptor })
    }

    fn build(descriptor: &VirtualDeviceDescriptor) -> std::io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for key in (0..descriptor.button_count).filter_map(|id| descriptor.button_code(id)) {
            keys.insert(key);
        }

        let mut builder = VirtualDeviceBuilder::new()?
            .name(&descriptor.name)
            .with_keys(&keys)?;

        for axis in (0..descriptor.axis_count).filter_map(|id| descriptor.axis_code(id)) {
            let setup = UinputAbsSetup::new(axis, AbsInfo::new(0, AXIS_MIN, AXIS_MAX, 0, 0, 0));
            builder = builder.with_absolute_axis(&setup)?;
        }

        builder.build()
    }

    /// Get the device node (e.g. /dev/input/eventX), if the kernel made one.
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }

    /// Unregister the device.
    pub fn destroy(self) {
        info!("Removing virtual joystick '{}'", self.descriptor.name);
        drop(self.device);
    }
}

impl EventSink for VirtualJoystick {
    fn send(&mut self, event: Event) -> Result<Delivery> {
        let Some(input) = self.descriptor.input_event(&event) else {
            debug!("Dropping {}: outside the virtual device", event);
            return Ok(Delivery::Dropped);
        };

        debug!("Emitting {}", event);
        self.device
            .emit(&[input])
            .map_err(|e| JoystickShiftError::VirtualDevice(format!("Failed to emit {}: {}", event, e)))?;
        Ok(Delivery::Emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> VirtualDeviceDescriptor {
        VirtualDeviceDescriptor::doubled(DEFAULT_DEVICE_NAME, 6, 16).unwrap()
    }

    #[test]
    fn test_doubled_counts() {
        let d = descriptor();
        assert_eq!(d.name, "joystick_shift");
        assert_eq!(d.axis_count, 12);
        assert_eq!(d.button_count, 32);
    }

    #[test]
    fn test_doubled_limits() {
        assert!(VirtualDeviceDescriptor::doubled("x", MAX_AXES / 2, 1).is_ok());
        assert!(VirtualDeviceDescriptor::doubled("x", MAX_AXES / 2 + 1, 1).is_err());
        assert!(VirtualDeviceDescriptor::doubled("x", 1, MAX_BUTTONS / 2).is_ok());
        assert!(VirtualDeviceDescriptor::doubled("x", 1, MAX_BUTTONS / 2 + 1).is_err());
        assert!(VirtualDeviceDescriptor::doubled("x", 1, u16::MAX).is_err());
    }

    #[test]
    fn test_limit_constants() {
        assert_eq!(MAX_AXES, AbsoluteAxisType::ABS_MISC.0);
        assert_eq!(MAX_BUTTONS, 512);
        assert_eq!(AXIS_MIN, i8::MIN as i32);
        assert_eq!(AXIS_MAX, i8::MAX as i32);
    }

    #[test]
    fn test_axis_codes() {
        let d = descriptor();
        assert_eq!(d.axis_code(0), Some(AbsoluteAxisType::ABS_X));
        assert_eq!(d.axis_code(1), Some(AbsoluteAxisType::ABS_Y));
        assert_eq!(d.axis_code(11), Some(AbsoluteAxisType(11)));
        assert_eq!(d.axis_code(12), None);
    }

    #[test]
    fn test_button_codes() {
        let d = descriptor();
        assert_eq!(d.button_code(0), Some(Key::BTN_0));
        assert_eq!(d.button_code(1), Some(Key::BTN_1));
        assert_eq!(d.button_code(31), Some(Key::new(0x11f)));
        assert_eq!(d.button_code(32), None);
    }

    #[test]
    fn test_input_event_translation() {
        let d = descriptor();

        let axis = d.input_event(&Event::axis(8, -100)).unwrap();
        assert_eq!(axis.event_type(), EventType::ABSOLUTE);
        assert_eq!(axis.code(), 8);
        assert_eq!(axis.value(), -100);

        let button = d.input_event(&Event::button(20, 1)).unwrap();
        assert_eq!(button.event_type(), EventType::KEY);
        assert_eq!(button.code(), Key::BTN_0.code() + 20);
        assert_eq!(button.value(), 1);

        assert!(d.input_event(&Event::button(32, 1)).is_none());
        assert!(d.input_event(&Event::axis(12, 0)).is_none());
    }

    #[test]
    fn test_mock_sink_through_mut_reference() {
        fn forward<S: EventSink>(mut sink: S, event: Event) -> Result<Delivery> {
            sink.send(event)
        }

        let mut sink = MockEventSink::new();
        sink.expect_send()
            .withf(|e| *e == Event::button(3, 1))
            .times(1)
            .returning(|_| Ok(Delivery::Emitted));

        assert_eq!(forward(&mut sink, Event::button(3, 1)).unwrap(), Delivery::Emitted);
    }

    // Integration test - requires write access to /dev/uinput
    #[test]
    #[ignore]
    fn test_create_and_emit_with_uinput() {
        let mut joystick = VirtualJoystick::create(descriptor()).expect("uinput unavailable");
        assert!(joystick.device_path().is_some());

        assert_eq!(joystick.send(Event::axis(11, 127)).unwrap(), Delivery::Emitted);
        assert_eq!(joystick.send(Event::button(31, 1)).unwrap(), Delivery::Emitted);
        assert_eq!(joystick.send(Event::button(31, 0)).unwrap(), Delivery::Emitted);
        // Outside the device: dropped, not an error
        assert_eq!(joystick.send(Event::button(64, 1)).unwrap(), Delivery::Dropped);

        joystick.destroy();
    }
}
