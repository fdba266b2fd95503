//! # Shift Mapper
//!
//! Turns one physical button into a shift key for the rest of the joystick.
//!
//! While shift is active, every shiftable control is reported with its id
//! moved up by a per-kind offset, so the virtual device sees it as a
//! different control. With offsets equal to the physical axis and button
//! counts, the shifted controls land in the upper half of a virtual device
//! with twice as many of each.
//!
//! ## Modes
//!
//! | Mode | Shift press | Shift release |
//! |------|-------------|---------------|
//! | Momentary (`toggle = false`) | flips state | flips state |
//! | Toggle (`toggle = true`) | flips state | ignored |
//!
//! Momentary mode follows the button level as long as presses and releases
//! arrive in pairs.
//!
//! ## Usage
//!
//! ```
//! use joystick_shift::joystick::event::Event;
//! use joystick_shift::mapper::EventTransform;
//! use joystick_shift::mapper::shift::{ShiftConfig, ShiftMapper};
//!
//! // 2 axes, 2 buttons, button 0 is shift
//! let mut mapper = ShiftMapper::new(ShiftConfig::for_device(2, 2, 0))?;
//!
//! assert_eq!(mapper.map(Event::button(0, 1)), None); // shift pressed
//! assert_eq!(mapper.map(Event::button(1, 1)), Some(Event::button(3, 1)));
//! assert_eq!(mapper.map(Event::axis(0, 50)), Some(Event::axis(2, 50)));
//! assert_eq!(mapper.map(Event::button(0, 0)), None); // shift released
//! assert_eq!(mapper.map(Event::button(1, 1)), Some(Event::button(1, 1)));
//! # Ok::<(), joystick_shift::error::JoystickShiftError>(())
//! ```

use std::collections::HashSet;

use tracing::info;

use super::EventTransform;
use crate::error::{JoystickShiftError, Result};
use crate::joystick::event::{Event, EventKind};

/// Shift behaviour, fixed when the mapper is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftConfig {
    /// Buttons that move while shift is active.
    pub shiftable_buttons: HashSet<u16>,
    /// Axes that move while shift is active.
    pub shiftable_axes: HashSet<u16>,
    /// Added to a shifted button id.
    pub button_offset: u16,
    /// Added to a shifted axis id.
    pub axis_offset: u16,
    /// The button acting as shift.
    pub shift_button: u16,
    /// Latch on press (CAPS LOCK) instead of following the button (SHIFT).
    pub toggle: bool,
    /// Forward the shift button's own events downstream.
    pub emit_shift_control_events: bool,
}

impl ShiftConfig {
    /// Shift every control of a joystick with `n_axes` axes and `n_buttons`
    /// buttons into the upper half of a device twice its size.
    ///
    /// The shift button itself is excluded from the shiftable buttons.
    /// Momentary mode, shift button events suppressed.
    #[must_use]
    pub fn for_device(n_axes: u16, n_buttons: u16, shift_button: u16) -> Self {
        Self {
            shiftable_buttons: (0..n_buttons).filter(|&b| b != shift_button).collect(),
            shiftable_axes: (0..n_axes).collect(),
            button_offset: n_buttons,
            axis_offset: n_axes,
            shift_button,
            toggle: false,
            emit_shift_control_events: false,
        }
    }

    /// Builder-style toggle mode switch.
    #[must_use]
    pub fn with_toggle(mut self, toggle: bool) -> Self {
        self.toggle = toggle;
        self
    }

    /// Builder-style switch for forwarding the shift button's own events.
    #[must_use]
    pub fn with_shift_control_events(mut self, emit: bool) -> Self {
        self.emit_shift_control_events = emit;
        self
    }

    fn shiftable(&self, kind: EventKind) -> &HashSet<u16> {
        match kind {
            EventKind::Button => &self.shiftable_buttons,
            EventKind::Axis => &self.shiftable_axes,
        }
    }

    fn offset(&self, kind: EventKind) -> u16 {
        match kind {
            EventKind::Button => self.button_offset,
            EventKind::Axis => self.axis_offset,
        }
    }
}

/// Stateful shift transform.
///
/// Owns the shift state. The state starts inactive and only changes through
/// [`EventTransform::map`].
#[derive(Debug)]
pub struct ShiftMapper {
    config: ShiftConfig,
    active: bool,
}

impl ShiftMapper {
    /// Build a mapper.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMapping` if the shift button is itself shiftable, or
    /// if a shiftable id plus its offset does not fit in a `u16`.
    pub fn new(config: ShiftConfig) -> Result<Self> {
        if config.shiftable_buttons.contains(&config.shift_button) {
            return Err(JoystickShiftError::InvalidMapping(format!(
                "shift button {} cannot also be shiftable",
                config.shift_button
            )));
        }

        for kind in [EventKind::Button, EventKind::Axis] {
            let offset = config.offset(kind);
            if let Some(&id) = config
                .shiftable(kind)
                .iter()
                .find(|&&id| id.checked_add(offset).is_none())
            {
                return Err(JoystickShiftError::InvalidMapping(format!(
                    "{} {} shifted by {} is out of range",
                    kind, id, offset
                )));
            }
        }

        Ok(Self {
            config,
            active: false,
        })
    }

    /// Whether shift is currently engaged.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn is_shift_control(&self, event: &Event) -> bool {
        event.kind == EventKind::Button && event.id == self.config.shift_button
    }
}

impl EventTransform for ShiftMapper {
    fn map(&mut self, event: Event) -> Option<Event> {
        if self.is_shift_control(&event) {
            if !self.config.toggle || event.is_press() {
                self.active = !self.active;
                info!("Shift {}", if self.active { "on" } else { "off" });
            }
            if !self.config.emit_shift_control_events {
                return None;
            }
        }

        if self.active && self.config.shiftable(event.kind).contains(&event.id) {
            // Checked at construction
            return Some(event.with_id(event.id + self.config.offset(event.kind)));
        }

        Some(event)
    }
}
