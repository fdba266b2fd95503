//! # Joystick Event Types
//!
//! The normalized event that flows through the whole pipeline, from the
//! record decoder to the virtual device.

use std::fmt;

/// Kind of control an event belongs to.
///
/// Axis and button ids live in separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Binary control, value 0 (released) or 1 (pressed)
    Button,
    /// Analog control, value in [-128, 127]
    Axis,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Button => f.write_str("button"),
            EventKind::Axis => f.write_str("axis"),
        }
    }
}

/// A single joystick event.
///
/// `id` is a zero-based index into the namespace of `kind`. After shifting
/// it may point past the physical namespace, into the upper half of the
/// virtual device.
///
/// # Examples
///
/// ```
/// use joystick_shift::joystick::event::{Event, EventKind};
///
/// let event = Event::button(3, 1);
/// assert_eq!(event.kind, EventKind::Button);
/// assert!(event.is_press());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventKind,
    pub id: u16,
    pub value: i32,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(kind: EventKind, id: u16, value: i32) -> Self {
        Self { kind, id, value }
    }

    /// Creates a button event.
    #[must_use]
    pub fn button(id: u16, value: i32) -> Self {
        Self::new(EventKind::Button, id, value)
    }

    /// Creates an axis event.
    #[must_use]
    pub fn axis(id: u16, value: i32) -> Self {
        Self::new(EventKind::Axis, id, value)
    }

    /// Returns a copy of this event with a different id; the value is kept.
    #[must_use]
    pub fn with_id(self, id: u16) -> Self {
        Self { id, ..self }
    }

    /// True for a button event with value 1.
    #[must_use]
    pub fn is_press(&self) -> bool {
        self.kind == EventKind::Button && self.value == 1
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} = {}", self.kind, self.id, self.value)
    }
}
