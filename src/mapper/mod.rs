//! # Event Mapper Module
//!
//! Transforms applied to decoded joystick events before they reach the
//! virtual device.
//!
//! Every transform receives one [`Event`] and produces zero or one event.
//! Transforms compose by chaining: the output of the first feeds the second,
//! and a dropped event stops the chain.
//!
//! ## Usage
//!
//! ```
//! use joystick_shift::joystick::event::Event;
//! use joystick_shift::mapper::{from_fn, EventTransform, IdentityTransform};
//!
//! let invert = from_fn(|e: Event| Some(Event { value: -e.value, ..e }));
//! let mut chain = IdentityTransform.then(invert);
//!
//! assert_eq!(chain.map(Event::axis(0, 10)), Some(Event::axis(0, -10)));
//! ```

pub mod shift;

use crate::joystick::event::Event;

/// Receive an event, optionally produce an event downstream.
pub trait EventTransform {
    /// Map one event. `None` drops it.
    fn map(&mut self, event: Event) -> Option<Event>;

    /// Chain `next` after this transform.
    fn then<T>(self, next: T) -> Chain<Self, T>
    where
        Self: Sized,
        T: EventTransform,
    {
        Chain { first: self, second: next }
    }
}

impl<T: EventTransform + ?Sized> EventTransform for &mut T {
    fn map(&mut self, event: Event) -> Option<Event> {
        (**self).map(event)
    }
}

/// Forwards every event unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityTransform;

impl EventTransform for IdentityTransform {
    fn map(&mut self, event: Event) -> Option<Event> {
        Some(event)
    }
}

/// Two transforms applied in sequence. Built with [`EventTransform::then`].
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: EventTransform, B: EventTransform> EventTransform for Chain<A, B> {
    fn map(&mut self, event: Event) -> Option<Event> {
        self.first.map(event).and_then(|e| self.second.map(e))
    }
}

/// Transform backed by a closure. Built with [`from_fn`].
#[derive(Debug, Clone)]
pub struct FnTransform<F>(F);

/// Wrap a closure as a transform.
pub fn from_fn<F>(f: F) -> FnTransform<F>
where
    F: FnMut(Event) -> Option<Event>,
{
    FnTransform(f)
}

impl<F> EventTransform for FnTransform<F>
where
    F: FnMut(Event) -> Option<Event>,
{
    fn map(&mut self, event: Event) -> Option<Event> {
        (self.0)(event)
    }
}
