//! # Joystick Record Codec
//!
//! Decodes the fixed-size records read from a Linux joystick device
//! (`/dev/input/jsN`) into [`Event`]s.
//!
//! ## Record Layout
//!
//! | Offset | Size | Field | Notes |
//! |--------|------|-------|-------|
//! | 0 | 4 | time | Milliseconds, ignored |
//! | 4 | 2 | value | Signed, little-endian |
//! | 6 | 1 | type | 1 = button, 2 = axis, anything else is skipped |
//! | 7 | 1 | number | Control index |
//!
//! The kernel ORs `0x80` into the type of the synthetic events it sends
//! right after the device is opened. Those tags are not recognized and are
//! skipped like any other unknown tag.

use bytes::{Buf, BufMut};
use serde::Deserialize;

use super::event::{Event, EventKind};

/// Size of one record on the wire.
pub const RECORD_SIZE: usize = 8;

/// Record type tag for button events.
pub const JS_EVENT_BUTTON: u8 = 0x01;

/// Record type tag for axis events.
pub const JS_EVENT_AXIS: u8 = 0x02;

/// Flag the kernel sets on initial-state records.
pub const JS_EVENT_INIT: u8 = 0x80;

/// Which byte of the 16-bit value field carries an axis position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisByte {
    /// Low byte reinterpreted as `i8`.
    #[default]
    Low,
    /// High byte reinterpreted as `i8`, i.e. the full range scaled down by 256.
    High,
}

/// Stateless decoder/encoder for joystick records.
///
/// # Examples
///
/// ```
/// use joystick_shift::joystick::codec::RecordCodec;
/// use joystick_shift::joystick::event::Event;
///
/// let codec = RecordCodec::default();
/// let record = [0, 0, 0, 0, 0xCE, 0xFF, 0x02, 3];
/// assert_eq!(codec.decode(&record), Some(Event::axis(3, -50)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCodec {
    axis_byte: AxisByte,
}

impl RecordCodec {
    #[must_use]
    pub fn new(axis_byte: AxisByte) -> Self {
        Self { axis_byte }
    }

    #[must_use]
    pub fn axis_byte(&self) -> AxisByte {
        self.axis_byte
    }

    /// Decode one record.
    ///
    /// Returns `None` for records whose type tag is neither button nor axis.
    /// That is not an error: such records are expected on a live device.
    #[must_use]
    pub fn decode(&self, record: &[u8; RECORD_SIZE]) -> Option<Event> {
        let mut buf = &record[..];
        let _time = buf.get_u32_le();
        let value = buf.get_i16_le();
        let tag = buf.get_u8();
        let number = u16::from(buf.get_u8());

        let [low, high] = value.to_le_bytes();
        match tag {
            JS_EVENT_BUTTON => Some(Event::button(number, i32::from(low != 0))),
            JS_EVENT_AXIS => {
                let byte = match self.axis_byte {
                    AxisByte::Low => low,
                    AxisByte::High => high,
                };
                Some(Event::axis(number, i32::from(byte as i8)))
            }
            _ => None,
        }
    }

    /// Encode an event into a record with the given timestamp.
    ///
    /// Values are truncated to a signed byte and placed where [`decode`]
    /// reads them back. Only the low 8 bits of `id` fit in the record.
    ///
    /// [`decode`]: RecordCodec::decode
    #[must_use]
    pub fn encode(&self, event: &Event, time: u32) -> [u8; RECORD_SIZE] {
        let byte = i16::from(event.value as i8);
        let (tag, value) = match event.kind {
            EventKind::Button => (JS_EVENT_BUTTON, byte & 0x00FF),
            EventKind::Axis => match self.axis_byte {
                AxisByte::Low => (JS_EVENT_AXIS, byte),
                AxisByte::High => (JS_EVENT_AXIS, byte << 8),
            },
        };

        let mut record = [0u8; RECORD_SIZE];
        let mut buf = &mut record[..];
        buf.put_u32_le(time);
        buf.put_i16_le(value);
        buf.put_u8(tag);
        buf.put_u8(event.id as u8);
        record
    }
}
