//! # Joystick Module
//!
//! Physical joystick input.
//!
//! This module handles:
//! - Opening the joystick device file for non-blocking reads
//! - The normalized `Event` type shared by the whole pipeline
//! - Decoding the device's 8-byte records into events

pub mod codec;
pub mod device;
pub mod event;
