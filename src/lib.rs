//! # Joystick Shift Library
//!
//! Turn one joystick button into a shift key.
//!
//! This library reads a Linux joystick device, remaps every control while
//! the shift button is engaged, and republishes the result on a virtual
//! uinput joystick with twice as many axes and buttons.

pub mod config;
pub mod error;
pub mod joystick;
pub mod mapper;
pub mod pump;
pub mod session;
pub mod system;
pub mod virtual_device;
