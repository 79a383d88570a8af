//! Tilt tele-operation core
//!
//! A hand-held controller samples tilt and buttons and publishes them as four
//! signed 16-bit channels; a two-wheeled robot discovers the controller, polls
//! those channels, mixes them into left/right wheel speeds and runs a horn and a
//! light-bar animation alongside the drive loop on one cooperative executor.
//!
//! Hardware (wheels, indicator, buzzer, light strip, tilt sensor) and the wireless
//! transport are capability traits; see [`system::hardware`] and
//! [`system::transport`]. [`system::loopback`] provides an in-memory transport.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// This must go first so the macros are visible to every other module.
mod fmt;

/// Core data, pure logic and capability interfaces
pub mod system;
/// Async routines for both roles and the scheduler that runs them
pub mod task;

#[cfg(test)]
mod testing;
