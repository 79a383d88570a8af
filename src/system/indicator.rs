//! System Indicator Module
//!
//! Indicator colours and the fail-stop policy. Red means the robot is not being
//! driven by a live link, green means commands are arriving.

use crate::system::drive_command::DriveCommand;
use crate::system::hardware::{Indicator, Rgb, Wheels};

/// Not connected or stopped for safety
pub const FAILURE: Rgb = Rgb::new(255, 0, 0);

/// Receiving commands
pub const ACTIVE: Rgb = Rgb::new(0, 255, 0);

/// Forces the wheels to zero, then shows the failure colour
///
/// Runs at start-up and on every entry into `Disconnected`. It is synchronous
/// and unconditional; nothing else may happen between link loss and this call.
pub fn fail_stop<A: Wheels + Indicator>(actuators: &mut A) {
    apply(actuators, DriveCommand::STOP);
    actuators.set_indicator_color(FAILURE);
}

/// Applies a drive command to the wheels
pub fn apply<W: Wheels>(wheels: &mut W, command: DriveCommand) {
    wheels.set_wheel_speeds(command.left, command.right);
}
