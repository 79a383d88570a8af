//! Drive Command Module
//!
//! Skid-steer mixing of the two control scalars into independent wheel speeds.
//! A [`DriveCommand`] is derived every poll iteration and never stored beyond
//! "most recent".

/// Default scale applied to both wheels; higher is faster but harder to control
pub const DEFAULT_SPEED_FACTOR: f32 = 0.7;

/// Left and right wheel speeds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveCommand {
    pub left: f32,
    pub right: f32,
}

impl DriveCommand {
    /// Both wheels stopped
    pub const STOP: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    #[cfg(test)]
    pub fn is_stop(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Mixes drive and steering into wheel speeds
///
/// `steering` is a percentage bias: positive shifts power to the left wheel
/// (turns right), negative to the right wheel. Out-of-range steering is not
/// clamped here; the producer clamps before encoding.
///
/// ```
/// use tilt_teleop::system::drive_command::{mix, DriveCommand};
/// assert_eq!(mix(100, 50, 0.7), DriveCommand { left: 105.0, right: 35.0 });
/// ```
pub fn mix(drive: i16, steering: i16, speed_factor: f32) -> DriveCommand {
    let drive = f32::from(drive);
    let bias = drive * (f32::from(steering) / 100.0);
    DriveCommand {
        left: (drive + bias) * speed_factor,
        right: (drive - bias) * speed_factor,
    }
}
