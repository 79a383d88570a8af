//! Configuration
//!
//! Compile-time settings for both roles. Values come from the shipped hardware:
//! an IMU reporting acceleration in g on the controller and an Alvik-style
//! robot with an eight-pixel bar.

use crate::system::drive_command::DEFAULT_SPEED_FACTOR;
use crate::system::hardware::Rgb;
use crate::system::melody::{Melody, DEFAULT_TEMPO, PACMAN};
use crate::system::schema::{Schema, DEVICE_NAME};
use embassy_time::Duration;

/// Robot (consumer) settings
#[derive(Debug, Clone, Copy)]
pub struct RobotConfig {
    /// Advertised name to match, exact and case-sensitive
    pub device_name: &'static str,
    /// Optional channels the controller carries
    pub schema: Schema,
    /// Scale applied by the drive mixer
    pub speed_factor: f32,
    /// How long one discovery scan listens
    pub scan_window: Duration,
    /// Pause between a fruitless scan and the next one
    pub rescan_delay: Duration,
    /// Longest a connection attempt may take
    pub connect_timeout: Duration,
    /// Longest the lookup of one channel may take
    pub resolve_timeout: Duration,
    /// Longest a single channel read may take before the link counts as lost
    pub read_timeout: Duration,
    /// Horn tempo in bpm
    pub tempo: u32,
    pub melody: Melody,
    /// One frame of the bouncing bar
    pub pixel_step: Duration,
    /// Lit segment width in pixels
    pub bar_width: usize,
    pub bar_color: Rgb,
}

impl RobotConfig {
    pub const DEFAULT: Self = Self {
        device_name: DEVICE_NAME,
        schema: Schema::FULL,
        speed_factor: DEFAULT_SPEED_FACTOR,
        scan_window: Duration::from_millis(5_000),
        rescan_delay: Duration::from_millis(2_000),
        connect_timeout: Duration::from_millis(10_000),
        resolve_timeout: Duration::from_millis(2_000),
        read_timeout: Duration::from_millis(1_000),
        tempo: DEFAULT_TEMPO,
        melody: &PACMAN,
        pixel_step: Duration::from_millis(40),
        bar_width: 4,
        bar_color: Rgb::new(0, 64, 255),
    };
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Controller (producer) settings
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub device_name: &'static str,
    pub schema: Schema,
    /// Advertising beacon interval
    pub adv_interval: Duration,
    /// Publish cadence while a peer is connected
    pub publish_period: Duration,
    /// Multiplier from g to channel units
    pub tilt_gain: f32,
    /// Scaled values at or below this magnitude publish as 0
    pub dead_zone: f32,
    /// Pause before advertising again after a disconnect
    pub readvertise_delay: Duration,
}

impl ControllerConfig {
    pub const DEFAULT: Self = Self {
        device_name: DEVICE_NAME,
        schema: Schema::FULL,
        adv_interval: Duration::from_millis(250),
        publish_period: Duration::from_millis(100),
        tilt_gain: 100.0,
        dead_zone: 5.0,
        readvertise_delay: Duration::from_millis(100),
    };
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
