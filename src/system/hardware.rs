//! Hardware capability interfaces
//!
//! The motor driver, status LEDs, buzzer, light strip and tilt sensor are
//! external collaborators. The core only writes to actuators and never reads
//! them back, and treats every call as synchronous and infallible.

/// An RGB colour, each channel 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Two independently driven wheels
pub trait Wheels {
    /// Sets both wheel speeds at once; 0.0 stops a wheel
    fn set_wheel_speeds(&mut self, left: f32, right: f32);
}

/// The robot's status colour
pub trait Indicator {
    /// Shows `color` until the next call
    fn set_indicator_color(&mut self, color: Rgb);
}

/// Buzzer
pub trait Tone {
    /// Starts sounding `pitch` Hz without blocking; 0 is silence
    fn play_note(&mut self, pitch: u16);
}

/// Addressable linear light strip
pub trait PixelStrip {
    /// Number of pixels on the strip
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Buffers `color` for pixel `index`; out-of-range indices are ignored
    fn set_pixel(&mut self, index: usize, color: Rgb);
    /// Buffers every pixel as off
    fn clear_all(&mut self);
    /// Latches the buffered colours onto the strip
    fn show(&mut self);
}

/// Button levels at the time of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons {
    pub horn: bool,
    pub pixels: bool,
}

/// One reading of the controller's inputs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionSample {
    /// Sideways acceleration in g, positive to the right
    pub tilt_x: f32,
    /// Forward acceleration in g, positive forward
    pub tilt_y: f32,
    pub buttons: Buttons,
}

/// Tilt sensor and buttons on the controller
pub trait MotionSource {
    /// Reads tilt and button levels now
    fn sample(&mut self) -> MotionSample;
}

/// The controller's single status LED
pub trait StatusLed {
    /// Turns the LED on or off
    fn set(&mut self, on: bool);
}
