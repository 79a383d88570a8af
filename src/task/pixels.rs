//! Pixel Overlay Task
//!
//! A lit segment sweeps end to end across the light strip and back, for as long
//! as the pixel overlay is toggled on. The toggle is only looked at between
//! frames, so a frame is never torn. Toggling off clears the strip.

use crate::system::event::PixelGate;
use crate::system::hardware::{PixelStrip, Rgb};
use embassy_time::{Duration, Timer};

/// Position and direction of the bouncing segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BouncingBar {
    width: usize,
    position: usize,
    forward: bool,
}

impl BouncingBar {
    pub const fn new(width: usize) -> Self {
        Self {
            width,
            position: 0,
            forward: true,
        }
    }

    /// Back to the start of the strip, moving forward
    pub fn reset(&mut self) {
        self.position = 0;
        self.forward = true;
    }

    /// Index of the first lit pixel
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves one pixel, turning around at either end of a strip of `len` pixels
    pub fn advance(&mut self, len: usize) {
        let last = len.saturating_sub(self.width);
        if last == 0 {
            self.position = 0;
            return;
        }
        self.position = self.position.min(last);
        if self.forward {
            if self.position == last {
                self.forward = false;
                self.position -= 1;
            } else {
                self.position += 1;
            }
        } else if self.position == 0 {
            self.forward = true;
            self.position += 1;
        } else {
            self.position -= 1;
        }
    }

    /// Whether pixel `index` belongs to the lit segment
    pub fn is_lit(&self, index: usize) -> bool {
        index >= self.position && index < self.position + self.width
    }

    /// Writes the current frame into the strip buffer; does not latch it
    pub fn render<S: PixelStrip>(&self, strip: &mut S, color: Rgb) {
        for i in 0..strip.len() {
            strip.set_pixel(i, if self.is_lit(i) { color } else { Rgb::OFF });
        }
    }
}

/// Runs the bouncing bar whenever the pixel overlay is toggled on
pub async fn pixels<S: PixelStrip>(
    gate: &PixelGate,
    strip: &mut S,
    step: Duration,
    width: usize,
    color: Rgb,
) {
    let mut bar = BouncingBar::new(width);
    strip.clear_all();
    strip.show();

    loop {
        gate.wait().await;
        info!("pixels on");
        bar.reset();

        loop {
            bar.render(strip, color);
            strip.show();
            Timer::after(step).await;
            if gate.take().is_some() {
                break;
            }
            bar.advance(strip.len());
        }

        info!("pixels off");
        strip.clear_all();
        strip.show();
    }
}
