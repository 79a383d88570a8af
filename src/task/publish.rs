//! Publish Task
//!
//! Controller side: while a robot is connected, samples the tilt sensor and
//! buttons every publish period and writes the channel values, each write
//! notifying the robot. Drive and steering are written on every sample; horn
//! and pixel toggle only when their button changes, so each press and each
//! release is exactly one write.
//!
//! With no robot connected the loop suspends instead of writing.

use crate::system::codec;
use crate::system::config::ControllerConfig;
use crate::system::error::LinkError;
use crate::system::hardware::{Buttons, MotionSource, StatusLed};
use crate::system::schema::ChannelId;
use crate::system::transport::ChannelStore;
use crate::task::advertise::PeerPresence;
use embassy_time::Timer;

/// Largest steering magnitude published
pub const STEERING_LIMIT: i16 = 100;

/// Scales an acceleration to channel units, zeroing values inside the dead zone
pub fn normalize(accel: f32, gain: f32, dead_zone: f32) -> f32 {
    let value = accel * gain;
    if (-dead_zone..=dead_zone).contains(&value) {
        0.0
    } else {
        value
    }
}

/// Buttons whose level changed since the previous sample, with the new level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonChanges {
    pub horn: Option<bool>,
    pub pixels: Option<bool>,
}

/// Edge detector between the sampled buttons and the levels last published
///
/// A level only counts as published once [`record`](Self::record) is called,
/// so a change whose write failed shows up again on the next sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonEdges {
    published: Buttons,
}

impl ButtonEdges {
    /// Buttons whose sampled level differs from the published one
    pub fn changes(&self, now: Buttons) -> ButtonChanges {
        ButtonChanges {
            horn: (now.horn != self.published.horn).then_some(now.horn),
            pixels: (now.pixels != self.published.pixels).then_some(now.pixels),
        }
    }

    /// Marks the levels in `changes` as published
    pub fn record(&mut self, changes: ButtonChanges) {
        if let Some(horn) = changes.horn {
            self.published.horn = horn;
        }
        if let Some(pixels) = changes.pixels {
            self.published.pixels = pixels;
        }
    }
}

/// Drive and steering values for one sample, clamped to their channel ranges
pub fn command_values(tilt_x: f32, tilt_y: f32, config: &ControllerConfig) -> (i16, i16) {
    let drive = normalize(tilt_y, config.tilt_gain, config.dead_zone);
    let steering = normalize(tilt_x, config.tilt_gain, config.dead_zone);
    (
        codec::clamp(drive, i16::MIN, i16::MAX),
        codec::clamp(steering, -STEERING_LIMIT, STEERING_LIMIT),
    )
}

/// Samples the inputs and writes them to the channel store
pub struct Publisher<'a, S, M, L> {
    store: S,
    motion: M,
    led: L,
    config: &'a ControllerConfig,
    edges: ButtonEdges,
    led_on: bool,
}

impl<'a, S, M, L> Publisher<'a, S, M, L>
where
    S: ChannelStore,
    M: MotionSource,
    L: StatusLed,
{
    pub fn new(store: S, motion: M, led: L, config: &'a ControllerConfig) -> Self {
        Self {
            store,
            motion,
            led,
            config,
            edges: ButtonEdges::default(),
            led_on: false,
        }
    }

    /// Takes one sample and publishes it
    ///
    /// A failed button write is retried on the next sample and does not hold
    /// back drive and steering; the first error is returned.
    pub async fn publish_once(&mut self) -> Result<(), LinkError> {
        let sample = self.motion.sample();
        if sample.buttons.horn != self.led_on {
            self.led_on = sample.buttons.horn;
            self.led.set(self.led_on);
        }

        let changes = self.edges.changes(sample.buttons);
        let horn = self.write_button(ChannelId::Horn, changes.horn).await;
        let pixels = self.write_button(ChannelId::PixelToggle, changes.pixels).await;
        self.edges.record(ButtonChanges {
            horn: changes.horn.filter(|_| horn.is_ok()),
            pixels: changes.pixels.filter(|_| pixels.is_ok()),
        });

        let (drive, steering) = command_values(sample.tilt_x, sample.tilt_y, self.config);
        trace!("publishing drive {} steering {}", drive, steering);
        self.write(ChannelId::Drive, drive).await?;
        self.write(ChannelId::Steering, steering).await?;
        horn.and(pixels)
    }

    /// Publishes a button change; channels outside the schema are skipped
    async fn write_button(&mut self, id: ChannelId, change: Option<bool>) -> Result<(), LinkError> {
        let Some(pressed) = change else {
            return Ok(());
        };
        if !self.config.schema.contains(id) {
            return Ok(());
        }
        debug!("{:?} button {}", id, pressed);
        self.write(id, i16::from(pressed)).await
    }

    async fn write(&mut self, id: ChannelId, value: i16) -> Result<(), LinkError> {
        self.store.write(id.spec(), &codec::encode(value), true).await
    }
}

/// Publishes a sample every period for as long as a robot is connected
pub async fn publish<S, M, L>(
    store: S,
    motion: M,
    led: L,
    presence: &PeerPresence,
    config: &ControllerConfig,
) where
    S: ChannelStore,
    M: MotionSource,
    L: StatusLed,
{
    let mut publisher = Publisher::new(store, motion, led, config);
    loop {
        presence.wait_connected().await;
        if let Err(e) = publisher.publish_once().await {
            warn!("publish failed: {}", e);
        }
        Timer::after(config.publish_period).await;
    }
}
