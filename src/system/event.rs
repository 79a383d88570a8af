//! Overlay Events
//!
//! Message passing from the poll loop to the two overlay tasks. Each gate has
//! exactly one setter (the poll loop) and one clearer (the overlay task that acts
//! on it), so no shared mutable flag exists.
//!
//! - Horn: a [`Signal`]. Arming twice before the horn runs is the same as arming
//!   once; the horn task resets it after its melody.
//! - Pixels: a bounded [`Channel`] of toggle events, so two pushes are two flips
//!   even when they arrive within one animation step.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

/// Pending pixel toggles beyond this are dropped
pub const PIXEL_QUEUE_DEPTH: usize = 4;

/// Horn request from the poll loop
pub struct HornGate {
    armed: Signal<CriticalSectionRawMutex, ()>,
}

impl HornGate {
    pub const fn new() -> Self {
        Self {
            armed: Signal::new(),
        }
    }

    /// Requests one run of the melody
    pub fn arm(&self) {
        self.armed.signal(());
    }

    /// Waits until the horn is armed and consumes the request
    pub async fn wait(&self) {
        self.armed.wait().await
    }

    /// Drops any request that arrived while the melody was playing
    pub fn clear(&self) {
        self.armed.reset();
    }

    pub fn is_armed(&self) -> bool {
        self.armed.signaled()
    }
}

impl Default for HornGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A single push of the pixel toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PixelToggle;

/// Pixel toggle events from the poll loop
pub struct PixelGate {
    toggles: Channel<CriticalSectionRawMutex, PixelToggle, PIXEL_QUEUE_DEPTH>,
}

impl PixelGate {
    pub const fn new() -> Self {
        Self {
            toggles: Channel::new(),
        }
    }

    /// Queues one toggle without suspending; returns false if the queue is full
    pub fn toggle(&self) -> bool {
        self.toggles.try_send(PixelToggle).is_ok()
    }

    /// Waits for the next toggle
    pub async fn wait(&self) -> PixelToggle {
        self.toggles.receive().await
    }

    /// Takes a pending toggle if there is one
    pub fn take(&self) -> Option<PixelToggle> {
        self.toggles.try_receive().ok()
    }
}

impl Default for PixelGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Both overlay gates, shared by the poll loop and the overlay tasks
#[derive(Default)]
pub struct OverlayGates {
    pub horn: HornGate,
    pub pixels: PixelGate,
}

impl OverlayGates {
    pub const fn new() -> Self {
        Self {
            horn: HornGate::new(),
            pixels: PixelGate::new(),
        }
    }
}

/// Rising-edge detector for a level read from a channel
///
/// The first level seen after construction or [`reset`](Self::reset) is only a
/// baseline: a level already high then is a press that happened before we were
/// watching, not a new one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RisingEdge {
    last: Option<bool>,
}

impl RisingEdge {
    /// Feeds the current level; true on a low-to-high transition
    pub fn update(&mut self, level: bool) -> bool {
        let rose = level && self.last == Some(false);
        self.last = Some(level);
        rose
    }

    /// Forgets the last level, e.g. after a reconnect
    pub fn reset(&mut self) {
        self.last = None;
    }
}
