//! Advertise Task
//!
//! Controller side: advertises under the configured name, serves one robot at a
//! time and goes back to advertising once it leaves. Connection state is shared
//! with the publish loop through [`PeerPresence`].

use core::sync::atomic::{AtomicBool, Ordering};

use crate::system::config::ControllerConfig;
use crate::system::schema::SERVICE_UUID;
use crate::system::transport::{Peripheral, Session};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;

/// Whether a robot is connected to the controller
pub struct PeerPresence {
    connected: AtomicBool,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl PeerPresence {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    /// Records whether a robot is connected and wakes the publish loop
    pub fn set(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
        self.changed.signal(());
    }

    /// Whether a robot is connected right now
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Suspends until a robot is connected
    pub async fn wait_connected(&self) {
        while !self.is_connected() {
            self.changed.wait().await;
        }
    }
}

impl Default for PeerPresence {
    fn default() -> Self {
        Self::new()
    }
}

/// Advertises forever, tracking the connected robot in `presence`
pub async fn advertise<P: Peripheral>(
    peripheral: &mut P,
    presence: &PeerPresence,
    config: &ControllerConfig,
) {
    loop {
        info!("advertising as {}", config.device_name);
        match peripheral
            .advertise(config.device_name, &SERVICE_UUID, config.adv_interval)
            .await
        {
            Ok(mut session) => {
                info!("robot connected");
                presence.set(true);
                session.disconnected().await;
                presence.set(false);
                info!("robot disconnected");
            }
            Err(e) => warn!("advertising failed: {}", e),
        }
        Timer::after(config.readvertise_delay).await;
    }
}
