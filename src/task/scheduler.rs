//! Scheduler
//!
//! Each role is a fixed set of tasks joined on a single executor. Tasks only
//! yield at `.await` points (transport calls and timers), so code between two
//! awaits never interleaves with another task.
//!
//! - Robot: connection manager, horn overlay, pixel overlay.
//! - Controller: advertise loop, publish loop.

use crate::system::config::{ControllerConfig, RobotConfig};
use crate::system::event::OverlayGates;
use crate::system::hardware::{Indicator, MotionSource, PixelStrip, StatusLed, Tone, Wheels};
use crate::system::transport::{Central, ChannelStore, Peripheral};
use crate::task::advertise::{advertise, PeerPresence};
use crate::task::horn::horn;
use crate::task::pixels::pixels;
use crate::task::publish::publish;
use crate::task::remote_link::RemoteLinkManager;
use embassy_futures::join::{join, join3};

/// Runs every robot task until the executor stops
pub async fn run_robot<C, A, T, S>(
    central: C,
    actuators: A,
    mut tone: T,
    mut strip: S,
    gates: &OverlayGates,
    config: &RobotConfig,
) where
    C: Central,
    A: Wheels + Indicator,
    T: Tone,
    S: PixelStrip,
{
    let mut manager = RemoteLinkManager::new(central, actuators, gates, config);
    join3(
        manager.run(),
        horn(&gates.horn, &mut tone, config.melody, config.tempo),
        pixels(
            &gates.pixels,
            &mut strip,
            config.pixel_step,
            config.bar_width,
            config.bar_color,
        ),
    )
    .await;
}

/// Runs every controller task until the executor stops
pub async fn run_controller<P, S, M, L>(
    mut peripheral: P,
    store: S,
    motion: M,
    led: L,
    config: &ControllerConfig,
) where
    P: Peripheral,
    S: ChannelStore,
    M: MotionSource,
    L: StatusLed,
{
    let presence = PeerPresence::new();
    join(
        advertise(&mut peripheral, &presence, config),
        publish(store, motion, led, &presence, config),
    )
    .await;
}
