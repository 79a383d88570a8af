//! Remote Link Task
//!
//! Robot side of the link: discovers the controller, connects, resolves the
//! configured channels and polls them, mixing drive and steering into wheel
//! speeds. Any failure ends in the fail-stop and a fresh scan; the loop never
//! exits.
//!
//! # Poll iteration
//!
//! Reads happen in a fixed order: horn, pixel toggle (each only if the schema
//! carries it), drive, steering. Nothing is acted on until every read of the
//! iteration has succeeded, so a read failure halfway through never applies a
//! command built from half-new data. A value that fails to decode is discarded:
//! the previous wheel command stays in force.
//!
//! Polling has no clock of its own; the cadence is set by how long the reads
//! take. Every transport call is bounded by a timeout from [`RobotConfig`], so a
//! stalled radio ends in the fail-stop like any other failure.
//!
//! # Overlay triggers
//!
//! The horn is level triggered: every iteration that reads `horn == 1` arms it,
//! so a held button replays the melody once it ends. The pixel toggle is edge
//! triggered, and the first level read on a new connection is only a baseline.

use crate::system::codec;
use crate::system::config::RobotConfig;
use crate::system::drive_command::{self, DriveCommand};
use crate::system::error::LinkError;
use crate::system::event::{OverlayGates, RisingEdge};
use crate::system::hardware::{Indicator, Wheels};
use crate::system::indicator;
use crate::system::schema::{ChannelId, Schema, SERVICE_UUID};
use crate::system::state::{LinkEvent, LinkState};
use crate::system::transport::{Central, RemoteLink, MAX_PAYLOAD};
use embassy_time::{with_timeout, Duration, Timer};

/// Channel handles resolved on the current connection
#[derive(Debug, Clone, Copy)]
struct Channels<H> {
    horn: Option<H>,
    pixels: Option<H>,
    drive: H,
    steering: H,
}

/// Values read in one poll iteration; `None` means the payload did not decode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Readings {
    horn: Option<i16>,
    pixels: Option<i16>,
    drive: Option<i16>,
    steering: Option<i16>,
}

/// Drives the link state machine against a transport
pub struct RemoteLinkManager<'a, C: Central, A> {
    central: C,
    actuators: A,
    gates: &'a OverlayGates,
    config: &'a RobotConfig,
    state: LinkState,
    peer: Option<C::Peer>,
    link: Option<C::Link>,
    channels: Option<Channels<<C::Link as RemoteLink>::Handle>>,
    pixel_edge: RisingEdge,
    last_command: Option<DriveCommand>,
    showing_active: bool,
}

impl<'a, C, A> RemoteLinkManager<'a, C, A>
where
    C: Central,
    A: Wheels + Indicator,
{
    /// Starts in `Scanning`; nothing touches the hardware until [`run`](Self::run)
    /// or [`step`](Self::step)
    pub fn new(central: C, actuators: A, gates: &'a OverlayGates, config: &'a RobotConfig) -> Self {
        Self {
            central,
            actuators,
            gates,
            config,
            state: LinkState::Scanning,
            peer: None,
            link: None,
            channels: None,
            pixel_edge: RisingEdge::default(),
            last_command: None,
            showing_active: false,
        }
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Most recent command applied to the wheels, `None` after a fail-stop
    pub fn last_command(&self) -> Option<DriveCommand> {
        self.last_command
    }

    /// Stops the robot, then runs the state machine forever
    pub async fn run(&mut self) {
        info!("remote link started, looking for {}", self.config.device_name);
        self.fail_stop();
        loop {
            self.step().await;
        }
    }

    /// Performs the work of the current state and takes the resulting transition
    pub async fn step(&mut self) -> LinkState {
        let event = match self.state {
            LinkState::Scanning => self.scan().await,
            LinkState::Connecting => self.connect().await,
            LinkState::ResolvingChannels => self.resolve().await,
            LinkState::Polling => self.poll().await,
            LinkState::Disconnected => self.release().await,
        };

        let next = self.state.next(event);
        if next != self.state {
            debug!("link {:?} -> {:?} on {:?}", self.state, next, event);
            // no suspension point between the transition and the stop
            if next.requires_fail_stop() {
                self.fail_stop();
            }
        }
        self.state = next;
        next
    }

    fn fail_stop(&mut self) {
        indicator::fail_stop(&mut self.actuators);
        self.last_command = None;
        self.showing_active = false;
    }

    async fn scan(&mut self) -> LinkEvent {
        let name = self.config.device_name;
        match self.central.scan(name, self.config.scan_window).await {
            Some(peer) => {
                info!("found {}", name);
                self.peer = Some(peer);
                LinkEvent::PeerFound
            }
            None => {
                info!("{} not found, scanning again", name);
                Timer::after(self.config.rescan_delay).await;
                LinkEvent::ScanExpired
            }
        }
    }

    async fn connect(&mut self) -> LinkEvent {
        let Some(peer) = self.peer.take() else {
            return LinkEvent::ConnectFailed;
        };
        let attempt = with_timeout(self.config.connect_timeout, self.central.connect(peer)).await;
        match attempt.unwrap_or(Err(LinkError::ConnectTimeout)) {
            Ok(link) => {
                info!("connected");
                self.link = Some(link);
                LinkEvent::Connected
            }
            Err(e) => {
                warn!("connect failed: {}", e);
                LinkEvent::ConnectFailed
            }
        }
    }

    async fn resolve(&mut self) -> LinkEvent {
        let Some(link) = self.link.as_mut() else {
            return LinkEvent::ResolveFailed;
        };
        match resolve_channels(link, self.config.schema, self.config.resolve_timeout).await {
            Ok(channels) => {
                self.channels = Some(channels);
                self.pixel_edge.reset();
                LinkEvent::Resolved
            }
            Err(e) => {
                warn!("channel lookup failed: {}", e);
                LinkEvent::ResolveFailed
            }
        }
    }

    async fn poll(&mut self) -> LinkEvent {
        let (Some(link), Some(channels)) = (self.link.as_mut(), self.channels) else {
            return LinkEvent::LinkLost;
        };
        match read_iteration(link, channels, self.config.read_timeout).await {
            Ok(readings) => {
                self.act_on(readings);
                LinkEvent::IterationDone
            }
            Err(e) => {
                warn!("link lost while polling: {}", e);
                LinkEvent::LinkLost
            }
        }
    }

    /// Applies a complete iteration's readings
    ///
    /// `horn == 1` arms the horn on every read, not only on the rising edge.
    fn act_on(&mut self, readings: Readings) {
        if readings.horn == Some(1) && !self.gates.horn.is_armed() {
            debug!("horn requested");
            self.gates.horn.arm();
        }

        if let Some(pixels) = readings.pixels {
            if self.pixel_edge.update(pixels == 1) && !self.gates.pixels.toggle() {
                warn!("pixel toggle dropped, queue full");
            }
        }

        let (Some(drive), Some(steering)) = (readings.drive, readings.steering) else {
            debug!("incomplete drive values, keeping previous command");
            return;
        };
        let command = drive_command::mix(drive, steering, self.config.speed_factor);
        indicator::apply(&mut self.actuators, command);
        self.last_command = Some(command);
        if !self.showing_active {
            self.actuators.set_indicator_color(indicator::ACTIVE);
            self.showing_active = true;
        }
    }

    async fn release(&mut self) -> LinkEvent {
        self.channels = None;
        self.peer = None;
        if let Some(link) = self.link.take() {
            link.disconnect().await;
        }
        info!("connection released");
        LinkEvent::Released
    }
}

async fn resolve_channels<L: RemoteLink>(
    link: &mut L,
    schema: Schema,
    timeout: Duration,
) -> Result<Channels<L::Handle>, LinkError> {
    let horn = if schema.horn {
        Some(resolve_one(link, ChannelId::Horn, timeout).await?)
    } else {
        None
    };
    let pixels = if schema.pixels {
        Some(resolve_one(link, ChannelId::PixelToggle, timeout).await?)
    } else {
        None
    };
    Ok(Channels {
        horn,
        pixels,
        drive: resolve_one(link, ChannelId::Drive, timeout).await?,
        steering: resolve_one(link, ChannelId::Steering, timeout).await?,
    })
}

async fn resolve_one<L: RemoteLink>(
    link: &mut L,
    id: ChannelId,
    timeout: Duration,
) -> Result<L::Handle, LinkError> {
    with_timeout(timeout, link.resolve(&SERVICE_UUID, id.spec()))
        .await
        .unwrap_or(Err(LinkError::ResolveTimeout(id)))
}

/// Reads every configured channel once, in poll order
async fn read_iteration<L: RemoteLink>(
    link: &mut L,
    channels: Channels<L::Handle>,
    timeout: Duration,
) -> Result<Readings, LinkError> {
    if !link.is_connected() {
        return Err(LinkError::Disconnected);
    }
    let horn = match channels.horn {
        Some(handle) => read_value(link, handle, ChannelId::Horn, timeout).await?,
        None => None,
    };
    let pixels = match channels.pixels {
        Some(handle) => read_value(link, handle, ChannelId::PixelToggle, timeout).await?,
        None => None,
    };
    let drive = read_value(link, channels.drive, ChannelId::Drive, timeout).await?;
    let steering = read_value(link, channels.steering, ChannelId::Steering, timeout).await?;
    Ok(Readings {
        horn,
        pixels,
        drive,
        steering,
    })
}

/// Reads one channel; a payload that does not decode is `Ok(None)`
async fn read_value<L: RemoteLink>(
    link: &mut L,
    handle: L::Handle,
    id: ChannelId,
    timeout: Duration,
) -> Result<Option<i16>, LinkError> {
    let mut buf = [0u8; MAX_PAYLOAD];
    let len = with_timeout(timeout, link.read(handle, &mut buf))
        .await
        .unwrap_or(Err(LinkError::ReadTimeout(id)))?;
    match codec::decode(&buf[..len.min(MAX_PAYLOAD)]) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("discarding {:?} value: {}", id, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::indicator::{ACTIVE, FAILURE};
    use crate::testing::{value, Call, RecordingActuators, ScriptedCentral};
    use embassy_futures::block_on;
    use embassy_time::Duration;

    const CONFIG: RobotConfig = RobotConfig {
        scan_window: Duration::from_millis(1),
        rescan_delay: Duration::from_millis(1),
        connect_timeout: Duration::from_millis(5),
        resolve_timeout: Duration::from_millis(5),
        read_timeout: Duration::from_millis(5),
        ..RobotConfig::DEFAULT
    };

    struct Rig {
        actuators: RecordingActuators,
        central: ScriptedCentral,
        gates: OverlayGates,
    }

    impl Rig {
        fn new() -> Self {
            let actuators = RecordingActuators::default();
            let central = ScriptedCentral::new(&actuators);
            Self {
                actuators,
                central,
                gates: OverlayGates::new(),
            }
        }

        fn manager<'a>(
            &'a self,
            config: &'a RobotConfig,
        ) -> RemoteLinkManager<'a, ScriptedCentral, RecordingActuators> {
            RemoteLinkManager::new(
                self.central.clone(),
                self.actuators.clone(),
                &self.gates,
                config,
            )
        }
    }

    fn steps<C: Central>(
        manager: &mut RemoteLinkManager<'_, C, RecordingActuators>,
        n: usize,
    ) -> Vec<LinkState> {
        block_on(async {
            let mut states = Vec::new();
            for _ in 0..n {
                states.push(manager.step().await);
            }
            states
        })
    }

    /// Scan, connect and resolve, ending in `Polling`
    fn connect(rig: &Rig, manager: &mut RemoteLinkManager<'_, ScriptedCentral, RecordingActuators>) {
        rig.central.script().scans.push_back(true);
        assert_eq!(
            steps(manager, 3),
            [LinkState::Connecting, LinkState::ResolvingChannels, LinkState::Polling]
        );
    }

    #[test]
    fn polls_in_fixed_order_and_applies_the_mix() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);

        rig.central.queue_iteration(0, 0, 200, 25);
        assert_eq!(steps(&mut manager, 1), [LinkState::Polling]);

        assert_eq!(
            rig.central.read_log(),
            [
                ChannelId::Horn,
                ChannelId::PixelToggle,
                ChannelId::Drive,
                ChannelId::Steering
            ]
        );
        let wheels = rig.actuators.wheel_calls();
        assert_eq!(wheels.len(), 1);
        assert!((wheels[0].0 - 175.0).abs() < 1e-3);
        assert!((wheels[0].1 - 105.0).abs() < 1e-3);
        assert!(rig.actuators.calls().contains(&Call::Indicator(ACTIVE)));
    }

    #[test]
    fn run_stops_the_robot_before_anything_else() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        block_on(async {
            embassy_futures::select::select(manager.run(), async {
                while !rig.actuators.calls().contains(&Call::Scan) {
                    embassy_futures::yield_now().await;
                }
            })
            .await;
        });
        assert_eq!(
            rig.actuators.calls()[..3],
            [Call::Wheels(0.0, 0.0), Call::Indicator(FAILURE), Call::Scan]
        );
    }

    #[test]
    fn read_failure_fail_stops_before_release_and_rescan() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 0, 100, 0);
        steps(&mut manager, 1);
        rig.actuators.clear();

        // nothing queued: the next read times out
        assert_eq!(
            steps(&mut manager, 3),
            [LinkState::Disconnected, LinkState::Scanning, LinkState::Scanning]
        );
        assert_eq!(
            rig.actuators.calls(),
            [
                Call::Wheels(0.0, 0.0),
                Call::Indicator(FAILURE),
                Call::Released,
                Call::Scan
            ]
        );
        assert_eq!(manager.last_command(), None);
    }

    #[test]
    fn steering_failure_never_applies_half_new_data() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);

        rig.central.queue_iteration(0, 0, 100, 0);
        steps(&mut manager, 1);
        let previous = manager.last_command();

        rig.central.script().reads.extend([
            value(0),
            value(0),
            value(300),
            Err(LinkError::ReadTimeout(ChannelId::Steering)),
        ]);
        assert_eq!(steps(&mut manager, 1), [LinkState::Disconnected]);

        let wheels = rig.actuators.wheel_calls();
        assert_eq!(wheels.len(), 2);
        assert_eq!(Some(DriveCommand { left: wheels[0].0, right: wheels[0].1 }), previous);
        assert_eq!(wheels[1], (0.0, 0.0));
    }

    #[test]
    fn undecodable_value_keeps_previous_command() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);

        rig.central.queue_iteration(0, 0, 100, 0);
        steps(&mut manager, 1);
        let previous = manager.last_command();

        rig.central
            .script()
            .reads
            .extend([value(0), value(0), Ok(vec![0x01]), value(50)]);
        assert_eq!(steps(&mut manager, 1), [LinkState::Polling]);
        assert_eq!(rig.actuators.wheel_calls().len(), 1);
        assert_eq!(manager.last_command(), previous);

        rig.central
            .script()
            .reads
            .extend([value(0), value(0), value(100), Ok(vec![])]);
        assert_eq!(steps(&mut manager, 1), [LinkState::Polling]);
        assert_eq!(rig.actuators.wheel_calls().len(), 1);
    }

    #[test]
    fn connect_timeout_goes_back_to_scanning_without_touching_wheels() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        rig.central.script().scans.push_back(true);
        rig.central
            .script()
            .connects
            .push_back(Err(LinkError::ConnectTimeout));

        assert_eq!(
            steps(&mut manager, 2),
            [LinkState::Connecting, LinkState::Scanning]
        );
        assert!(rig.actuators.wheel_calls().is_empty());
    }

    #[test]
    fn scanning_retries_until_found() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        rig.central.script().scans.extend([false, false, true]);
        assert_eq!(
            steps(&mut manager, 3),
            [LinkState::Scanning, LinkState::Scanning, LinkState::Connecting]
        );
    }

    #[test]
    fn missing_channel_is_a_disconnect() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        rig.central.script().scans.push_back(true);
        rig.central.script().missing.push(ChannelId::PixelToggle);

        assert_eq!(
            steps(&mut manager, 4),
            [
                LinkState::Connecting,
                LinkState::ResolvingChannels,
                LinkState::Disconnected,
                LinkState::Scanning
            ]
        );
        assert_eq!(rig.actuators.wheel_calls(), [(0.0, 0.0)]);
    }

    #[test]
    fn drive_only_schema_skips_overlay_channels() {
        let rig = Rig::new();
        let config = RobotConfig {
            schema: Schema::DRIVE_ONLY,
            ..CONFIG
        };
        let mut manager = rig.manager(&config);
        // the peer lacks them too, which must not matter
        rig.central
            .script()
            .missing
            .extend([ChannelId::Horn, ChannelId::PixelToggle]);
        connect(&rig, &mut manager);

        rig.central.script().reads.extend([value(100), value(-50)]);
        assert_eq!(steps(&mut manager, 1), [LinkState::Polling]);
        assert_eq!(rig.central.read_log(), [ChannelId::Drive, ChannelId::Steering]);
    }

    #[test]
    fn link_reported_down_aborts_before_reading() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 0, 100, 0);
        rig.central.script().connected = false;

        assert_eq!(steps(&mut manager, 1), [LinkState::Disconnected]);
        assert!(rig.central.read_log().is_empty());
    }

    #[test]
    fn horn_and_pixel_events_reach_the_gates() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);

        // pixel level 1 held over two reads is a single toggle
        for (horn, pixels) in [(0, 0), (1, 1), (0, 1), (0, 0), (0, 1)] {
            rig.central.queue_iteration(horn, pixels, 0, 0);
        }
        steps(&mut manager, 5);

        assert!(rig.gates.horn.is_armed());
        assert!(rig.gates.pixels.take().is_some());
        assert!(rig.gates.pixels.take().is_some());
        assert!(rig.gates.pixels.take().is_none());
    }

    #[test]
    fn pixel_held_across_reconnect_is_not_a_new_push() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 0, 0, 0);
        rig.central.queue_iteration(0, 1, 0, 0);
        steps(&mut manager, 2);

        rig.central.script().connected = false;
        assert_eq!(
            steps(&mut manager, 2),
            [LinkState::Disconnected, LinkState::Scanning]
        );
        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 1, 0, 0);
        rig.central.queue_iteration(0, 1, 0, 0);
        steps(&mut manager, 2);

        assert!(rig.gates.pixels.take().is_some());
        assert!(rig.gates.pixels.take().is_none());
    }

    #[test]
    fn stalled_read_times_out_into_fail_stop() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 0, 100, 0);
        steps(&mut manager, 1);
        rig.actuators.clear();

        rig.central.script().stall_reads = true;
        assert_eq!(steps(&mut manager, 1), [LinkState::Disconnected]);
        assert_eq!(
            rig.actuators.calls(),
            [Call::Wheels(0.0, 0.0), Call::Indicator(FAILURE)]
        );
    }

    #[test]
    fn stalled_connect_times_out_back_to_scanning() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        rig.central.script().scans.push_back(true);
        rig.central.script().stall_connect = true;

        assert_eq!(
            steps(&mut manager, 2),
            [LinkState::Connecting, LinkState::Scanning]
        );
    }

    #[test]
    fn reconnect_after_loss() {
        let rig = Rig::new();
        let mut manager = rig.manager(&CONFIG);
        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 0, 100, 0);
        steps(&mut manager, 1);
        rig.central.script().connected = false;
        steps(&mut manager, 2);
        assert_eq!(manager.state(), LinkState::Scanning);

        connect(&rig, &mut manager);
        rig.central.queue_iteration(0, 0, 100, 100);
        steps(&mut manager, 1);
        let wheels = rig.actuators.wheel_calls();
        assert_eq!(wheels.last(), Some(&(140.0, 0.0)));
    }
}
