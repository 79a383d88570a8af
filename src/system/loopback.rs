//! Loopback transport
//!
//! Both roles of the transport in memory, sharing one [`Air`]. The controller
//! side advertises and stores channel values, the robot side scans, connects,
//! resolves and reads them. [`Air::drop_link`] simulates the radio link going
//! away. Used by the simulation binary and end-to-end tests.

use core::cell::RefCell;

use crate::system::codec::{self, PAYLOAD_LEN};
use crate::system::error::LinkError;
use crate::system::schema::{ChannelId, ChannelSpec, Schema, CHANNEL_COUNT};
use crate::system::transport::{
    Central, ChannelStore, Peripheral, RemoteLink, Session, MAX_PAYLOAD,
};
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use uuid::Uuid;

/// Longest advertised name the medium carries
pub const MAX_NAME: usize = 32;

/// How often a scan looks at the medium
const SCAN_TICK: Duration = Duration::from_millis(5);

#[derive(Clone, Copy)]
struct Slot {
    len: usize,
    bytes: [u8; MAX_PAYLOAD],
}

impl Slot {
    const fn from_value(value: i16) -> Self {
        let encoded = codec::encode(value);
        let mut bytes = [0; MAX_PAYLOAD];
        bytes[0] = encoded[0];
        bytes[1] = encoded[1];
        Self {
            len: PAYLOAD_LEN,
            bytes,
        }
    }
}

struct AirState {
    name: [u8; MAX_NAME],
    name_len: usize,
    service: Option<Uuid>,
    advertising: bool,
    connected: bool,
    /// Bumped on every new connection so stale links cannot read
    generation: u32,
    slots: [Slot; CHANNEL_COUNT],
    notifications: u32,
}

impl AirState {
    fn advertised_name(&self) -> &[u8] {
        &self.name[..self.name_len]
    }

    fn is_live(&self, generation: u32) -> bool {
        self.connected && self.generation == generation
    }
}

/// The shared medium
pub struct Air {
    schema: Schema,
    state: Mutex<CriticalSectionRawMutex, RefCell<AirState>>,
    accepted: Signal<CriticalSectionRawMutex, ()>,
    dropped: Signal<CriticalSectionRawMutex, ()>,
}

impl Air {
    /// A medium whose controller carries the channels in `schema`
    pub const fn new(schema: Schema) -> Self {
        Self {
            schema,
            state: Mutex::new(RefCell::new(AirState {
                name: [0; MAX_NAME],
                name_len: 0,
                service: None,
                advertising: false,
                connected: false,
                generation: 0,
                slots: [Slot::from_value(0); CHANNEL_COUNT],
                notifications: 0,
            })),
            accepted: Signal::new(),
            dropped: Signal::new(),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut AirState) -> R) -> R {
        self.state.lock(|s| f(&mut s.borrow_mut()))
    }

    /// Robot-side handle
    pub fn central(&self) -> LoopbackCentral<'_> {
        LoopbackCentral { air: self }
    }

    /// Controller-side advertising handle
    pub fn peripheral(&self) -> LoopbackPeripheral<'_> {
        LoopbackPeripheral { air: self }
    }

    /// Controller-side channel values
    pub fn store(&self) -> LoopbackStore<'_> {
        LoopbackStore { air: self }
    }

    /// Drops the current connection as if the radio link was lost
    pub fn drop_link(&self) {
        let was_connected = self.with(|s| core::mem::replace(&mut s.connected, false));
        if was_connected {
            debug!("loopback: link dropped");
            self.dropped.signal(());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.with(|s| s.connected)
    }

    pub fn is_advertising(&self) -> bool {
        self.with(|s| s.advertising)
    }

    /// Number of notifying writes so far
    pub fn notifications(&self) -> u32 {
        self.with(|s| s.notifications)
    }

    /// Current decoded value of a channel, if well formed
    pub fn value(&self, id: ChannelId) -> Option<i16> {
        self.with(|s| {
            let slot = &s.slots[id.index()];
            codec::decode(&slot.bytes[..slot.len]).ok()
        })
    }
}

/// A controller seen during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackPeer {
    pub service: Uuid,
}

pub struct LoopbackCentral<'a> {
    air: &'a Air,
}

impl<'a> Central for LoopbackCentral<'a> {
    type Peer = LoopbackPeer;
    type Link = LoopbackLink<'a>;

    async fn scan(&mut self, name: &str, window: Duration) -> Option<LoopbackPeer> {
        let deadline = Instant::now() + window;
        loop {
            let found = self.air.with(|s| {
                if s.advertising && s.advertised_name() == name.as_bytes() {
                    s.service.map(|service| LoopbackPeer { service })
                } else {
                    None
                }
            });
            if found.is_some() {
                return found;
            }
            if Instant::now() >= deadline {
                return None;
            }
            Timer::after(SCAN_TICK).await;
        }
    }

    async fn connect(&mut self, peer: LoopbackPeer) -> Result<LoopbackLink<'a>, LinkError> {
        yield_now().await;
        let generation = self.air.with(|s| {
            if !s.advertising || s.service != Some(peer.service) {
                return Err(LinkError::ConnectTimeout);
            }
            s.advertising = false;
            s.connected = true;
            s.generation = s.generation.wrapping_add(1);
            Ok(s.generation)
        })?;
        self.air.accepted.signal(());
        Ok(LoopbackLink {
            air: self.air,
            generation,
        })
    }
}

/// Robot's open connection
pub struct LoopbackLink<'a> {
    air: &'a Air,
    generation: u32,
}

impl RemoteLink for LoopbackLink<'_> {
    type Handle = ChannelId;

    async fn resolve(&mut self, service: &Uuid, channel: &ChannelSpec) -> Result<ChannelId, LinkError> {
        yield_now().await;
        let schema = self.air.schema;
        self.air.with(|s| {
            if !s.is_live(self.generation) {
                Err(LinkError::Disconnected)
            } else if s.service.as_ref() != Some(service) {
                Err(LinkError::ResolveTimeout(channel.id))
            } else {
                ChannelId::from_uuid(&channel.uuid)
                    .filter(|id| schema.contains(*id))
                    .ok_or(LinkError::ResolveTimeout(channel.id))
            }
        })
    }

    async fn read(&mut self, handle: ChannelId, buf: &mut [u8]) -> Result<usize, LinkError> {
        yield_now().await;
        self.air.with(|s| {
            if !s.is_live(self.generation) {
                return Err(LinkError::Disconnected);
            }
            let slot = &s.slots[handle.index()];
            let len = slot.len.min(buf.len());
            buf[..len].copy_from_slice(&slot.bytes[..len]);
            Ok(len)
        })
    }

    fn is_connected(&self) -> bool {
        self.air.with(|s| s.is_live(self.generation))
    }

    async fn disconnect(self) {
        let released = self.air.with(|s| {
            if s.is_live(self.generation) {
                s.connected = false;
                true
            } else {
                false
            }
        });
        if released {
            self.air.dropped.signal(());
        }
    }
}

pub struct LoopbackPeripheral<'a> {
    air: &'a Air,
}

impl<'a> Peripheral for LoopbackPeripheral<'a> {
    type Session = LoopbackSession<'a>;

    async fn advertise(
        &mut self,
        name: &str,
        service: &Uuid,
        interval: Duration,
    ) -> Result<LoopbackSession<'a>, LinkError> {
        let name = name.as_bytes();
        if name.len() > MAX_NAME {
            return Err(LinkError::AdvertiseFailed);
        }
        self.air.accepted.reset();
        self.air.with(|s| {
            s.name[..name.len()].copy_from_slice(name);
            s.name_len = name.len();
            s.service = Some(*service);
            s.advertising = true;
        });

        loop {
            if let Either::First(()) = select(self.air.accepted.wait(), Timer::after(interval)).await {
                break;
            }
            // beacon interval elapsed; a connect may have raced the signal reset
            if self.air.with(|s| s.connected && !s.advertising) {
                break;
            }
        }

        let generation = self.air.with(|s| s.generation);
        Ok(LoopbackSession {
            air: self.air,
            generation,
        })
    }
}

/// Controller's view of the connected robot
pub struct LoopbackSession<'a> {
    air: &'a Air,
    generation: u32,
}

impl Session for LoopbackSession<'_> {
    async fn disconnected(&mut self) {
        while self.air.with(|s| s.is_live(self.generation)) {
            self.air.dropped.wait().await;
        }
    }
}

/// Controller's channel values
pub struct LoopbackStore<'a> {
    air: &'a Air,
}

impl ChannelStore for LoopbackStore<'_> {
    async fn write(
        &mut self,
        channel: &ChannelSpec,
        payload: &[u8],
        notify: bool,
    ) -> Result<(), LinkError> {
        if !self.air.schema.contains(channel.id) || payload.len() > MAX_PAYLOAD {
            return Err(LinkError::WriteFailed(channel.id));
        }
        self.air.with(|s| {
            let slot = &mut s.slots[channel.id.index()];
            slot.bytes[..payload.len()].copy_from_slice(payload);
            slot.len = payload.len();
            if notify {
                s.notifications += 1;
            }
        });
        yield_now().await;
        Ok(())
    }
}
