//! Recording and scripted doubles for hardware and transport

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::system::codec;
use crate::system::error::LinkError;
use crate::system::hardware::{
    Indicator, MotionSample, MotionSource, PixelStrip, Rgb, StatusLed, Tone, Wheels,
};
use crate::system::schema::{ChannelId, ChannelSpec};
use crate::system::transport::{Central, ChannelStore, RemoteLink};
use embassy_futures::yield_now;
use embassy_time::Duration;
use uuid::Uuid;

/// One observable side effect, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Wheels(f32, f32),
    Indicator(Rgb),
    Note(u16),
    Status(bool),
    /// The robot started a scan
    Scan,
    /// The robot released a connection
    Released,
}

/// Records every actuator call into a shared log; clones share the log
#[derive(Clone, Default)]
pub struct RecordingActuators {
    log: Rc<RefCell<Vec<Call>>>,
}

impl RecordingActuators {
    pub fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn wheel_calls(&self) -> Vec<(f32, f32)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Wheels(l, r) => Some((*l, *r)),
                _ => None,
            })
            .collect()
    }

    pub fn notes(&self) -> Vec<u16> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Note(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl Wheels for RecordingActuators {
    fn set_wheel_speeds(&mut self, left: f32, right: f32) {
        self.push(Call::Wheels(left, right));
    }
}

impl Indicator for RecordingActuators {
    fn set_indicator_color(&mut self, color: Rgb) {
        self.push(Call::Indicator(color));
    }
}

impl Tone for RecordingActuators {
    fn play_note(&mut self, pitch: u16) {
        self.push(Call::Note(pitch));
    }
}

impl StatusLed for RecordingActuators {
    fn set(&mut self, on: bool) {
        self.push(Call::Status(on));
    }
}

#[derive(Default)]
struct StripState {
    buffer: Vec<Rgb>,
    shown: Vec<Rgb>,
    shows: usize,
}

/// Light strip that keeps the last latched frame; clones share it
#[derive(Clone)]
pub struct RecordingStrip {
    state: Rc<RefCell<StripState>>,
}

impl RecordingStrip {
    pub fn new(len: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(StripState {
                buffer: vec![Rgb::OFF; len],
                shown: vec![Rgb::OFF; len],
                shows: 0,
            })),
        }
    }

    /// Last frame latched with `show`
    pub fn shown(&self) -> Vec<Rgb> {
        self.state.borrow().shown.clone()
    }

    pub fn shows(&self) -> usize {
        self.state.borrow().shows
    }

    pub fn lit(&self) -> Vec<usize> {
        self.shown()
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != Rgb::OFF)
            .map(|(i, _)| i)
            .collect()
    }
}

impl PixelStrip for RecordingStrip {
    fn len(&self) -> usize {
        self.state.borrow().buffer.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(p) = self.state.borrow_mut().buffer.get_mut(index) {
            *p = color;
        }
    }

    fn clear_all(&mut self) {
        self.state.borrow_mut().buffer.fill(Rgb::OFF);
    }

    fn show(&mut self) {
        let mut state = self.state.borrow_mut();
        state.shown = state.buffer.clone();
        state.shows += 1;
    }
}

/// Replays a fixed list of samples, repeating the last one
pub struct ScriptedMotion {
    samples: VecDeque<MotionSample>,
    last: MotionSample,
}

impl ScriptedMotion {
    pub fn new(samples: impl IntoIterator<Item = MotionSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: MotionSample::default(),
        }
    }
}

impl MotionSource for ScriptedMotion {
    fn sample(&mut self) -> MotionSample {
        if let Some(next) = self.samples.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Result of one scripted channel read
pub type Payload = Result<Vec<u8>, LinkError>;

/// A well-formed payload
pub fn value(v: i16) -> Payload {
    Ok(codec::encode(v).to_vec())
}

/// What the scripted transport does next
#[derive(Default)]
pub struct Script {
    /// Scan outcomes; an empty queue finds nothing
    pub scans: VecDeque<bool>,
    /// Connect outcomes; an empty queue connects
    pub connects: VecDeque<Result<(), LinkError>>,
    /// Channels the peer does not carry
    pub missing: Vec<ChannelId>,
    /// Read outcomes in order; an empty queue times out
    pub reads: VecDeque<Payload>,
    pub connected: bool,
    /// Connect attempts never complete
    pub stall_connect: bool,
    /// Reads never complete
    pub stall_reads: bool,
    /// Channels read so far, in order
    pub read_log: Vec<ChannelId>,
}

/// Transport double driven by a [`Script`]; side effects go to the actuator log
#[derive(Clone)]
pub struct ScriptedCentral {
    script: Rc<RefCell<Script>>,
    log: RecordingActuators,
}

impl ScriptedCentral {
    pub fn new(log: &RecordingActuators) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script::default())),
            log: log.clone(),
        }
    }

    pub fn script(&self) -> RefMut<'_, Script> {
        self.script.borrow_mut()
    }

    /// Queues one full poll iteration of well-formed values
    pub fn queue_iteration(&self, horn: i16, pixels: i16, drive: i16, steering: i16) {
        self.script()
            .reads
            .extend([value(horn), value(pixels), value(drive), value(steering)]);
    }

    pub fn read_log(&self) -> Vec<ChannelId> {
        self.script.borrow().read_log.clone()
    }
}

impl Central for ScriptedCentral {
    type Peer = ();
    type Link = ScriptedLink;

    async fn scan(&mut self, _name: &str, _window: Duration) -> Option<()> {
        self.log.push(Call::Scan);
        yield_now().await;
        self.script().scans.pop_front().unwrap_or(false).then_some(())
    }

    async fn connect(&mut self, _peer: ()) -> Result<ScriptedLink, LinkError> {
        yield_now().await;
        let stall = self.script().stall_connect;
        if stall {
            std::future::pending::<()>().await;
        }
        let outcome = self.script().connects.pop_front().unwrap_or(Ok(()));
        outcome?;
        self.script().connected = true;
        Ok(ScriptedLink {
            script: self.script.clone(),
            log: self.log.clone(),
        })
    }
}

pub struct ScriptedLink {
    script: Rc<RefCell<Script>>,
    log: RecordingActuators,
}

impl RemoteLink for ScriptedLink {
    type Handle = ChannelId;

    async fn resolve(&mut self, _service: &Uuid, channel: &ChannelSpec) -> Result<ChannelId, LinkError> {
        yield_now().await;
        if self.script.borrow().missing.contains(&channel.id) {
            Err(LinkError::ResolveTimeout(channel.id))
        } else {
            Ok(channel.id)
        }
    }

    async fn read(&mut self, handle: ChannelId, buf: &mut [u8]) -> Result<usize, LinkError> {
        yield_now().await;
        let stall = self.script.borrow().stall_reads;
        if stall {
            std::future::pending::<()>().await;
        }
        let mut script = self.script.borrow_mut();
        if !script.connected {
            return Err(LinkError::Disconnected);
        }
        script.read_log.push(handle);
        match script.reads.pop_front() {
            Some(Ok(bytes)) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Some(Err(e)) => Err(e),
            None => Err(LinkError::ReadTimeout(handle)),
        }
    }

    fn is_connected(&self) -> bool {
        self.script.borrow().connected
    }

    async fn disconnect(self) {
        self.script.borrow_mut().connected = false;
        self.log.push(Call::Released);
    }
}

/// One controller write as seen by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    pub channel: ChannelId,
    pub value: i16,
    pub notify: bool,
}

/// Channel store that records every write; clones share the record
#[derive(Clone, Default)]
pub struct RecordingStore {
    writes: Rc<RefCell<Vec<Write>>>,
    failing: Rc<RefCell<Vec<ChannelId>>>,
}

impl RecordingStore {
    /// The next write to `channel` fails and is not recorded
    pub fn fail_once(&self, channel: ChannelId) {
        self.failing.borrow_mut().push(channel);
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.borrow().clone()
    }

    /// Values written to one channel, in order
    pub fn values(&self, channel: ChannelId) -> Vec<i16> {
        self.writes
            .borrow()
            .iter()
            .filter(|w| w.channel == channel)
            .map(|w| w.value)
            .collect()
    }
}

impl ChannelStore for RecordingStore {
    async fn write(
        &mut self,
        channel: &ChannelSpec,
        payload: &[u8],
        notify: bool,
    ) -> Result<(), LinkError> {
        let mut failing = self.failing.borrow_mut();
        if let Some(i) = failing.iter().position(|c| *c == channel.id) {
            failing.remove(i);
            return Err(LinkError::WriteFailed(channel.id));
        }
        drop(failing);
        let value = codec::decode(payload).map_err(|_| LinkError::WriteFailed(channel.id))?;
        self.writes.borrow_mut().push(Write {
            channel: channel.id,
            value,
            notify,
        });
        Ok(())
    }
}
