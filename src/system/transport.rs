//! Wireless transport interfaces
//!
//! The discovery/advertising internals of the radio stack are external. The core
//! needs a handful of suspending primitives per role and assumes ordered,
//! reliable delivery per message over a link that can time out or drop.

use crate::system::error::LinkError;
use crate::system::schema::ChannelSpec;
use embassy_time::Duration;
use uuid::Uuid;

/// Largest payload the robot accepts from a single read
pub const MAX_PAYLOAD: usize = 8;

/// Robot side: discovers and connects to the controller
pub trait Central {
    /// Opaque address of a discovered peer
    type Peer;
    type Link: RemoteLink;

    /// Listens for up to `window` for a peer advertising exactly `name`
    async fn scan(&mut self, name: &str, window: Duration) -> Option<Self::Peer>;

    /// Opens a connection to `peer`
    async fn connect(&mut self, peer: Self::Peer) -> Result<Self::Link, LinkError>;
}

/// An open connection to the controller
pub trait RemoteLink {
    /// Resolved channel reference
    type Handle: Copy;

    /// Looks up `channel` inside `service` on the peer
    async fn resolve(&mut self, service: &Uuid, channel: &ChannelSpec)
        -> Result<Self::Handle, LinkError>;

    /// Reads the current value of a channel into `buf`, returning its length
    async fn read(&mut self, handle: Self::Handle, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Whether the link is still up as far as the transport knows
    fn is_connected(&self) -> bool;

    /// Releases the connection
    async fn disconnect(self);
}

/// Controller side: makes itself discoverable and accepts one central
pub trait Peripheral {
    type Session: Session;

    /// Advertises `name` and `service` every `interval` until a central connects
    async fn advertise(
        &mut self,
        name: &str,
        service: &Uuid,
        interval: Duration,
    ) -> Result<Self::Session, LinkError>;
}

/// A connected central, from the controller's point of view
pub trait Session {
    /// Resolves once the central is gone
    async fn disconnected(&mut self);
}

/// The controller's local channel values
pub trait ChannelStore {
    /// Replaces the value of `channel`, notifying subscribers if `notify` is set
    async fn write(
        &mut self,
        channel: &ChannelSpec,
        payload: &[u8],
        notify: bool,
    ) -> Result<(), LinkError>;
}
