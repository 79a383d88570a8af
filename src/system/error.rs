//! Error taxonomy
//!
//! Decode failures are local and recoverable: the reader discards the value.
//! Link errors are never fatal; the robot converts them into a fail-stop and a
//! fresh scan, the controller into a return to advertising.

use crate::system::schema::ChannelId;
use thiserror::Error;

/// A channel payload that is not a 2-byte signed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Nothing was read
    #[error("empty payload")]
    Empty,
    /// Payload length other than 2 bytes
    #[error("payload of {0} bytes, expected 2")]
    Length(usize),
}

/// Failures reported by the wireless transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The peer did not accept the connection in time
    #[error("connection timed out")]
    ConnectTimeout,
    /// A required channel could not be found on the peer
    #[error("could not resolve channel {0:?}")]
    ResolveTimeout(ChannelId),
    /// A channel read did not complete
    #[error("read of channel {0:?} timed out")]
    ReadTimeout(ChannelId),
    /// A local channel write was rejected
    #[error("write of channel {0:?} failed")]
    WriteFailed(ChannelId),
    /// The link dropped
    #[error("peer disconnected")]
    Disconnected,
    /// Advertising could not be started
    #[error("advertising failed")]
    AdvertiseFailed,
}
