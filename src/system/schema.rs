//! Schema Registry
//!
//! The fixed channel layout both roles agree on out of band. Identifiers are
//! compared by exact equality; a mismatch surfaces as a channel that cannot be
//! resolved, never as a value with a different meaning.
//!
//! | Channel      | Access              | UUID suffix |
//! |--------------|---------------------|-------------|
//! | drive        | read, notify        | `0001`      |
//! | pixelToggle  | read, write, notify | `0002`      |
//! | steering     | read, notify        | `0003`      |
//! | horn         | read, write, notify | `0004`      |

use uuid::Uuid;

/// Service advertised by the controller
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x19b10000_e8f2_537e_4f6c_d104768a1214);

/// Name the controller advertises and the robot matches (case-sensitive)
pub const DEVICE_NAME: &str = "ALVIK_REMOTE_CONTROLLER";

/// The four channels of the wire schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelId {
    /// Signed wheel-drive magnitude
    Drive,
    /// Signed steering bias, percent
    Steering,
    /// 1 = horn event, 0 = idle
    Horn,
    /// 1 = toggle event, 0 = idle
    PixelToggle,
}

/// Access modes of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl Access {
    const READ_NOTIFY: Self = Self {
        read: true,
        write: false,
        notify: true,
    };
    const READ_WRITE_NOTIFY: Self = Self {
        read: true,
        write: true,
        notify: true,
    };
}

/// Static description of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: ChannelId,
    pub uuid: Uuid,
    pub access: Access,
}

/// Number of channels in the wire schema
pub const CHANNEL_COUNT: usize = 4;

/// Every channel, in the order the robot reads them each poll iteration
pub static CHANNELS: [ChannelSpec; CHANNEL_COUNT] = [
    ChannelSpec {
        id: ChannelId::Horn,
        uuid: Uuid::from_u128(0x19b10004_e8f2_537e_4f6c_d104768a1214),
        access: Access::READ_WRITE_NOTIFY,
    },
    ChannelSpec {
        id: ChannelId::PixelToggle,
        uuid: Uuid::from_u128(0x19b10002_e8f2_537e_4f6c_d104768a1214),
        access: Access::READ_WRITE_NOTIFY,
    },
    ChannelSpec {
        id: ChannelId::Drive,
        uuid: Uuid::from_u128(0x19b10001_e8f2_537e_4f6c_d104768a1214),
        access: Access::READ_NOTIFY,
    },
    ChannelSpec {
        id: ChannelId::Steering,
        uuid: Uuid::from_u128(0x19b10003_e8f2_537e_4f6c_d104768a1214),
        access: Access::READ_NOTIFY,
    },
];

impl ChannelId {
    /// Static description of this channel
    pub fn spec(self) -> &'static ChannelSpec {
        &CHANNELS[self.index()]
    }

    /// Position in [`CHANNELS`]
    pub const fn index(self) -> usize {
        match self {
            ChannelId::Horn => 0,
            ChannelId::PixelToggle => 1,
            ChannelId::Drive => 2,
            ChannelId::Steering => 3,
        }
    }

    /// 128-bit identifier of the channel inside the service
    pub fn uuid(self) -> Uuid {
        self.spec().uuid
    }

    /// Operations the controller exposes on this channel
    pub fn access(self) -> Access {
        self.spec().access
    }

    /// Finds the channel with exactly this identifier
    pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
        CHANNELS.iter().find(|c| c.uuid == *uuid).map(|c| c.id)
    }
}

/// Which optional channels a deployment carries
///
/// `drive` and `steering` are always present. Leaving out `horn` or
/// `pixelToggle` is a configuration fact: the robot neither resolves nor reads
/// them and the corresponding overlay never triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub horn: bool,
    pub pixels: bool,
}

impl Schema {
    /// All four channels
    pub const FULL: Self = Self {
        horn: true,
        pixels: true,
    };

    /// Drive and steering only
    pub const DRIVE_ONLY: Self = Self {
        horn: false,
        pixels: false,
    };

    /// Whether the controller carries `id`; drive and steering always are
    pub const fn contains(&self, id: ChannelId) -> bool {
        match id {
            ChannelId::Drive | ChannelId::Steering => true,
            ChannelId::Horn => self.horn,
            ChannelId::PixelToggle => self.pixels,
        }
    }

    /// Channels present in this schema, in poll order
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        CHANNELS
            .iter()
            .map(|c| c.id)
            .filter(move |id| self.contains(*id))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::FULL
    }
}
