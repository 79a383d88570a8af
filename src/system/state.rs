//! Link State Management
//!
//! The robot's discovery and connection lifecycle as a tagged state plus a pure
//! transition function. The async driver in [`crate::task::remote_link`] performs
//! the suspending work of each state and feeds the outcome back in as a
//! [`LinkEvent`]; this module decides where that leads.
//!
//! ```text
//! Scanning          --PeerFound-->     Connecting
//! Scanning          --ScanExpired-->   Scanning
//! Connecting        --Connected-->     ResolvingChannels
//! Connecting        --ConnectFailed--> Scanning
//! ResolvingChannels --Resolved-->      Polling
//! ResolvingChannels --ResolveFailed--> Disconnected
//! Polling           --IterationDone--> Polling
//! Polling           --LinkLost-->      Disconnected
//! Disconnected      --Released-->      Scanning
//! ```
//!
//! There is no terminal state: the machine scans again forever.

/// Robot-side link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Listening for the controller's advertised name
    #[default]
    Scanning,
    /// Opening a connection to the matched peer
    Connecting,
    /// Looking up the configured channels on the peer
    ResolvingChannels,
    /// Steady state: read channels, mix, apply
    Polling,
    /// Link lost; entered only through the fail-stop, then the connection is released
    Disconnected,
}

/// Outcomes of the work done in a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A peer advertising the expected name was seen
    PeerFound,
    /// The scan window closed without a match
    ScanExpired,
    /// The connect handshake completed
    Connected,
    /// The connect attempt timed out or was refused
    ConnectFailed,
    /// Every configured channel was found on the peer
    Resolved,
    /// A configured channel is missing or the lookup timed out
    ResolveFailed,
    /// A full poll iteration completed
    IterationDone,
    /// A read failed or the peer reported the link closed
    LinkLost,
    /// The connection was released after the fail-stop
    Released,
}

impl LinkState {
    /// Pure transition function
    ///
    /// Events that make no sense in the current state leave it unchanged.
    pub fn next(self, event: LinkEvent) -> LinkState {
        use LinkEvent as E;
        use LinkState as S;

        match (self, event) {
            (S::Scanning, E::PeerFound) => S::Connecting,
            (S::Scanning, E::ScanExpired) => S::Scanning,
            (S::Connecting, E::Connected) => S::ResolvingChannels,
            // robot is already stopped while connecting
            (S::Connecting, E::ConnectFailed) => S::Scanning,
            (S::ResolvingChannels, E::Resolved) => S::Polling,
            (S::ResolvingChannels, E::ResolveFailed) => S::Disconnected,
            (S::Polling, E::IterationDone) => S::Polling,
            (S::Polling, E::LinkLost) => S::Disconnected,
            (S::Disconnected, E::Released) => S::Scanning,
            (state, _) => state,
        }
    }

    /// Whether entering this state requires the fail-stop action before
    /// anything else
    pub fn requires_fail_stop(self) -> bool {
        self == LinkState::Disconnected
    }
}
