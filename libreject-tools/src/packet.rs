use pnet_base::MacAddr;
use std::fmt;

/// Direction in which a packet was seen by the capture layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Packet arriving from the network toward the local host
    Inbound,
    /// Packet leaving the local host
    Outbound,
}

impl Direction {
    /// The opposite direction: a reply travels back toward the sender
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Inbound => Direction::Outbound,
            Direction::Outbound => Direction::Inbound,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
        }
    }
}

/// Link-layer context of a captured packet, needed by backends that must
/// rebuild a frame around the IP packet they send
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkContext {
    /// Raw IP, no link-layer header
    #[default]
    None,
    /// Ethernet II frame
    Ethernet {
        source: MacAddr,
        destination: MacAddr,
    },
}

/// Metadata attached to a packet by the capture layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureMetadata {
    pub direction: Direction,
    /// Index of the interface the packet was captured on
    pub interface: u32,
    pub sub_interface: u32,
    pub link: LinkContext,
}

impl CaptureMetadata {
    pub fn new(direction: Direction) -> Self {
        CaptureMetadata {
            direction,
            interface: 0,
            sub_interface: 0,
            link: LinkContext::None,
        }
    }

    /// Copy of this metadata with another direction
    pub fn with_direction(&self, direction: Direction) -> Self {
        CaptureMetadata {
            direction,
            ..self.clone()
        }
    }
}

/// A packet received from a divert session. `data` starts at the IP header.
pub struct Packet<'a> {
    pub meta: CaptureMetadata,
    pub data: &'a [u8],
    /// Index of the packet since the session was opened (starting at 1)
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_reverse() {
        assert_eq!(Direction::Inbound.reverse(), Direction::Outbound);
        assert_eq!(Direction::Outbound.reverse(), Direction::Inbound);
        assert_eq!(Direction::Inbound.reverse().reverse(), Direction::Inbound);
        assert_eq!(Direction::Outbound.to_string(), "outbound");
    }

    #[test]
    fn metadata_with_direction() {
        let mut meta = CaptureMetadata::new(Direction::Inbound);
        meta.interface = 7;
        meta.link = LinkContext::Ethernet {
            source: MacAddr::new(0, 1, 2, 3, 4, 5),
            destination: MacAddr::broadcast(),
        };
        let out = meta.with_direction(Direction::Outbound);
        assert_eq!(out.direction, Direction::Outbound);
        assert_eq!(out.interface, 7);
        assert_eq!(out.link, meta.link);
    }
}
