use crate::error::Error;
use crate::packet::{CaptureMetadata, Packet};

/// A forged packet, ready to be injected
#[derive(Debug)]
pub struct Reply {
    /// Short description of the reply, used in diagnostics (ex: "TCP reset")
    pub what: &'static str,
    pub data: Vec<u8>,
    /// Metadata to send with. The direction is already decided.
    pub meta: CaptureMetadata,
}

/// Decision emitted by a [`PacketHandler`] for a received packet
#[derive(Debug)]
pub enum Verdict {
    /// Send a reply packet
    Reply(Reply),
    /// Consume the packet without reply
    Drop,
    /// Packet recognized but not acted upon
    Ignore,
    /// Packet was not recognized (no IP header). Not reported.
    Skip,
}

/// Common trait for packet handlers driven by a dispatch engine
pub trait PacketHandler {
    /// Initialization function, called before receiving packets (optional)
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Callback function for every received packet
    ///
    /// Errors are recoverable: the engine logs them and goes on with the next packet.
    fn handle_packet(&mut self, packet: &Packet) -> Result<Verdict, Error>;

    /// Teardown function, called when the engine stops (optional)
    fn teardown(&mut self) {}
}
