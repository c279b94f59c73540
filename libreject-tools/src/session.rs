use crate::error::Error;
use crate::packet::CaptureMetadata;

/// A filter session opened on a capture/diversion layer
///
/// A session delivers the packets matching its filter expression, and can
/// inject packets back into the network stack. Opening a session is specific
/// to each backend (see for ex. `libreject-live`), and must report
/// [`Error::InvalidFilterSyntax`] or [`Error::DriverOpenFailed`].
pub trait DivertSession {
    /// Block until a matching packet is available, and copy it into `buf`
    ///
    /// Returns the number of bytes written (the packet starts at the IP header)
    /// and the capture metadata.
    fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, CaptureMetadata), Error>;

    /// Inject `data` (an IP packet) using the direction and interface from `meta`
    fn send(&mut self, data: &[u8], meta: &CaptureMetadata) -> Result<(), Error>;
}

impl<S: DivertSession + ?Sized> DivertSession for Box<S> {
    fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, CaptureMetadata), Error> {
        (**self).recv(buf)
    }

    fn send(&mut self, data: &[u8], meta: &CaptureMetadata) -> Result<(), Error> {
        (**self).send(data, meta)
    }
}
