use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::handler::{PacketHandler, Verdict};
use crate::packet::Packet;
use crate::session::DivertSession;

/// Default receive buffer size: the largest possible IP packet
pub const MAX_PACKET_SIZE: usize = 0xFFFF;

/// Outcome of one dispatch cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Receive timed out, no packet
    Idle,
    RecvFailed,
    /// Packet not recognized, nothing reported
    Skipped,
    HandlerFailed,
    Dropped,
    Ignored,
    Replied,
    SendFailed,
}

/// Counters maintained by the dispatch engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub ignored: usize,
    pub replies_sent: usize,
    pub recv_errors: usize,
    pub send_errors: usize,
    pub handler_errors: usize,
}

impl DispatchStats {
    pub fn log(&self) {
        info!("Dispatch: packets received: {}", self.received);
        info!("Dispatch: replies sent: {}", self.replies_sent);
        info!(
            "Dispatch: dropped: {}, ignored: {}, skipped: {}",
            self.dropped, self.ignored, self.skipped
        );
        if self.recv_errors + self.send_errors + self.handler_errors > 0 {
            warn!(
                "Dispatch: errors: recv {}, send {}, handler {}",
                self.recv_errors, self.send_errors, self.handler_errors
            );
        }
    }
}

/// Receive/handle/send loop over a divert session
///
/// `DispatchEngine` receives packets from a `DivertSession`, gives them to a
/// `PacketHandler`, and sends back the replies it produces. It processes one
/// packet at a time. Failures are never fatal: they are logged, counted, and
/// the engine goes on with the next packet. Packets are never retried.
///
/// ## example
///
/// ```
/// use libreject_tools::*;
///
/// struct Loopback(Vec<Vec<u8>>);
///
/// impl DivertSession for Loopback {
///     fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, CaptureMetadata), Error> {
///         let data = self.0.pop().ok_or(Error::Recv("empty".to_owned()))?;
///         buf[..data.len()].copy_from_slice(&data);
///         Ok((data.len(), CaptureMetadata::new(Direction::Inbound)))
///     }
///     fn send(&mut self, _data: &[u8], _meta: &CaptureMetadata) -> Result<(), Error> {
///         Ok(())
///     }
/// }
///
/// struct DropAll;
///
/// impl PacketHandler for DropAll {
///     fn handle_packet(&mut self, _packet: &Packet) -> Result<Verdict, Error> {
///         Ok(Verdict::Drop)
///     }
/// }
///
/// let config = Config::default();
/// let mut engine = DispatchEngine::new(Loopback(vec![vec![0x45; 20]]), DropAll, &config);
/// assert_eq!(engine.run_once(), Step::Dropped);
/// assert_eq!(engine.run_once(), Step::RecvFailed);
/// ```
pub struct DispatchEngine<S: DivertSession, H: PacketHandler> {
    session: S,
    handler: H,
    buffer: Vec<u8>,
    stats: DispatchStats,
}

impl<S: DivertSession, H: PacketHandler> DispatchEngine<S, H> {
    pub fn new(session: S, handler: H, config: &Config) -> Self {
        let buffer_size = config
            .get_usize("buffer_size")
            .unwrap_or(MAX_PACKET_SIZE)
            .max(1);
        DispatchEngine {
            session,
            handler,
            buffer: vec![0; buffer_size],
            stats: DispatchStats::default(),
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Receive one packet, handle it, and send the reply if any
    pub fn run_once(&mut self) -> Step {
        let (len, meta) = match self.session.recv(&mut self.buffer) {
            Ok(r) => r,
            Err(Error::Timeout) => return Step::Idle,
            Err(e) => {
                self.stats.recv_errors += 1;
                warn!("failed to read packet: {e}");
                return Step::RecvFailed;
            }
        };
        self.stats.received += 1;
        let len = len.min(self.buffer.len());
        let packet = Packet {
            meta,
            data: &self.buffer[..len],
            index: self.stats.received,
        };
        trace!(
            "Dispatch: packet {} ({} bytes, {})",
            packet.index,
            len,
            packet.meta.direction
        );
        let verdict = match self.handler.handle_packet(&packet) {
            Ok(v) => v,
            Err(e) => {
                self.stats.handler_errors += 1;
                warn!("failed to handle packet {}: {e}", packet.index);
                return Step::HandlerFailed;
            }
        };
        match verdict {
            Verdict::Skip => {
                self.stats.skipped += 1;
                Step::Skipped
            }
            Verdict::Drop => {
                self.stats.dropped += 1;
                Step::Dropped
            }
            Verdict::Ignore => {
                self.stats.ignored += 1;
                Step::Ignored
            }
            Verdict::Reply(reply) => match self.session.send(&reply.data, &reply.meta) {
                Ok(()) => {
                    self.stats.replies_sent += 1;
                    debug!(
                        "Dispatch: sent {} ({} bytes, {})",
                        reply.what,
                        reply.data.len(),
                        reply.meta.direction
                    );
                    Step::Replied
                }
                Err(e) => {
                    self.stats.send_errors += 1;
                    warn!("failed to send {}: {e}", reply.what);
                    Step::SendFailed
                }
            },
        }
    }

    /// Main loop: handle packets as long as `running` is `true`
    pub fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), Error> {
        self.handler.init()?;
        debug!("Dispatch: waiting for packets");
        while running.load(Ordering::SeqCst) {
            self.run_once();
        }
        self.handler.teardown();
        self.stats.log();
        Ok(())
    }
}
