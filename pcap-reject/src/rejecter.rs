use std::sync::Arc;

use libreject_tools::{Config, Error, Packet, PacketHandler, Verdict};
use tracing::{debug, info, trace};

use crate::classify::{classify, Transport};
use crate::reject::synthesize;
use crate::report::Reporter;
use crate::templates::RejectTemplates;

/// Counters kept by the rejecter, per response kind
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RejectStats {
    pub tcp_resets: usize,
    pub port_unreachables: usize,
    pub dropped: usize,
    pub ignored: usize,
    pub unrecognized: usize,
}

/// Packet handler forging reject responses
///
/// Packets without an IP header are skipped silently. All other packets are
/// reported, then answered according to their transport protocol.
pub struct Rejecter {
    templates: Arc<RejectTemplates>,
    reporter: Option<Reporter>,
    stats: RejectStats,
}

impl Rejecter {
    pub fn new(templates: Arc<RejectTemplates>, config: &Config) -> Self {
        let report = config.get_bool("report.enabled").unwrap_or(true);
        let reporter = if report {
            Some(Reporter::default())
        } else {
            None
        };
        Rejecter::with_reporter(templates, reporter)
    }

    pub fn with_reporter(templates: Arc<RejectTemplates>, reporter: Option<Reporter>) -> Self {
        Rejecter {
            templates,
            reporter,
            stats: RejectStats::default(),
        }
    }

    pub fn stats(&self) -> &RejectStats {
        &self.stats
    }
}

impl PacketHandler for Rejecter {
    fn init(&mut self) -> Result<(), Error> {
        debug!(
            "Rejecter: reporting {}",
            if self.reporter.is_some() { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    fn handle_packet(&mut self, packet: &Packet) -> Result<Verdict, Error> {
        let view = match classify(packet.data) {
            Some(view) => view,
            None => {
                trace!("Rejecter: packet {} is not an IP packet", packet.index);
                self.stats.unrecognized += 1;
                return Ok(Verdict::Skip);
            }
        };
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.report(&view);
        }
        let verdict = synthesize(&self.templates, &view, &packet.meta)?;
        match (&verdict, &view.transport) {
            (Verdict::Reply(_), Transport::Tcp(_)) => self.stats.tcp_resets += 1,
            (Verdict::Reply(_), _) => self.stats.port_unreachables += 1,
            (Verdict::Drop, _) => self.stats.dropped += 1,
            (Verdict::Ignore, _) => self.stats.ignored += 1,
            (Verdict::Skip, _) => self.stats.unrecognized += 1,
        }
        Ok(verdict)
    }

    fn teardown(&mut self) {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.flush();
        }
        let s = &self.stats;
        info!("Rejecter: TCP resets: {}", s.tcp_resets);
        info!("Rejecter: port unreachable messages: {}", s.port_unreachables);
        info!("Rejecter: ICMP dropped: {}", s.dropped);
        info!("Rejecter: ignored: {}, unrecognized: {}", s.ignored, s.unrecognized);
    }
}
