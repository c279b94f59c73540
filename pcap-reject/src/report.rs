//! Per-packet diagnostic lines
//!
//! Every intercepted packet with an IP header produces one line, naming the
//! protocol fields and their values:
//!
//! ```text
//! BLOCK ip.SrcAddr=10.0.0.1 ip.DstAddr=93.184.216.34 tcp.SrcPort=1234 tcp.DstPort=80 tcp.Flags=[SYN]
//! ```

use std::fmt;
use std::io::{self, Write};

use pnet_packet::tcp::TcpFlags;
use tracing::debug;

use crate::classify::{IpHeader, PacketView, Transport};

const TCP_FLAG_NAMES: [(u8, &str); 6] = [
    (TcpFlags::FIN, "FIN"),
    (TcpFlags::RST, "RST"),
    (TcpFlags::URG, "URG"),
    (TcpFlags::SYN, "SYN"),
    (TcpFlags::PSH, "PSH"),
    (TcpFlags::ACK, "ACK"),
];

/// Display adapter for the report line of a classified packet
pub struct BlockReport<'a, 'b>(pub &'a PacketView<'b>);

impl fmt::Display for BlockReport<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let view = self.0;
        f.write_str("BLOCK")?;
        match &view.ip {
            IpHeader::V4(ip) => write!(
                f,
                " ip.SrcAddr={} ip.DstAddr={}",
                ip.get_source(),
                ip.get_destination()
            )?,
            IpHeader::V6(ip) => write!(
                f,
                " ipv6.SrcAddr={} ipv6.DstAddr={}",
                ip.get_source(),
                ip.get_destination()
            )?,
        }
        match &view.transport {
            Transport::Tcp(tcp) => {
                write!(
                    f,
                    " tcp.SrcPort={} tcp.DstPort={} tcp.Flags=",
                    tcp.get_source(),
                    tcp.get_destination()
                )?;
                let flags = tcp.get_flags();
                for (flag, name) in TCP_FLAG_NAMES {
                    if flags & flag != 0 {
                        write!(f, "[{name}]")?;
                    }
                }
            }
            Transport::Udp(udp) => write!(
                f,
                " udp.SrcPort={} udp.DstPort={}",
                udp.get_source(),
                udp.get_destination()
            )?,
            Transport::Icmp(icmp) => write!(
                f,
                " icmp.Type={} icmp.Code={}",
                icmp.get_icmp_type().0,
                icmp.get_icmp_code().0
            )?,
            Transport::Icmpv6(icmpv6) => write!(
                f,
                " icmpv6.Type={} icmpv6.Code={}",
                icmpv6.get_icmpv6_type().0,
                icmpv6.get_icmpv6_code().0
            )?,
            Transport::Other(proto) => write!(f, " ip.Protocol={}", proto.0)?,
        }
        Ok(())
    }
}

/// Writes report lines to an output stream (stdout by default)
pub struct Reporter {
    out: Box<dyn Write + Send>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::new(Box::new(io::stdout()))
    }
}

impl Reporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Reporter { out }
    }

    /// Write the report line of a packet. Output errors are not fatal.
    pub fn report(&mut self, view: &PacketView) {
        if let Err(e) = writeln!(self.out, "{}", BlockReport(view)) {
            debug!("could not write report line: {e}");
        }
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }
}
