//! Reject response synthesis
//!
//! Turns a classified packet into the reply that terminates its flow: a TCP
//! reset for TCP, a port unreachable message for UDP, and nothing for ICMP.
//! Synthesis is pure: it reads the original packet and the shared templates,
//! and returns a fresh buffer. No state is kept between packets.

use libreject_tools::{CaptureMetadata, Direction, Error, Reply, Verdict};
use pnet_packet::ipv4::{Ipv4Packet, MutableIpv4Packet};
use pnet_packet::ipv6::{Ipv6Packet, MutableIpv6Packet};
use pnet_packet::tcp::{MutableTcpPacket, TcpFlags, TcpPacket};

use crate::checksum::recompute_checksums;
use crate::classify::{IpHeader, PacketView, Transport};
use crate::templates::*;

pub const TCP_RESET: &str = "TCP reset";
pub const ICMP_UNREACHABLE: &str = "ICMP message";
pub const ICMPV6_UNREACHABLE: &str = "ICMPv6 message";

/// Build the response to a classified packet
///
/// Returns `Verdict::Drop` for ICMP and ICMPv6 packets, and `Verdict::Ignore`
/// when no transport header was recognized.
pub fn synthesize(
    templates: &RejectTemplates,
    view: &PacketView,
    meta: &CaptureMetadata,
) -> Result<Verdict, Error> {
    let reply = match (&view.ip, &view.transport) {
        (ip, Transport::Tcp(tcp)) => tcp_reset(templates, ip, tcp, view.payload_len, meta)?,
        (IpHeader::V4(ipv4), Transport::Udp(_)) => icmp_unreachable(templates, ipv4, view.data, meta)?,
        (IpHeader::V6(ipv6), Transport::Udp(_)) => {
            icmpv6_unreachable(templates, ipv6, view.data, meta)?
        }
        (_, Transport::Icmp(_)) | (_, Transport::Icmpv6(_)) => return Ok(Verdict::Drop),
        (_, Transport::Other(_)) => return Ok(Verdict::Ignore),
    };
    Ok(Verdict::Reply(reply))
}

/// Sequence and acknowledgment numbers of a reset answering `tcp`
pub fn reset_numbers(tcp: &TcpPacket, payload_len: usize) -> (u32, u32) {
    let flags = tcp.get_flags();
    let seq = if flags & TcpFlags::ACK != 0 {
        tcp.get_acknowledgement()
    } else {
        0
    };
    let ack = if flags & TcpFlags::SYN != 0 {
        tcp.get_sequence().wrapping_add(1)
    } else {
        tcp.get_sequence().wrapping_add(payload_len as u32)
    };
    (seq, ack)
}

fn tcp_reset(
    templates: &RejectTemplates,
    ip: &IpHeader,
    tcp: &TcpPacket,
    payload_len: usize,
    meta: &CaptureMetadata,
) -> Result<Reply, Error> {
    let (mut data, ip_len) = match ip {
        IpHeader::V4(ipv4) => {
            let mut data = templates.ipv4_tcp_reset().instantiate(0);
            let mut out = MutableIpv4Packet::new(&mut data).ok_or(Error::Truncated("IPv4 reset"))?;
            out.set_source(ipv4.get_destination());
            out.set_destination(ipv4.get_source());
            (data, IPV4_HEADER_LEN)
        }
        IpHeader::V6(ipv6) => {
            let mut data = templates.ipv6_tcp_reset().instantiate(0);
            let mut out = MutableIpv6Packet::new(&mut data).ok_or(Error::Truncated("IPv6 reset"))?;
            out.set_source(ipv6.get_destination());
            out.set_destination(ipv6.get_source());
            (data, IPV6_HEADER_LEN)
        }
    };
    let (seq, ack) = reset_numbers(tcp, payload_len);
    let mut out =
        MutableTcpPacket::new(&mut data[ip_len..]).ok_or(Error::Truncated("TCP reset"))?;
    out.set_source(tcp.get_destination());
    out.set_destination(tcp.get_source());
    out.set_sequence(seq);
    out.set_acknowledgement(ack);
    recompute_checksums(&mut data)?;
    Ok(Reply {
        what: TCP_RESET,
        data,
        meta: meta.with_direction(meta.direction.reverse()),
    })
}

fn icmp_unreachable(
    templates: &RejectTemplates,
    ipv4: &Ipv4Packet,
    original: &[u8],
    meta: &CaptureMetadata,
) -> Result<Reply, Error> {
    let template = templates.ipv4_icmp_unreachable();
    // original IP header (with options) and the first 8 bytes of its payload
    let copy_len = ipv4.get_header_length() as usize * 4 + UDP_HEADER_LEN;
    let excerpt = original
        .get(..copy_len)
        .ok_or(Error::Truncated("UDP datagram embedded in ICMP message"))?;
    let mut data = template.instantiate(copy_len);
    data[template.len()..].copy_from_slice(excerpt);
    let total_len = u16::try_from(data.len()).map_err(|_| Error::Unsupported("ICMP message length"))?;
    let mut out = MutableIpv4Packet::new(&mut data).ok_or(Error::Truncated("ICMP message"))?;
    out.set_total_length(total_len);
    out.set_source(ipv4.get_destination());
    out.set_destination(ipv4.get_source());
    recompute_checksums(&mut data)?;
    Ok(Reply {
        what: ICMP_UNREACHABLE,
        data,
        // replies cannot be injected inbound on every platform
        meta: meta.with_direction(Direction::Outbound),
    })
}

fn icmpv6_unreachable(
    templates: &RejectTemplates,
    ipv6: &Ipv6Packet,
    original: &[u8],
    meta: &CaptureMetadata,
) -> Result<Reply, Error> {
    let template = templates.ipv6_icmpv6_unreachable();
    let mut data = template.instantiate(ICMPV6_EMBEDDED_LEN);
    // shorter originals leave the end of the excerpt zeroed
    let copy_len = original.len().min(ICMPV6_EMBEDDED_LEN);
    let start = template.len();
    data[start..start + copy_len].copy_from_slice(&original[..copy_len]);
    let mut out = MutableIpv6Packet::new(&mut data).ok_or(Error::Truncated("ICMPv6 message"))?;
    out.set_source(ipv6.get_destination());
    out.set_destination(ipv6.get_source());
    recompute_checksums(&mut data)?;
    Ok(Reply {
        what: ICMPV6_UNREACHABLE,
        data,
        meta: meta.with_direction(Direction::Outbound),
    })
}
