//! Prototype reply packets
//!
//! Each template is a zero-initialized buffer holding the headers of a reply,
//! with the fields that never change between replies already set. Templates are
//! never modified once built: synthesis works on a copy (see
//! [`ResponseTemplate::instantiate`]), so they can be shared between workers.

use pnet_packet::icmp::{IcmpCode, IcmpTypes, MutableIcmpPacket};
use pnet_packet::icmpv6::{Icmpv6Code, Icmpv6Types, MutableIcmpv6Packet};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::MutableIpv4Packet;
use pnet_packet::ipv6::MutableIpv6Packet;
use pnet_packet::tcp::{MutableTcpPacket, TcpFlags};

pub const IPV4_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const TCP_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
/// ICMP destination unreachable header: type, code, checksum, 4 unused bytes
pub const ICMP_UNREACHABLE_HEADER_LEN: usize = 8;
pub const ICMPV6_HEADER_LEN: usize = 4;
/// Unused field following the ICMPv6 header in error messages
pub const ICMPV6_UNUSED_LEN: usize = 4;
/// Size of the original datagram excerpt carried by an ICMPv6 unreachable message
pub const ICMPV6_EMBEDDED_LEN: usize = IPV6_HEADER_LEN + TCP_HEADER_LEN;

pub const IPV4_TCP_RESET_LEN: usize = IPV4_HEADER_LEN + TCP_HEADER_LEN;
pub const IPV4_ICMP_UNREACHABLE_LEN: usize = IPV4_HEADER_LEN + ICMP_UNREACHABLE_HEADER_LEN;
pub const IPV6_TCP_RESET_LEN: usize = IPV6_HEADER_LEN + TCP_HEADER_LEN;
pub const IPV6_ICMPV6_UNREACHABLE_LEN: usize =
    IPV6_HEADER_LEN + ICMPV6_HEADER_LEN + ICMPV6_UNUSED_LEN;
/// IPv6 payload length of an ICMPv6 unreachable message
pub const ICMPV6_UNREACHABLE_PAYLOAD_LEN: usize =
    ICMPV6_HEADER_LEN + ICMPV6_UNUSED_LEN + ICMPV6_EMBEDDED_LEN;

pub const IPV4_IDENTIFICATION: u16 = 0xDEAD;
pub const DEFAULT_TTL: u8 = 64;

const ICMP_PORT_UNREACHABLE: u8 = 3;
const ICMPV6_PORT_UNREACHABLE: u8 = 4;

/// An immutable prototype reply packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseTemplate {
    bytes: Box<[u8]>,
}

impl ResponseTemplate {
    fn new(bytes: Vec<u8>) -> Self {
        ResponseTemplate {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Return a fresh working copy of the template, followed by `extra` zero bytes
    pub fn instantiate(&self, extra: usize) -> Vec<u8> {
        let mut v = Vec::with_capacity(self.bytes.len() + extra);
        v.extend_from_slice(&self.bytes);
        v.resize(self.bytes.len() + extra, 0);
        v
    }
}

fn init_ipv4(buf: &mut [u8], protocol: IpNextHeaderProtocol, total_length: Option<u16>) {
    let mut ip = MutableIpv4Packet::new(buf).expect("template buffer holds an IPv4 header");
    ip.set_version(4);
    ip.set_header_length((IPV4_HEADER_LEN / 4) as u8);
    ip.set_identification(IPV4_IDENTIFICATION);
    ip.set_ttl(DEFAULT_TTL);
    ip.set_next_level_protocol(protocol);
    if let Some(len) = total_length {
        ip.set_total_length(len);
    }
}

fn init_ipv6(buf: &mut [u8], next_header: IpNextHeaderProtocol, payload_length: u16) {
    let mut ip = MutableIpv6Packet::new(buf).expect("template buffer holds an IPv6 header");
    ip.set_version(6);
    ip.set_hop_limit(DEFAULT_TTL);
    ip.set_next_header(next_header);
    ip.set_payload_length(payload_length);
}

fn init_tcp_reset(buf: &mut [u8]) {
    let mut tcp = MutableTcpPacket::new(buf).expect("template buffer holds a TCP header");
    tcp.set_data_offset((TCP_HEADER_LEN / 4) as u8);
    tcp.set_flags(TcpFlags::RST | TcpFlags::ACK);
}

/// IPv4 + TCP, RST and ACK set
pub fn build_ipv4_tcp_reset() -> ResponseTemplate {
    let mut buf = vec![0u8; IPV4_TCP_RESET_LEN];
    init_ipv4(
        &mut buf,
        IpNextHeaderProtocols::Tcp,
        Some(IPV4_TCP_RESET_LEN as u16),
    );
    init_tcp_reset(&mut buf[IPV4_HEADER_LEN..]);
    ResponseTemplate::new(buf)
}

/// IPv4 + ICMP destination unreachable (port unreachable)
///
/// The total length depends on the embedded datagram, and is set for each reply.
pub fn build_ipv4_icmp_unreachable() -> ResponseTemplate {
    let mut buf = vec![0u8; IPV4_ICMP_UNREACHABLE_LEN];
    init_ipv4(&mut buf, IpNextHeaderProtocols::Icmp, None);
    let mut icmp = MutableIcmpPacket::new(&mut buf[IPV4_HEADER_LEN..])
        .expect("template buffer holds an ICMP header");
    icmp.set_icmp_type(IcmpTypes::DestinationUnreachable);
    icmp.set_icmp_code(IcmpCode::new(ICMP_PORT_UNREACHABLE));
    ResponseTemplate::new(buf)
}

/// IPv6 + TCP, RST and ACK set
pub fn build_ipv6_tcp_reset() -> ResponseTemplate {
    let mut buf = vec![0u8; IPV6_TCP_RESET_LEN];
    init_ipv6(
        &mut buf,
        IpNextHeaderProtocols::Tcp,
        TCP_HEADER_LEN as u16,
    );
    init_tcp_reset(&mut buf[IPV6_HEADER_LEN..]);
    ResponseTemplate::new(buf)
}

/// IPv6 + ICMPv6 destination unreachable (port unreachable)
///
/// The embedded excerpt has a fixed size, so the payload length is fixed too.
pub fn build_ipv6_icmpv6_unreachable() -> ResponseTemplate {
    let mut buf = vec![0u8; IPV6_ICMPV6_UNREACHABLE_LEN];
    init_ipv6(
        &mut buf,
        IpNextHeaderProtocols::Icmpv6,
        ICMPV6_UNREACHABLE_PAYLOAD_LEN as u16,
    );
    let mut icmpv6 = MutableIcmpv6Packet::new(&mut buf[IPV6_HEADER_LEN..])
        .expect("template buffer holds an ICMPv6 header");
    icmpv6.set_icmpv6_type(Icmpv6Types::DestinationUnreachable);
    icmpv6.set_icmpv6_code(Icmpv6Code::new(ICMPV6_PORT_UNREACHABLE));
    ResponseTemplate::new(buf)
}

/// The four reply prototypes, built once at startup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectTemplates {
    ipv4_tcp_reset: ResponseTemplate,
    ipv4_icmp_unreachable: ResponseTemplate,
    ipv6_tcp_reset: ResponseTemplate,
    ipv6_icmpv6_unreachable: ResponseTemplate,
}

impl Default for RejectTemplates {
    fn default() -> Self {
        RejectTemplates::new()
    }
}

impl RejectTemplates {
    pub fn new() -> Self {
        RejectTemplates {
            ipv4_tcp_reset: build_ipv4_tcp_reset(),
            ipv4_icmp_unreachable: build_ipv4_icmp_unreachable(),
            ipv6_tcp_reset: build_ipv6_tcp_reset(),
            ipv6_icmpv6_unreachable: build_ipv6_icmpv6_unreachable(),
        }
    }

    pub fn ipv4_tcp_reset(&self) -> &ResponseTemplate {
        &self.ipv4_tcp_reset
    }

    pub fn ipv4_icmp_unreachable(&self) -> &ResponseTemplate {
        &self.ipv4_icmp_unreachable
    }

    pub fn ipv6_tcp_reset(&self) -> &ResponseTemplate {
        &self.ipv6_tcp_reset
    }

    pub fn ipv6_icmpv6_unreachable(&self) -> &ResponseTemplate {
        &self.ipv6_icmpv6_unreachable
    }
}
