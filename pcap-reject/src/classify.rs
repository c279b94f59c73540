use pnet_packet::icmp::IcmpPacket;
use pnet_packet::icmpv6::Icmpv6Packet;
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;
use pnet_packet::udp::UdpPacket;
use pnet_packet::Packet;
use tracing::trace;

use crate::templates::{IPV4_HEADER_LEN, IPV6_HEADER_LEN, TCP_HEADER_LEN};

/// Network layer of a classified packet. Exactly one IP family is present.
pub enum IpHeader<'a> {
    V4(Ipv4Packet<'a>),
    V6(Ipv6Packet<'a>),
}

/// Innermost recognized header
///
/// ICMP is only recognized over IPv4, and ICMPv6 only over IPv6.
pub enum Transport<'a> {
    Tcp(TcpPacket<'a>),
    Udp(UdpPacket<'a>),
    Icmp(IcmpPacket<'a>),
    Icmpv6(Icmpv6Packet<'a>),
    /// Upper-layer protocol not recognized, truncated, or not reachable
    /// (fragment, encrypted payload)
    Other(IpNextHeaderProtocol),
}

/// Read-only typed view over a received IP packet
pub struct PacketView<'a> {
    /// The IP datagram, link-layer padding removed
    pub data: &'a [u8],
    pub ip: IpHeader<'a>,
    pub transport: Transport<'a>,
    /// Number of bytes following the innermost recognized header
    pub payload_len: usize,
}

impl<'a> PacketView<'a> {
    pub fn is_ipv4(&self) -> bool {
        matches!(self.ip, IpHeader::V4(_))
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.ip, IpHeader::V6(_))
    }
}

/// Classify a raw IP packet
///
/// Returns `None` if neither an IPv4 nor an IPv6 header can be read.
pub fn classify(data: &[u8]) -> Option<PacketView> {
    match data.first()? >> 4 {
        4 => classify_ipv4(data),
        6 => classify_ipv6(data),
        _ => None,
    }
}

fn classify_ipv4(data: &[u8]) -> Option<PacketView> {
    let ipv4 = Ipv4Packet::new(data)?;
    let header_len = ipv4.get_header_length() as usize * 4;
    if header_len < IPV4_HEADER_LEN || header_len > data.len() {
        trace!("IPv4: invalid header length {}", header_len);
        return None;
    }
    // remove padding, and do not trust a length larger than what was captured
    let total_len = (ipv4.get_total_length() as usize).clamp(header_len, data.len());
    let data = &data[..total_len];
    let ipv4 = Ipv4Packet::new(data)?;
    let l4_proto = ipv4.get_next_level_protocol();
    let l4_data = &data[header_len..];
    let (transport, payload_len) = if ipv4.get_fragment_offset() != 0 {
        // no transport header in non-first fragments
        (Transport::Other(l4_proto), l4_data.len())
    } else {
        match l4_proto {
            IpNextHeaderProtocols::Tcp => classify_tcp(l4_data),
            IpNextHeaderProtocols::Udp => classify_udp(l4_data),
            IpNextHeaderProtocols::Icmp => match IcmpPacket::new(l4_data) {
                Some(icmp) => {
                    let len = icmp.payload().len();
                    (Transport::Icmp(icmp), len)
                }
                None => (Transport::Other(l4_proto), l4_data.len()),
            },
            _ => (Transport::Other(l4_proto), l4_data.len()),
        }
    };
    Some(PacketView {
        data,
        ip: IpHeader::V4(ipv4),
        transport,
        payload_len,
    })
}

fn classify_ipv6(data: &[u8]) -> Option<PacketView> {
    let ipv6 = Ipv6Packet::new(data)?;
    let payload_length = ipv6.get_payload_length() as usize;
    let total_len = if payload_length == 0 {
        // jumbogram ? (rfc2675)
        data.len()
    } else {
        (IPV6_HEADER_LEN + payload_length).min(data.len())
    };
    let data = &data[..total_len];
    let ipv6 = Ipv6Packet::new(data)?;
    let (transport, payload_len) =
        match skip_extension_headers(ipv6.get_next_header(), &data[IPV6_HEADER_LEN..]) {
            Some((IpNextHeaderProtocols::Tcp, l4_data)) => classify_tcp(l4_data),
            Some((IpNextHeaderProtocols::Udp, l4_data)) => classify_udp(l4_data),
            Some((IpNextHeaderProtocols::Icmpv6, l4_data)) => match Icmpv6Packet::new(l4_data) {
                Some(icmpv6) => {
                    let len = icmpv6.payload().len();
                    (Transport::Icmpv6(icmpv6), len)
                }
                None => (Transport::Other(IpNextHeaderProtocols::Icmpv6), l4_data.len()),
            },
            Some((l4_proto, l4_data)) => (Transport::Other(l4_proto), l4_data.len()),
            None => (
                Transport::Other(ipv6.get_next_header()),
                data.len() - IPV6_HEADER_LEN,
            ),
        };
    Some(PacketView {
        data,
        ip: IpHeader::V6(ipv6),
        transport,
        payload_len,
    })
}

fn is_skippable_extension(proto: IpNextHeaderProtocol) -> bool {
    matches!(
        proto,
        IpNextHeaderProtocols::Hopopt
            | IpNextHeaderProtocols::Ipv6Route
            | IpNextHeaderProtocols::Ipv6Opts
    )
}

/// Walk the IPv6 extension headers that have the generic (next header, length) layout
///
/// Fragment, ESP and AH headers stop the walk. Returns `None` if the chain is truncated.
fn skip_extension_headers(
    mut proto: IpNextHeaderProtocol,
    mut data: &[u8],
) -> Option<(IpNextHeaderProtocol, &[u8])> {
    while is_skippable_extension(proto) {
        let (next_header, ext_len) = match data {
            [next_header, hdr_ext_len, ..] => (*next_header, (*hdr_ext_len as usize + 1) * 8),
            _ => return None,
        };
        if ext_len > data.len() {
            return None;
        }
        trace!("IPv6: skipping extension header {} ({} bytes)", proto, ext_len);
        proto = IpNextHeaderProtocol::new(next_header);
        data = &data[ext_len..];
    }
    Some((proto, data))
}

fn classify_tcp(data: &[u8]) -> (Transport, usize) {
    if let Some(tcp) = TcpPacket::new(data) {
        let header_len = tcp.get_data_offset() as usize * 4;
        if header_len >= TCP_HEADER_LEN && header_len <= data.len() {
            return (Transport::Tcp(tcp), data.len() - header_len);
        }
    }
    (Transport::Other(IpNextHeaderProtocols::Tcp), data.len())
}

fn classify_udp(data: &[u8]) -> (Transport, usize) {
    match UdpPacket::new(data) {
        Some(udp) => {
            let len = udp.payload().len();
            (Transport::Udp(udp), len)
        }
        None => (Transport::Other(IpNextHeaderProtocols::Udp), data.len()),
    }
}
