//! Packet builders for unit tests

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet_packet::icmp::{IcmpCode, IcmpType, MutableIcmpPacket};
use pnet_packet::icmpv6::{Icmpv6Code, Icmpv6Type, MutableIcmpv6Packet};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::MutableIpv4Packet;
use pnet_packet::ipv6::MutableIpv6Packet;
use pnet_packet::tcp::MutableTcpPacket;
use pnet_packet::udp::MutableUdpPacket;

pub use pnet_packet::tcp::TcpFlags;

use crate::checksum::recompute_checksums;

fn ipv4_packet(src: [u8; 4], dst: [u8; 4], proto: IpNextHeaderProtocol, l4: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 20 + l4.len()];
    {
        let mut ip = MutableIpv4Packet::new(&mut data).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length((20 + l4.len()) as u16);
        ip.set_identification(0x4242);
        ip.set_ttl(128);
        ip.set_next_level_protocol(proto);
        ip.set_source(Ipv4Addr::from(src));
        ip.set_destination(Ipv4Addr::from(dst));
    }
    data[20..].copy_from_slice(l4);
    recompute_checksums(&mut data).unwrap();
    data
}

fn ipv6_packet(src: Ipv6Addr, dst: Ipv6Addr, proto: IpNextHeaderProtocol, l4: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 40 + l4.len()];
    {
        let mut ip = MutableIpv6Packet::new(&mut data).unwrap();
        ip.set_version(6);
        ip.set_payload_length(l4.len() as u16);
        ip.set_next_header(proto);
        ip.set_hop_limit(255);
        ip.set_source(src);
        ip.set_destination(dst);
    }
    data[40..].copy_from_slice(l4);
    recompute_checksums(&mut data).unwrap();
    data
}

fn tcp_segment(sport: u16, dport: u16, seq: u32, ack: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut l4 = vec![0u8; 20 + payload.len()];
    let mut tcp = MutableTcpPacket::new(&mut l4).unwrap();
    tcp.set_source(sport);
    tcp.set_destination(dport);
    tcp.set_sequence(seq);
    tcp.set_acknowledgement(ack);
    tcp.set_data_offset(5);
    tcp.set_flags(flags);
    tcp.set_window(64240);
    tcp.set_payload(payload);
    l4
}

fn udp_datagram(sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let mut l4 = vec![0u8; 8 + payload.len()];
    let mut udp = MutableUdpPacket::new(&mut l4).unwrap();
    udp.set_source(sport);
    udp.set_destination(dport);
    udp.set_length((8 + payload.len()) as u16);
    udp.set_payload(payload);
    l4
}

#[allow(clippy::too_many_arguments)]
pub fn ipv4_tcp_packet(
    src: [u8; 4],
    dst: [u8; 4],
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
    let l4 = tcp_segment(sport, dport, seq, ack, flags, payload);
    ipv4_packet(src, dst, IpNextHeaderProtocols::Tcp, &l4)
}

pub fn ipv4_udp_packet(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let l4 = udp_datagram(sport, dport, payload);
    ipv4_packet(src, dst, IpNextHeaderProtocols::Udp, &l4)
}

/// ICMP message with 4 zero bytes of rest-of-header and no data
pub fn ipv4_icmp_packet(src: [u8; 4], dst: [u8; 4], icmp_type: u8, code: u8) -> Vec<u8> {
    let mut l4 = vec![0u8; 8];
    {
        let mut icmp = MutableIcmpPacket::new(&mut l4).unwrap();
        icmp.set_icmp_type(IcmpType::new(icmp_type));
        icmp.set_icmp_code(IcmpCode::new(code));
    }
    ipv4_packet(src, dst, IpNextHeaderProtocols::Icmp, &l4)
}

#[allow(clippy::too_many_arguments)]
pub fn ipv6_tcp_packet(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
    let l4 = tcp_segment(sport, dport, seq, ack, flags, payload);
    ipv6_packet(src, dst, IpNextHeaderProtocols::Tcp, &l4)
}

pub fn ipv6_udp_packet(src: Ipv6Addr, dst: Ipv6Addr, sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let l4 = udp_datagram(sport, dport, payload);
    ipv6_packet(src, dst, IpNextHeaderProtocols::Udp, &l4)
}

pub fn ipv6_icmpv6_packet(src: Ipv6Addr, dst: Ipv6Addr, icmpv6_type: u8, code: u8) -> Vec<u8> {
    let mut l4 = vec![0u8; 8];
    {
        let mut icmpv6 = MutableIcmpv6Packet::new(&mut l4).unwrap();
        icmpv6.set_icmpv6_type(Icmpv6Type::new(icmpv6_type));
        icmpv6.set_icmpv6_code(Icmpv6Code::new(code));
    }
    ipv6_packet(src, dst, IpNextHeaderProtocols::Icmpv6, &l4)
}
