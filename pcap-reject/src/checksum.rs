//! Checksum fixup for forged packets
//!
//! Computes the IPv4 header checksum and the upper-layer checksum (TCP, UDP and
//! ICMPv6 over the pseudo-header, ICMP over the message), and stores them in the
//! packet. The checksum fields are ignored during computation, so previous
//! values do not matter.

use std::net::IpAddr;
use std::ops::Range;

use libreject_tools::Error;
use pnet_packet::icmp::{self, IcmpPacket, MutableIcmpPacket};
use pnet_packet::icmpv6::{self, Icmpv6Packet, MutableIcmpv6Packet};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::{self, Ipv4Packet, MutableIpv4Packet};
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::{self, MutableTcpPacket, TcpPacket};
use pnet_packet::udp::{self, MutableUdpPacket, UdpPacket};

use crate::templates::{IPV4_HEADER_LEN, IPV6_HEADER_LEN};

struct Fixup {
    /// IPv4 header checksum
    ip: Option<u16>,
    /// Upper-layer protocol, location and checksum
    upper: Option<(IpNextHeaderProtocol, Range<usize>, u16)>,
}

fn compute_checksums(data: &[u8]) -> Result<Fixup, Error> {
    match data.first().map(|b| b >> 4) {
        Some(4) => compute_ipv4(data),
        Some(6) => compute_ipv6(data),
        _ => Err(Error::Unsupported("not an IP packet")),
    }
}

fn compute_ipv4(data: &[u8]) -> Result<Fixup, Error> {
    let ip = Ipv4Packet::new(data).ok_or(Error::Truncated("IPv4 header"))?;
    let header_len = ip.get_header_length() as usize * 4;
    let total_len = ip.get_total_length() as usize;
    if header_len < IPV4_HEADER_LEN || total_len < header_len || total_len > data.len() {
        return Err(Error::Truncated("IPv4 length fields"));
    }
    let range = header_len..total_len;
    let upper = compute_upper(
        ip.get_next_level_protocol(),
        &data[range.clone()],
        IpAddr::V4(ip.get_source()),
        IpAddr::V4(ip.get_destination()),
    )
    .map(|(proto, cksum)| (proto, range, cksum));
    Ok(Fixup {
        ip: Some(ipv4::checksum(&ip)),
        upper,
    })
}

fn compute_ipv6(data: &[u8]) -> Result<Fixup, Error> {
    let ip = Ipv6Packet::new(data).ok_or(Error::Truncated("IPv6 header"))?;
    let total_len = IPV6_HEADER_LEN + ip.get_payload_length() as usize;
    if total_len > data.len() {
        return Err(Error::Truncated("IPv6 payload length"));
    }
    let range = IPV6_HEADER_LEN..total_len;
    let upper = compute_upper(
        ip.get_next_header(),
        &data[range.clone()],
        IpAddr::V6(ip.get_source()),
        IpAddr::V6(ip.get_destination()),
    )
    .map(|(proto, cksum)| (proto, range, cksum));
    Ok(Fixup { ip: None, upper })
}

fn compute_upper(
    proto: IpNextHeaderProtocol,
    l4: &[u8],
    src: IpAddr,
    dst: IpAddr,
) -> Option<(IpNextHeaderProtocol, u16)> {
    let cksum = match (proto, src, dst) {
        (IpNextHeaderProtocols::Tcp, IpAddr::V4(s), IpAddr::V4(d)) => {
            tcp::ipv4_checksum(&TcpPacket::new(l4)?, &s, &d)
        }
        (IpNextHeaderProtocols::Tcp, IpAddr::V6(s), IpAddr::V6(d)) => {
            tcp::ipv6_checksum(&TcpPacket::new(l4)?, &s, &d)
        }
        (IpNextHeaderProtocols::Udp, IpAddr::V4(s), IpAddr::V4(d)) => {
            udp::ipv4_checksum(&UdpPacket::new(l4)?, &s, &d)
        }
        (IpNextHeaderProtocols::Udp, IpAddr::V6(s), IpAddr::V6(d)) => {
            udp::ipv6_checksum(&UdpPacket::new(l4)?, &s, &d)
        }
        (IpNextHeaderProtocols::Icmp, IpAddr::V4(_), _) => icmp::checksum(&IcmpPacket::new(l4)?),
        (IpNextHeaderProtocols::Icmpv6, IpAddr::V6(s), IpAddr::V6(d)) => {
            icmpv6::checksum(&Icmpv6Packet::new(l4)?, &s, &d)
        }
        _ => return None,
    };
    Some((proto, cksum))
}

fn stored_upper_checksum(proto: IpNextHeaderProtocol, l4: &[u8]) -> Option<u16> {
    match proto {
        IpNextHeaderProtocols::Tcp => TcpPacket::new(l4).map(|p| p.get_checksum()),
        IpNextHeaderProtocols::Udp => UdpPacket::new(l4).map(|p| p.get_checksum()),
        IpNextHeaderProtocols::Icmp => IcmpPacket::new(l4).map(|p| p.get_checksum()),
        IpNextHeaderProtocols::Icmpv6 => Icmpv6Packet::new(l4).map(|p| p.get_checksum()),
        _ => None,
    }
}

fn store_upper_checksum(proto: IpNextHeaderProtocol, l4: &mut [u8], cksum: u16) -> Option<()> {
    match proto {
        IpNextHeaderProtocols::Tcp => MutableTcpPacket::new(l4)?.set_checksum(cksum),
        IpNextHeaderProtocols::Udp => MutableUdpPacket::new(l4)?.set_checksum(cksum),
        IpNextHeaderProtocols::Icmp => MutableIcmpPacket::new(l4)?.set_checksum(cksum),
        IpNextHeaderProtocols::Icmpv6 => MutableIcmpv6Packet::new(l4)?.set_checksum(cksum),
        _ => return None,
    }
    Some(())
}

/// Recompute and store all checksums of an IP packet
///
/// `data` must hold exactly one IP packet: the length fields of the IP header
/// must be consistent with the buffer. Upper-layer protocols other than TCP,
/// UDP, ICMP and ICMPv6 are left untouched.
pub fn recompute_checksums(data: &mut [u8]) -> Result<(), Error> {
    let fixup = compute_checksums(data)?;
    if let Some(cksum) = fixup.ip {
        MutableIpv4Packet::new(data)
            .ok_or(Error::Truncated("IPv4 header"))?
            .set_checksum(cksum);
    }
    if let Some((proto, range, cksum)) = fixup.upper {
        store_upper_checksum(proto, &mut data[range], cksum)
            .ok_or(Error::Truncated("upper-layer header"))?;
    }
    Ok(())
}

/// Check that all checksums of an IP packet are valid
pub fn verify_checksums(data: &[u8]) -> bool {
    let fixup = match compute_checksums(data) {
        Ok(f) => f,
        Err(_) => return false,
    };
    if let Some(cksum) = fixup.ip {
        match Ipv4Packet::new(data) {
            Some(ip) if ip.get_checksum() == cksum => (),
            _ => return false,
        }
    }
    match fixup.upper {
        Some((proto, range, cksum)) => stored_upper_checksum(proto, &data[range]) == Some(cksum),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn checksum_ipv4_tcp() {
        let mut data = ipv4_tcp_packet(
            [192, 168, 1, 10],
            [192, 168, 1, 1],
            40000,
            22,
            0x1234_5678,
            0,
            TcpFlags::SYN,
            &[],
        );
        assert!(verify_checksums(&data));
        // any modified byte invalidates a checksum
        data[15] ^= 0x01;
        assert!(!verify_checksums(&data));
        recompute_checksums(&mut data).expect("recompute");
        assert!(verify_checksums(&data));
        data[30] ^= 0x80;
        assert!(!verify_checksums(&data));
    }

    #[test]
    fn checksum_known_ipv4_header() {
        // 192.168.0.1 -> 192.168.0.199, protocol 255, no payload
        let mut data = vec![
            0x45, 0x00, 0x00, 0x14, 0x00, 0x00, 0x40, 0x00, 0x40, 0xff, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        recompute_checksums(&mut data).expect("recompute");
        assert_eq!(&data[10..12], &[0xb7, 0xd2]);
        assert!(verify_checksums(&data));
    }

    #[test]
    fn checksum_ipv6_udp_icmpv6() {
        let src = "2001:db8::1".parse().unwrap();
        let dst = "2001:db8::2".parse().unwrap();
        let mut data = ipv6_udp_packet(src, dst, 5353, 5353, b"mdns");
        assert!(verify_checksums(&data));
        data[48] ^= 0xff;
        assert!(!verify_checksums(&data));
        recompute_checksums(&mut data).expect("recompute");
        assert!(verify_checksums(&data));

        let data = ipv6_icmpv6_packet(src, dst, 128, 0);
        assert!(verify_checksums(&data));
    }

    #[test]
    fn checksum_inconsistent_length() {
        let mut data = ipv4_udp_packet([10, 0, 0, 1], [10, 0, 0, 2], 1, 2, b"abc");
        // total length larger than the buffer
        data[2..4].copy_from_slice(&100u16.to_be_bytes());
        assert!(recompute_checksums(&mut data).is_err());
        assert!(!verify_checksums(&data));
        assert!(recompute_checksums(&mut []).is_err());
        assert!(!verify_checksums(&[0x70; 40]));
    }
}
