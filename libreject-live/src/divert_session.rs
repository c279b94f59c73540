use std::net::IpAddr;

use libreject_tools::{CaptureMetadata, Config, Direction, DivertSession, Error, LinkContext};
use pcap::{Active, Capture, Device};
use pnet_packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use tracing::{debug, info, trace, warn};

const ETHERNET_HEADER_LEN: usize = 14;

/// Link layer of the capture device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet,
    /// Raw IPv4 or IPv6, no link-layer header
    RawIp,
}

impl LinkLayer {
    /// Map a pcap data link type to a supported link layer
    pub fn from_linktype(linktype: i32) -> Option<LinkLayer> {
        match linktype {
            1 => Some(LinkLayer::Ethernet),
            // DLT_RAW (both values), LINKTYPE_RAW, LINKTYPE_IPV4, LINKTYPE_IPV6
            12 | 14 | 101 | 228 | 229 => Some(LinkLayer::RawIp),
            _ => None,
        }
    }
}

/// Packet session over a libpcap live capture
///
/// Packets matching the filter are sniffed on one interface, and replies are
/// injected on the same interface. libpcap can only put packets on the wire,
/// so replies that would have to be delivered to the local stack (inbound
/// direction) are refused.
pub struct PcapDivertSession {
    cap: Capture<Active>,
    link: LinkLayer,
    interface_name: String,
    local_addrs: Vec<IpAddr>,
    priority: i16,
}

impl PcapDivertSession {
    /// Open a capture on the configured interface (`live.interface`, or the
    /// default pcap device) and install `filter`
    pub fn open(filter: &str, priority: i16, config: &Config) -> Result<Self, Error> {
        let device = find_device(config.get("live.interface"))?;
        let interface_name = device.name.clone();
        let local_addrs: Vec<IpAddr> = device.addresses.iter().map(|a| a.addr).collect();
        debug!(
            "Live: device {} has {} address(es)",
            interface_name,
            local_addrs.len()
        );

        let promisc = config.get_bool("live.promisc").unwrap_or(false);
        let immediate = config.get_bool("live.immediate").unwrap_or(true);
        let snaplen = config.get_usize("live.snaplen").unwrap_or(65535);
        let timeout = config.get_usize("live.timeout").unwrap_or(500);
        let open_err = |e: pcap::Error| Error::DriverOpenFailed(format!("{interface_name}: {e}"));

        let cap = Capture::from_device(device)
            .map_err(open_err)?
            .promisc(promisc)
            .immediate_mode(immediate)
            .snaplen(snaplen.min(i32::MAX as usize) as i32)
            .timeout(timeout.min(i32::MAX as usize) as i32);
        let mut cap = cap.open().map_err(open_err)?;

        let linktype = cap.get_datalink();
        let link = LinkLayer::from_linktype(linktype.0).ok_or_else(|| {
            Error::DriverOpenFailed(format!(
                "{interface_name}: unsupported data link type {}",
                linktype.0
            ))
        })?;

        let capture_direction = match config.get("live.capture_direction") {
            None | Some("in") => pcap::Direction::In,
            Some("out") => pcap::Direction::Out,
            Some("inout") => pcap::Direction::InOut,
            Some(_) => {
                return Err(Error::DriverOpenFailed(
                    "live.capture_direction must be one of in, out, inout".to_owned(),
                ))
            }
        };
        // injected replies must not be captured again
        if let Err(e) = cap.direction(capture_direction) {
            warn!("Live: could not set capture direction: {e}");
        }

        cap.filter(filter, true)
            .map_err(|e| Error::InvalidFilterSyntax(format!("{filter}: {e}")))?;

        info!(
            "Live: capturing on {} ({:?}), filter \"{}\", priority {}",
            interface_name, link, filter, priority
        );
        Ok(PcapDivertSession {
            cap,
            link,
            interface_name,
            local_addrs,
            priority,
        })
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn link_layer(&self) -> LinkLayer {
        self.link
    }

    /// Priority requested when opening the session. libpcap has no filter
    /// ordering, so it is informational only.
    pub fn priority(&self) -> i16 {
        self.priority
    }
}

fn find_device(name: Option<&str>) -> Result<Device, Error> {
    let name = match name {
        Some(name) => name.to_owned(),
        None => match Device::lookup() {
            Ok(Some(dev)) => return Ok(dev),
            Ok(None) => return Err(Error::DriverOpenFailed("no capture device found".to_owned())),
            Err(e) => return Err(Error::DriverOpenFailed(format!("device lookup failed: {e}"))),
        },
    };
    let interfaces = Device::list().map_err(|e| {
        Error::DriverOpenFailed(format!(
            "could not list network interfaces: {e} (are you running with root privileges (CAP_NET_RAW)?)"
        ))
    })?;
    interfaces
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::DriverOpenFailed(format!("no such interface: {name}")))
}

/// Direction of an IP packet, from the point of view of the capture host
pub fn packet_direction(data: &[u8], local_addrs: &[IpAddr]) -> Direction {
    let source = match data.first().map(|b| b >> 4) {
        Some(4) if data.len() >= 20 => {
            let mut a = [0u8; 4];
            a.copy_from_slice(&data[12..16]);
            IpAddr::from(a)
        }
        Some(6) if data.len() >= 40 => {
            let mut a = [0u8; 16];
            a.copy_from_slice(&data[8..24]);
            IpAddr::from(a)
        }
        _ => return Direction::Inbound,
    };
    if local_addrs.contains(&source) {
        Direction::Outbound
    } else {
        Direction::Inbound
    }
}

/// Split a captured frame into its link context and IP packet
///
/// Returns `None` if the frame does not carry IPv4 or IPv6.
pub fn strip_link_header(link: LinkLayer, frame: &[u8]) -> Option<(LinkContext, &[u8])> {
    match link {
        LinkLayer::RawIp => Some((LinkContext::None, frame)),
        LinkLayer::Ethernet => {
            let eth = EthernetPacket::new(frame)?;
            match eth.get_ethertype() {
                EtherTypes::Ipv4 | EtherTypes::Ipv6 => Some((
                    LinkContext::Ethernet {
                        source: eth.get_source(),
                        destination: eth.get_destination(),
                    },
                    &frame[ETHERNET_HEADER_LEN..],
                )),
                _ => None,
            }
        }
    }
}

/// Build the frame carrying a reply, sent back toward the original sender
pub fn build_reply_frame(link: &LinkContext, data: &[u8]) -> Result<Vec<u8>, Error> {
    let (source, destination) = match link {
        LinkContext::None => return Ok(data.to_vec()),
        LinkContext::Ethernet {
            source,
            destination,
        } => (*source, *destination),
    };
    let ethertype = match data.first().map(|b| b >> 4) {
        Some(4) => EtherTypes::Ipv4,
        Some(6) => EtherTypes::Ipv6,
        _ => return Err(Error::Unsupported("reply is not an IP packet")),
    };
    let mut frame = vec![0u8; ETHERNET_HEADER_LEN + data.len()];
    let mut eth = MutableEthernetPacket::new(&mut frame).ok_or(Error::Generic("Ethernet frame"))?;
    eth.set_source(destination);
    eth.set_destination(source);
    eth.set_ethertype(ethertype);
    eth.set_payload(data);
    Ok(frame)
}

impl DivertSession for PcapDivertSession {
    fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, CaptureMetadata), Error> {
        let packet = match self.cap.next_packet() {
            Ok(packet) => packet,
            Err(pcap::Error::TimeoutExpired) => return Err(Error::Timeout),
            Err(e) => return Err(Error::Recv(e.to_string())),
        };
        trace!(
            "Live: captured {} bytes (wire length {})",
            packet.header.caplen,
            packet.header.len
        );
        let (link, data) = match strip_link_header(self.link, packet.data) {
            Some(r) => r,
            None => {
                trace!("Live: not an IP frame");
                return Ok((0, CaptureMetadata::new(Direction::Inbound)));
            }
        };
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        let meta = CaptureMetadata {
            direction: packet_direction(data, &self.local_addrs),
            interface: 0,
            sub_interface: 0,
            link,
        };
        Ok((len, meta))
    }

    fn send(&mut self, data: &[u8], meta: &CaptureMetadata) -> Result<(), Error> {
        if meta.direction == Direction::Inbound {
            return Err(Error::Unsupported("inbound injection"));
        }
        let frame = build_reply_frame(&meta.link, data)?;
        self.cap
            .sendpacket(frame)
            .map_err(|e| Error::Send(e.to_string()))
    }
}
