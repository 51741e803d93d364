//! Layer-2 discovery probe.
//!
//! Broadcasts one ARP request per host in the target /24 over a pnet
//! datalink channel, then collects replies until the timeout elapses. This
//! is a single best-effort round: a device that does not answer within the
//! window is indistinguishable from an absent one for this cycle.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use ipnet::Ipv4Net;
use pnet::datalink::{self, Channel, Config, MacAddr, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::Packet;

use crate::error::{Result, ScanError};

const ETH_HDR_LEN: usize = 14;
const ARP_LEN: usize = 28;
/// Minimum Ethernet frame length without the FCS.
const MIN_FRAME_LEN: usize = 60;
/// Per-read poll interval so the deadline loop stays responsive.
const RECV_POLL_MS: u64 = 100;

/// One device that answered the broadcast probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpReply {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

/// ARP sweep scanner bound to the first usable LAN interface.
pub struct ArpScanner {
    timeout: Duration,
}

impl ArpScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Sweep the given range and return every unique responder.
    ///
    /// An empty reply set is success. The raw-socket work runs on the
    /// blocking pool so it does not stall the async runtime.
    pub async fn sweep(&self, network: Ipv4Net) -> Result<Vec<ArpReply>> {
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || sweep_blocking(network, timeout)).await?
    }
}

fn sweep_blocking(network: Ipv4Net, timeout: Duration) -> Result<Vec<ArpReply>> {
    let intf = select_interface().ok_or(ScanError::NoInterface)?;
    let src_mac = intf.mac.ok_or(ScanError::NoInterface)?;
    let src_ip = interface_ipv4(&intf).ok_or(ScanError::NoInterface)?;

    let cfg = Config {
        read_timeout: Some(Duration::from_millis(RECV_POLL_MS)),
        ..Default::default()
    };
    let (mut tx, mut rx) = match datalink::channel(&intf, cfg) {
        Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
        Ok(_) => {
            return Err(ScanError::Channel(format!(
                "non-ethernet channel on {}",
                intf.name
            )))
        }
        Err(e) => return Err(ScanError::Channel(format!("{}: {e}", intf.name))),
    };

    tracing::debug!(interface = %intf.name, cidr = %network, "Sending ARP sweep");

    let mut buffer = [0u8; MIN_FRAME_LEN];
    for target in network.hosts() {
        build_request(&mut buffer, src_mac, src_ip, target)?;
        if let Some(Err(e)) = tx.send_to(&buffer, None) {
            tracing::debug!(target = %target, error = %e, "ARP request send failed");
        }
    }

    let mut seen = HashSet::new();
    let mut replies = Vec::new();
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match rx.next() {
            Ok(frame) => {
                if let Some(reply) = parse_reply(frame, src_mac) {
                    if seen.insert(reply.mac) {
                        replies.push(reply);
                    }
                }
            }
            // Read timeout; loop back to check the deadline.
            Err(_) => {}
        }
    }

    tracing::debug!(cidr = %network, responders = replies.len(), "ARP sweep window closed");
    Ok(replies)
}

/// First up, broadcast-capable Ethernet interface with an IPv4 address.
fn select_interface() -> Option<NetworkInterface> {
    datalink::interfaces().into_iter().find(|i| {
        i.is_up()
            && i.is_broadcast()
            && !i.is_loopback()
            && !i.is_point_to_point()
            && i.mac.is_some()
            && i.ips.iter().any(|ip| matches!(ip, IpNetwork::V4(_)))
    })
}

fn interface_ipv4(intf: &NetworkInterface) -> Option<Ipv4Addr> {
    intf.ips.iter().find_map(|ip| match ip {
        IpNetwork::V4(net) => Some(net.ip()),
        _ => None,
    })
}

/// Write a broadcast ARP request for `target_ip` into `buffer`.
fn build_request(
    buffer: &mut [u8],
    src_mac: MacAddr,
    src_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
) -> Result<()> {
    let mut eth = MutableEthernetPacket::new(&mut buffer[..ETH_HDR_LEN])
        .ok_or_else(|| ScanError::Probe("frame buffer too small for ethernet header".into()))?;
    eth.set_destination(MacAddr::broadcast());
    eth.set_source(src_mac);
    eth.set_ethertype(EtherTypes::Arp);

    let mut arp = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .ok_or_else(|| ScanError::Probe("frame buffer too small for arp payload".into()))?;
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(ArpOperations::Request);
    arp.set_sender_hw_addr(src_mac);
    arp.set_sender_proto_addr(src_ip);
    arp.set_target_hw_addr(MacAddr::zero());
    arp.set_target_proto_addr(target_ip);
    Ok(())
}

/// Parse a received frame into an ARP reply.
///
/// Returns `None` for anything that is not a well-formed reply from
/// another station; malformed frames are skipped silently.
fn parse_reply(frame: &[u8], own_mac: MacAddr) -> Option<ArpReply> {
    let eth = EthernetPacket::new(frame)?;
    if eth.get_ethertype() != EtherTypes::Arp {
        return None;
    }
    let arp = ArpPacket::new(eth.payload())?;
    if arp.get_operation() != ArpOperations::Reply {
        return None;
    }
    let mac = arp.get_sender_hw_addr();
    if mac == own_mac {
        return None;
    }
    Some(ArpReply {
        mac,
        ip: arp.get_sender_proto_addr(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWN_MAC: MacAddr = MacAddr(0x01, 0x02, 0x03, 0x04, 0x05, 0x06);

    fn build_reply_frame(sender_mac: MacAddr, sender_ip: Ipv4Addr, operation: u16) -> Vec<u8> {
        let mut buffer = vec![0u8; MIN_FRAME_LEN];
        {
            let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
            eth.set_destination(MacAddr::broadcast());
            eth.set_source(sender_mac);
            eth.set_ethertype(EtherTypes::Arp);
        }
        {
            let mut arp =
                MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN]).unwrap();
            arp.set_hardware_type(ArpHardwareTypes::Ethernet);
            arp.set_protocol_type(EtherTypes::Ipv4);
            arp.set_hw_addr_len(6);
            arp.set_proto_addr_len(4);
            arp.set_operation(pnet::packet::arp::ArpOperation::new(operation));
            arp.set_sender_hw_addr(sender_mac);
            arp.set_sender_proto_addr(sender_ip);
            arp.set_target_hw_addr(OWN_MAC);
            arp.set_target_proto_addr(Ipv4Addr::new(192, 168, 1, 10));
        }
        buffer
    }

    #[test]
    fn build_request_is_a_broadcast_arp_request() {
        let src_ip = Ipv4Addr::new(192, 168, 1, 10);
        let target = Ipv4Addr::new(192, 168, 1, 1);
        let mut buffer = [0u8; MIN_FRAME_LEN];
        build_request(&mut buffer, OWN_MAC, src_ip, target).unwrap();

        let eth = EthernetPacket::new(&buffer).unwrap();
        assert_eq!(eth.get_destination(), MacAddr::broadcast());
        assert_eq!(eth.get_source(), OWN_MAC);
        assert_eq!(eth.get_ethertype(), EtherTypes::Arp);

        let arp = ArpPacket::new(eth.payload()).unwrap();
        assert_eq!(arp.get_operation(), ArpOperations::Request);
        assert_eq!(arp.get_hardware_type(), ArpHardwareTypes::Ethernet);
        assert_eq!(arp.get_hw_addr_len(), 6);
        assert_eq!(arp.get_proto_addr_len(), 4);
        assert_eq!(arp.get_sender_hw_addr(), OWN_MAC);
        assert_eq!(arp.get_sender_proto_addr(), src_ip);
        assert_eq!(arp.get_target_proto_addr(), target);
    }

    #[test]
    fn parse_reply_accepts_a_reply_from_another_station() {
        let sender = MacAddr(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01);
        let sender_ip = Ipv4Addr::new(192, 168, 1, 42);
        let frame = build_reply_frame(sender, sender_ip, 2);

        let reply = parse_reply(&frame, OWN_MAC).unwrap();
        assert_eq!(reply.mac, sender);
        assert_eq!(reply.ip, sender_ip);
    }

    #[test]
    fn parse_reply_skips_requests() {
        let sender = MacAddr(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01);
        let frame = build_reply_frame(sender, Ipv4Addr::new(192, 168, 1, 42), 1);
        assert!(parse_reply(&frame, OWN_MAC).is_none());
    }

    #[test]
    fn parse_reply_skips_own_frames() {
        let frame = build_reply_frame(OWN_MAC, Ipv4Addr::new(192, 168, 1, 10), 2);
        assert!(parse_reply(&frame, OWN_MAC).is_none());
    }

    #[test]
    fn parse_reply_skips_truncated_frames() {
        let sender = MacAddr(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01);
        let mut frame = build_reply_frame(sender, Ipv4Addr::new(192, 168, 1, 42), 2);
        frame.truncate(ETH_HDR_LEN + 10);
        assert!(parse_reply(&frame, OWN_MAC).is_none());
    }

    #[test]
    fn parse_reply_skips_non_arp_ethertypes() {
        let sender = MacAddr(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01);
        let mut frame = build_reply_frame(sender, Ipv4Addr::new(192, 168, 1, 42), 2);
        {
            let mut eth = MutableEthernetPacket::new(&mut frame).unwrap();
            eth.set_ethertype(EtherTypes::Ipv4);
        }
        assert!(parse_reply(&frame, OWN_MAC).is_none());
    }
}
