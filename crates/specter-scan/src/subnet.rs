//! Local subnet inference.
//!
//! Connecting a UDP socket to a public address binds it to the interface
//! the kernel would route through, without sending any packets. The local
//! address read back from that socket gives us the segment to probe.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use ipnet::Ipv4Net;

/// Range probed when the local address cannot be determined.
pub fn fallback_subnet() -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::new(192, 168, 1, 0), 24).expect("/24 prefix is valid")
}

/// Guess the local /24 from the machine's own address.
///
/// Never fails: any error (no route, no interface, IPv6-only bind) is
/// absorbed into the fallback range.
pub fn resolve_local_subnet() -> Ipv4Net {
    match infer_local_subnet() {
        Some(net) => net,
        None => {
            tracing::warn!(fallback = %fallback_subnet(), "Could not infer local subnet");
            fallback_subnet()
        }
    }
}

fn infer_local_subnet() -> Option<Ipv4Net> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    // No packet traverses the network; this only selects a route.
    socket.connect(("8.8.8.8", 80)).ok()?;
    let local = socket.local_addr().ok()?;

    let IpAddr::V4(ip) = local.ip() else {
        return None;
    };
    let [a, b, c, _] = ip.octets();
    Ipv4Net::new(Ipv4Addr::new(a, b, c, 0), 24).ok()
}
