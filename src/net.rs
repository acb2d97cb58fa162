//! Best-effort discovery of the address other devices on the LAN can use to reach us.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// How the server reports its own address in `init_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAddress {
    /// Always report this address
    Fixed(IpAddr),
    /// Ask the routing table which local interface faces the outside
    Discover,
    /// Skip discovery and report loopback
    Loopback,
}

impl ServerAddress {
    pub fn resolve(&self) -> IpAddr {
        match self {
            Self::Fixed(ip) => *ip,
            Self::Discover => discover_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Self::Loopback => IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

/// Connecting a UDP socket sends nothing; it only makes the OS pick a route,
/// whose source address is the one we want.
pub fn discover_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();

    if ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_and_loopback() {
        let ip: IpAddr = "10.0.0.7".parse().unwrap();
        assert_eq!(ServerAddress::Fixed(ip).resolve(), ip);
        assert_eq!(
            ServerAddress::Loopback.resolve(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn test_discover_never_unspecified() {
        // Sandboxes without a route fall back to loopback.
        assert!(!ServerAddress::Discover.resolve().is_unspecified());
    }
}
