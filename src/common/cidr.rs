use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A literal network range from an `ip4:` or `ip6:` argument.
///
/// A bare address is a host range (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRange {
    V4 { network: Ipv4Addr, prefix: u8 },
    V6 { network: Ipv6Addr, prefix: u8 },
}

impl NetworkRange {
    /// Parse `addr[/prefix]` as an IPv4 range. Returns `None` for anything
    /// that is not an IPv4 literal with a prefix of at most 32.
    pub fn parse_v4(text: &str) -> Option<Self> {
        let (addr, prefix) = split_prefix(text, 32)?;
        let network = addr.parse::<Ipv4Addr>().ok()?;
        Some(Self::V4 { network, prefix })
    }

    /// Parse `addr[/prefix]` as an IPv6 range. Returns `None` for anything
    /// that is not an IPv6 literal with a prefix of at most 128.
    pub fn parse_v6(text: &str) -> Option<Self> {
        let (addr, prefix) = split_prefix(text, 128)?;
        let network = addr.parse::<Ipv6Addr>().ok()?;
        Some(Self::V6 { network, prefix })
    }

    /// Membership test. Never matches across address families.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self, ip) {
            (Self::V4 { network, prefix }, IpAddr::V4(ip)) => ip4_in_network(ip, *network, *prefix),
            (Self::V6 { network, prefix }, IpAddr::V6(ip)) => ip6_in_network(ip, *network, *prefix),
            _ => false,
        }
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 { network, prefix } => write!(f, "{network}/{prefix}"),
            Self::V6 { network, prefix } => write!(f, "{network}/{prefix}"),
        }
    }
}

fn split_prefix(text: &str, max: u8) -> Option<(&str, u8)> {
    match text.split_once('/') {
        Some((addr, prefix)) => {
            // u8::from_str accepts a leading '+', a CIDR length does not.
            if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let prefix = prefix.parse::<u8>().ok().filter(|p| *p <= max)?;
            Some((addr, prefix))
        }
        None => Some((text, max)),
    }
}

/// Check if an IPv4 address falls within a network/prefix.
/// prefix=0 matches all. prefix>32 matches none.
pub fn ip4_in_network(ip: Ipv4Addr, network: Ipv4Addr, prefix: u8) -> bool {
    if prefix == 0 {
        return true;
    }
    if prefix > 32 {
        return false;
    }
    let mask = !0u32 << (32 - prefix);
    (u32::from(ip) & mask) == (u32::from(network) & mask)
}

/// Check if an IPv6 address falls within a network/prefix.
/// prefix=0 matches all. prefix>128 matches none.
pub fn ip6_in_network(ip: Ipv6Addr, network: Ipv6Addr, prefix: u8) -> bool {
    if prefix == 0 {
        return true;
    }
    if prefix > 128 {
        return false;
    }
    let mask = !0u128 << (128 - prefix);
    (u128::from(ip) & mask) == (u128::from(network) & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    // --- parsing ---

    #[test]
    fn parse_v4_with_prefix() {
        let range = NetworkRange::parse_v4("203.0.113.0/24").unwrap();
        assert_eq!(
            range,
            NetworkRange::V4 { network: "203.0.113.0".parse().unwrap(), prefix: 24 }
        );
        assert_eq!(range.to_string(), "203.0.113.0/24");
    }

    #[test]
    fn parse_v4_bare_address_is_host_range() {
        let range = NetworkRange::parse_v4("192.0.2.7").unwrap();
        assert!(range.contains(ip("192.0.2.7")));
        assert!(!range.contains(ip("192.0.2.8")));
    }

    #[test]
    fn parse_rejects_bad_prefix() {
        assert_eq!(NetworkRange::parse_v4("10.0.0.0/33"), None);
        assert_eq!(NetworkRange::parse_v4("10.0.0.0/"), None);
        assert_eq!(NetworkRange::parse_v4("10.0.0.0/+8"), None);
        assert_eq!(NetworkRange::parse_v6("2001:db8::/129"), None);
    }

    #[test]
    fn parse_rejects_wrong_family() {
        assert_eq!(NetworkRange::parse_v4("2001:db8::/32"), None);
        assert_eq!(NetworkRange::parse_v6("10.0.0.0/8"), None);
        assert_eq!(NetworkRange::parse_v4("mail.example.com"), None);
    }

    #[test]
    fn contains_never_crosses_family() {
        let v4 = NetworkRange::parse_v4("0.0.0.0/0").unwrap();
        let v6 = NetworkRange::parse_v6("::/0").unwrap();
        assert!(!v4.contains(ip("2001:db8::1")));
        assert!(!v6.contains(ip("192.0.2.1")));
        assert!(v4.contains(ip("192.0.2.1")));
        assert!(v6.contains(ip("2001:db8::1")));
    }

    // --- IPv4 tests ---

    #[test]
    fn ip4_subnet_match() {
        let ip: Ipv4Addr = "192.168.1.100".parse().unwrap();
        let net: Ipv4Addr = "192.168.1.0".parse().unwrap();
        assert!(ip4_in_network(ip, net, 24));
    }

    #[test]
    fn ip4_subnet_no_match() {
        let ip: Ipv4Addr = "192.168.2.1".parse().unwrap();
        let net: Ipv4Addr = "192.168.1.0".parse().unwrap();
        assert!(!ip4_in_network(ip, net, 24));
    }

    #[test]
    fn ip4_prefix_0_matches_all() {
        let ip: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let net: Ipv4Addr = "192.168.1.0".parse().unwrap();
        assert!(ip4_in_network(ip, net, 0));
    }

    #[test]
    fn ip4_slash_16_boundary() {
        let ip: Ipv4Addr = "10.21.0.0".parse().unwrap();
        let net: Ipv4Addr = "10.20.0.0".parse().unwrap();
        assert!(!ip4_in_network(ip, net, 16));
    }

    // --- IPv6 tests ---

    #[test]
    fn ip6_subnet_match() {
        let ip: Ipv6Addr = "2001:db8::abcd".parse().unwrap();
        let net: Ipv6Addr = "2001:db8::".parse().unwrap();
        assert!(ip6_in_network(ip, net, 32));
    }

    #[test]
    fn ip6_prefix_too_large() {
        let ip: Ipv6Addr = "::1".parse().unwrap();
        assert!(!ip6_in_network(ip, ip, 129));
    }

    #[test]
    fn ip6_slash_64_boundary() {
        let ip: Ipv6Addr = "2001:db8:0:1::1".parse().unwrap();
        let net: Ipv6Addr = "2001:db8::".parse().unwrap();
        assert!(!ip6_in_network(ip, net, 64));
    }
}
