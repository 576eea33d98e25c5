use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A named special-purpose address block.
#[derive(Debug, PartialEq, Eq)]
pub struct ReservedRange {
    /// Short purpose label, e.g. `"private-use"`.
    pub name: &'static str,
    network: Network,
    prefix_len: u8,
}

#[derive(Debug, PartialEq, Eq)]
enum Network {
    V4(u32),
    V6(u128),
}

impl ReservedRange {
    const fn v4(name: &'static str, octets: [u8; 4], prefix_len: u8) -> Self {
        ReservedRange {
            name,
            network: Network::V4(u32::from_be_bytes(octets)),
            prefix_len,
        }
    }

    const fn v6(name: &'static str, segments: [u16; 8], prefix_len: u8) -> Self {
        let mut bits: u128 = 0;
        let mut i = 0;
        while i < 8 {
            bits = (bits << 16) | segments[i] as u128;
            i += 1;
        }
        ReservedRange {
            name,
            network: Network::V6(bits),
            prefix_len,
        }
    }

    /// Prefix length of the block in bits.
    #[inline]
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    #[inline]
    fn contains_v4(&self, ip: u32) -> bool {
        match self.network {
            Network::V4(net) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix_len)).unwrap_or(0);
                ip & mask == net
            }
            Network::V6(_) => false,
        }
    }

    #[inline]
    fn contains_v6(&self, ip: u128) -> bool {
        match self.network {
            Network::V6(net) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(self.prefix_len)).unwrap_or(0);
                ip & mask == net
            }
            Network::V4(_) => false,
        }
    }
}

impl fmt::Display for ReservedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = match self.network {
            Network::V4(net) => IpAddr::V4(Ipv4Addr::from(net)),
            Network::V6(net) => IpAddr::V6(Ipv6Addr::from(net)),
        };
        write!(f, "{} {}/{}", self.name, addr, self.prefix_len)
    }
}

// IANA IPv4 Special-Purpose Address Registry, plus multicast (RFC 5771).
static V4_RANGES: &[ReservedRange] = &[
    ReservedRange::v4("this-network", [0, 0, 0, 0], 8),
    ReservedRange::v4("private-use", [10, 0, 0, 0], 8),
    ReservedRange::v4("shared-address-space", [100, 64, 0, 0], 10),
    ReservedRange::v4("loopback", [127, 0, 0, 0], 8),
    ReservedRange::v4("link-local", [169, 254, 0, 0], 16),
    ReservedRange::v4("private-use", [172, 16, 0, 0], 12),
    ReservedRange::v4("ietf-protocol-assignments", [192, 0, 0, 0], 24),
    ReservedRange::v4("documentation", [192, 0, 2, 0], 24),
    ReservedRange::v4("6to4-relay-anycast", [192, 88, 99, 0], 24),
    ReservedRange::v4("private-use", [192, 168, 0, 0], 16),
    ReservedRange::v4("benchmarking", [198, 18, 0, 0], 15),
    ReservedRange::v4("documentation", [198, 51, 100, 0], 24),
    ReservedRange::v4("documentation", [203, 0, 113, 0], 24),
    ReservedRange::v4("multicast", [224, 0, 0, 0], 4),
    ReservedRange::v4("reserved", [240, 0, 0, 0], 4),
    ReservedRange::v4("limited-broadcast", [255, 255, 255, 255], 32),
];

// IANA IPv6 Special-Purpose Address Registry, plus multicast (RFC 4291).
// IPv4-mapped addresses are unwrapped before reaching this table.
static V6_RANGES: &[ReservedRange] = &[
    ReservedRange::v6("unspecified", [0, 0, 0, 0, 0, 0, 0, 0], 128),
    ReservedRange::v6("loopback", [0, 0, 0, 0, 0, 0, 0, 1], 128),
    ReservedRange::v6("ipv4-ipv6-translation", [0x64, 0xff9b, 0, 0, 0, 0, 0, 0], 96),
    ReservedRange::v6("ipv4-ipv6-translation", [0x64, 0xff9b, 1, 0, 0, 0, 0, 0], 48),
    ReservedRange::v6("discard-only", [0x100, 0, 0, 0, 0, 0, 0, 0], 64),
    ReservedRange::v6("ietf-protocol-assignments", [0x2001, 0, 0, 0, 0, 0, 0, 0], 23),
    ReservedRange::v6("documentation", [0x2001, 0xdb8, 0, 0, 0, 0, 0, 0], 32),
    ReservedRange::v6("6to4", [0x2002, 0, 0, 0, 0, 0, 0, 0], 16),
    ReservedRange::v6("documentation", [0x3fff, 0, 0, 0, 0, 0, 0, 0], 20),
    ReservedRange::v6("segment-routing", [0x5f00, 0, 0, 0, 0, 0, 0, 0], 16),
    ReservedRange::v6("unique-local", [0xfc00, 0, 0, 0, 0, 0, 0, 0], 7),
    ReservedRange::v6("link-local", [0xfe80, 0, 0, 0, 0, 0, 0, 0], 10),
    ReservedRange::v6("multicast", [0xff00, 0, 0, 0, 0, 0, 0, 0], 8),
];

pub(crate) fn find_v4(ip: Ipv4Addr) -> Option<&'static ReservedRange> {
    let bits = u32::from(ip);
    V4_RANGES.iter().find(|r| r.contains_v4(bits))
}

pub(crate) fn find_v6(ip: Ipv6Addr) -> Option<&'static ReservedRange> {
    let bits = u128::from(ip);
    V6_RANGES.iter().find(|r| r.contains_v6(bits))
}
