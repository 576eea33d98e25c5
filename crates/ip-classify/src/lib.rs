//! IP address validation and reserved-range classification.
//!
//! `ip-classify` answers two questions about a log field value, cheaply and without I/O:
//!
//! - **Is it an address?** [`parse_address`] accepts an [`AddressInput`], a small closed sum
//!   type over "raw string", "already-typed address" and "anything else". Strings are trimmed
//!   and parsed as IPv4/IPv6 literals. Anything that fails is simply `None`: a non-address
//!   value is a normal skip signal, not an error.
//! - **Is it routable?** [`reserved_range`] checks the address against the IANA
//!   special-purpose registries for IPv4 and IPv6 (loopback, private-use, link-local,
//!   multicast, documentation, benchmarking, ...).
//!
//! ## Quick Start
//!
//! ```
//! use ip_classify::{classify, AddressInput, Classification};
//!
//! let ip = ip_classify::parse_address(AddressInput::Text(" 10.0.0.5 ")).unwrap();
//! assert!(matches!(classify(ip), Classification::Reserved(_)));
//!
//! let ip = ip_classify::parse_address(AddressInput::Text("8.8.8.8")).unwrap();
//! assert_eq!(classify(ip), Classification::Public);
//!
//! assert_eq!(ip_classify::parse_address(AddressInput::Text("999.999.1.1")), None);
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

mod ranges;
pub use ranges::ReservedRange;

/// A field value as seen by the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressInput<'a> {
    /// A textual value that may hold an address literal.
    Text(&'a str),
    /// A value that already is a typed address.
    Address(IpAddr),
    /// Any other value (numbers, booleans, nested structures).
    Other,
}

impl<'a> From<&'a str> for AddressInput<'a> {
    #[inline]
    fn from(s: &'a str) -> Self {
        AddressInput::Text(s)
    }
}

impl From<IpAddr> for AddressInput<'_> {
    #[inline]
    fn from(ip: IpAddr) -> Self {
        AddressInput::Address(ip)
    }
}

/// Result of classifying a parsed address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// The address falls in a reserved, non-globally-routable range.
    Reserved(&'static ReservedRange),
    /// The address is publicly routable and worth a geo lookup.
    Public,
}

impl Classification {
    #[inline]
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        matches!(self, Classification::Reserved(_))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Reserved(range) => write!(f, "reserved ({})", range),
            Classification::Public => f.write_str("public"),
        }
    }
}

/// Turn a field value into an address, if it is one.
///
/// Never fails loudly: wrong types and malformed literals both yield `None`.
#[inline]
#[must_use]
pub fn parse_address(input: AddressInput<'_>) -> Option<IpAddr> {
    match input {
        AddressInput::Address(ip) => Some(ip),
        AddressInput::Text(s) => parse_str(s),
        AddressInput::Other => None,
    }
}

/// Parse a trimmed IPv4 or IPv6 literal.
///
/// IPv4 is strict dotted-quad (no leading zeros, no octets above 255). IPv6 accepts any
/// textual form the standard library does, plus an optional `%zone` suffix which is dropped.
#[must_use]
pub fn parse_str(s: &str) -> Option<IpAddr> {
    let s = s.trim();
    // Shortest literal is "::", longest is a full IPv6 with embedded IPv4 and a zone.
    if s.len() < 2 || s.len() > 64 {
        return None;
    }

    if let Ok(ip) = s.parse::<IpAddr>() {
        return Some(ip);
    }

    let (addr, zone) = s.split_once('%')?;
    if zone.is_empty() || !zone.bytes().all(is_zone_byte) {
        return None;
    }
    addr.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}

/// Find the reserved range an address belongs to, if any.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are judged by their embedded IPv4 address.
#[must_use]
pub fn reserved_range(ip: IpAddr) -> Option<&'static ReservedRange> {
    match ip {
        IpAddr::V4(v4) => ranges::find_v4(v4),
        IpAddr::V6(v6) => match to_mapped_ipv4(&v6) {
            Some(v4) => ranges::find_v4(v4),
            None => ranges::find_v6(v6),
        },
    }
}

/// True if the address is in any reserved range.
#[inline]
#[must_use]
pub fn is_reserved(ip: IpAddr) -> bool {
    reserved_range(ip).is_some()
}

/// Classify an address as reserved or public.
#[inline]
#[must_use]
pub fn classify(ip: IpAddr) -> Classification {
    match reserved_range(ip) {
        Some(range) => Classification::Reserved(range),
        None => Classification::Public,
    }
}

#[inline]
fn is_zone_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

#[inline]
fn to_mapped_ipv4(ip: &Ipv6Addr) -> Option<Ipv4Addr> {
    match ip.segments() {
        [0, 0, 0, 0, 0, 0xffff, hi, lo] => {
            Some(Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_address_passes_through() {
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        assert_eq!(parse_address(AddressInput::Address(ip)), Some(ip));
    }

    #[test]
    fn other_values_are_skipped() {
        assert_eq!(parse_address(AddressInput::Other), None);
    }

    #[test]
    fn strings_are_trimmed() {
        assert_eq!(
            parse_address(" \t8.8.4.4\n".into()),
            Some("8.8.4.4".parse().unwrap())
        );
    }

    #[test]
    fn zone_suffix_is_dropped() {
        assert_eq!(parse_str("fe80::1%eth0"), Some("fe80::1".parse().unwrap()));
        assert_eq!(parse_str("fe80::1%"), None);
        assert_eq!(parse_str("10.0.0.1%eth0"), None);
    }

    #[test]
    fn mapped_ipv4_uses_embedded_address() {
        assert!(is_reserved("::ffff:192.168.1.1".parse().unwrap()));
        assert!(!is_reserved("::ffff:8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn display_names_the_range() {
        let c = classify("127.0.0.1".parse().unwrap());
        assert_eq!(c.to_string(), "reserved (loopback 127.0.0.0/8)");
        assert_eq!(classify("1.1.1.1".parse().unwrap()).to_string(), "public");
    }
}
