use core::fmt;
use core::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use core::str::FromStr;

use crate::error::{ParseError, Result};

/// Address family of an [`IpAddress`] or a [`CidrRange`](crate::CidrRange)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Width of the family in bits
    pub fn width(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("ipv4"),
            Family::V6 => f.write_str("ipv6"),
        }
    }
}

/// An ip address in network byte order, tagged with its family
///
/// Values are only produced by the parsers or by converting a `std::net` address, so an
/// `IpAddress` is always complete: there is no partial or zero fallback for invalid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl IpAddress {
    pub fn family(&self) -> Family {
        match self {
            IpAddress::V4(_) => Family::V4,
            IpAddress::V6(_) => Family::V6,
        }
    }

    pub fn octets(&self) -> &[u8] {
        match self {
            IpAddress::V4(bytes) => bytes,
            IpAddress::V6(bytes) => bytes,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        self.family() == Family::V4
    }

    pub fn is_ipv6(&self) -> bool {
        self.family() == Family::V6
    }
}

impl From<IpAddr> for IpAddress {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(ip: Ipv4Addr) -> Self {
        IpAddress::V4(ip.octets())
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(ip: Ipv6Addr) -> Self {
        IpAddress::V6(ip.octets())
    }
}

impl From<IpAddress> for IpAddr {
    fn from(ip: IpAddress) -> Self {
        match ip {
            IpAddress::V4(bytes) => IpAddr::V4(Ipv4Addr::from(bytes)),
            IpAddress::V6(bytes) => IpAddr::V6(Ipv6Addr::from(bytes)),
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&IpAddr::from(*self), f)
    }
}

impl FromStr for IpAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s)
    }
}

/// Parse an address of either family
///
/// The family is picked once from the text itself: anything containing a `:` is parsed as
/// IPv6, everything else as IPv4. Surrounding whitespace is ignored.
pub fn parse_address(text: &str) -> Result<IpAddress> {
    let text = text.trim();

    if text.contains(':') {
        parse_ipv6(text)
    } else {
        parse_ipv4(text)
    }
}

/// Parse a dotted-quad IPv4 address, e.g. `173.245.48.1`
///
/// Each octet is a decimal number between 0 and 255 without leading zeros.
pub fn parse_ipv4(text: &str) -> Result<IpAddress> {
    parse_octets(text)
        .map(IpAddress::V4)
        .ok_or_else(|| ParseError::MalformedAddress(text.to_string()))
}

/// Parse an IPv6 address in any of its textual forms
///
/// Supports the fully expanded form, the `::` zero-run elision (at most once) and an embedded
/// dotted-quad IPv4 suffix (`::ffff:192.0.2.1`). The result is always the expanded 16 bytes.
pub fn parse_ipv6(text: &str) -> Result<IpAddress> {
    let malformed = || ParseError::MalformedAddress(text.to_string());

    let (head, tail) = match text.split_once("::") {
        Some((_, tail)) if tail.contains("::") => return Err(malformed()),
        Some((head, tail)) => (head, Some(tail)),
        None => (text, None),
    };

    let mut head_groups = [0u16; 8];
    let mut tail_groups = [0u16; 8];

    // a dotted quad may only close the address, never precede the elision
    let head_len = parse_groups(head, &mut head_groups, tail.is_none()).ok_or_else(malformed)?;
    let tail_len = match tail {
        Some(tail) => parse_groups(tail, &mut tail_groups, true).ok_or_else(malformed)?,
        None => 0,
    };

    let groups = match tail {
        None if head_len == 8 => head_groups,
        None => return Err(malformed()),
        // the elision stands for at least one zero group
        Some(_) if head_len + tail_len > 7 => return Err(malformed()),
        Some(_) => {
            let mut groups = [0u16; 8];
            groups[..head_len].copy_from_slice(&head_groups[..head_len]);
            groups[8 - tail_len..].copy_from_slice(&tail_groups[..tail_len]);
            groups
        }
    };

    let mut bytes = [0u8; 16];

    for (chunk, group) in bytes.chunks_exact_mut(2).zip(groups) {
        chunk.copy_from_slice(&group.to_be_bytes());
    }

    Ok(IpAddress::V6(bytes))
}

fn parse_octets(text: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;

        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        if part.len() > 1 && part.starts_with('0') {
            return None;
        }

        *octet = part.parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(octets)
}

fn parse_hextet(text: &str) -> Option<u16> {
    if text.is_empty() || text.len() > 4 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    u16::from_str_radix(text, 16).ok()
}

/// Parse the `:` separated groups of one side of an IPv6 address into `groups`, returning how
/// many were written.
fn parse_groups(segment: &str, groups: &mut [u16; 8], allow_ipv4_suffix: bool) -> Option<usize> {
    if segment.is_empty() {
        return Some(0);
    }

    let mut len = 0;
    let mut parts = segment.split(':').peekable();

    while let Some(part) = parts.next() {
        let is_last = parts.peek().is_none();

        if is_last && allow_ipv4_suffix && part.contains('.') {
            if len > 6 {
                return None;
            }

            let [a, b, c, d] = parse_octets(part)?;
            groups[len] = u16::from_be_bytes([a, b]);
            groups[len + 1] = u16::from_be_bytes([c, d]);
            len += 2;
        } else {
            if len == 8 {
                return None;
            }

            groups[len] = parse_hextet(part)?;
            len += 1;
        }
    }

    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v6(text: &str) -> [u8; 16] {
        match parse_ipv6(text) {
            Ok(IpAddress::V6(bytes)) => bytes,
            other => panic!("unexpected result for {text}: {other:?}"),
        }
    }

    #[test]
    fn ipv4_dotted_quad() {
        assert_eq!(parse_ipv4("173.245.48.1"), Ok(IpAddress::V4([173, 245, 48, 1])));
        assert_eq!(parse_ipv4("0.0.0.0"), Ok(IpAddress::V4([0, 0, 0, 0])));
        assert_eq!(
            parse_ipv4("255.255.255.255"),
            Ok(IpAddress::V4([255, 255, 255, 255]))
        );
    }

    #[test]
    fn ipv4_malformed() {
        for text in [
            "",
            "1.2.3",
            "1.2.3.4.5",
            "1.2.3.256",
            "1..2.3",
            "1.2.3.4.",
            "a.b.c.d",
            "01.2.3.4",
            "+1.2.3.4",
            " 1.2.3.4",
            "1.2.3.4/32",
            "::1",
        ] {
            assert_eq!(
                parse_ipv4(text),
                Err(ParseError::MalformedAddress(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn ipv4_agrees_with_std() {
        for text in ["10.0.0.1", "192.168.001.1", "1.2.3.4", "300.1.1.1", "1.2.3"] {
            let std = text.parse::<Ipv4Addr>().ok().map(IpAddress::from);
            assert_eq!(parse_ipv4(text).ok(), std, "{text}");
        }
    }

    #[test]
    fn ipv6_compressed_and_expanded_are_identical() {
        assert_eq!(
            v6("2001:db8::1"),
            v6("2001:0db8:0000:0000:0000:0000:0000:0001")
        );
        assert_eq!(v6("2001:DB8::1"), v6("2001:db8:0:0:0:0:0:1"));
        assert_eq!(v6("::ffff:192.0.2.1"), v6("0:0:0:0:0:ffff:c000:0201"));
        assert_eq!(v6("64:ff9b::192.0.2.33"), v6("64:ff9b::c000:221"));
    }

    #[test]
    fn ipv6_elision_positions() {
        assert_eq!(v6("::"), [0; 16]);

        let mut loopback = [0; 16];
        loopback[15] = 1;
        assert_eq!(v6("::1"), loopback);

        let mut prefix = [0; 16];
        prefix[0] = 0x24;
        prefix[2] = 0xcb;
        assert_eq!(v6("2400:cb00::"), prefix);

        assert_eq!(v6("1:2:3:4:5:6:7::"), v6("1:2:3:4:5:6:7:0"));
        assert_eq!(v6("::2:3:4:5:6:7:8"), v6("0:2:3:4:5:6:7:8"));
    }

    #[test]
    fn ipv6_malformed() {
        for text in [
            "",
            ":",
            ":::",
            "1::2::3",
            "::1::",
            ":1::2",
            "1::2:",
            "1:2:3:4:5:6:7",
            "1:2:3:4:5:6:7:8:9",
            "1:2:3:4:5:6:7:8::",
            "::1:2:3:4:5:6:7:8",
            "12345::",
            "g::1",
            "1.2.3.4",
            "1.2.3.4::",
            "::1.2.3.4:1",
            "1:2:3:4:5:6:7:1.2.3.4",
            "::ffff:1.2.3.256",
            "fe80::1%eth0",
            "[::1]",
            "::+1",
        ] {
            assert_eq!(
                parse_ipv6(text),
                Err(ParseError::MalformedAddress(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn ipv6_agrees_with_std() {
        for text in [
            "2606:4700::6810:85e5",
            "2803:f800:50::6ca2:c0a9",
            "1:2:3:4:5:6:1.2.3.4",
            "::1.2.3.4",
            "fd00::/8",
            "1::2::3",
            "0000:0000:0000:0000:0000:0000:0000:0000",
            "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff",
        ] {
            let std = text.parse::<Ipv6Addr>().ok().map(IpAddress::from);
            assert_eq!(parse_ipv6(text).ok(), std, "{text}");
        }
    }

    #[test]
    fn dispatch_by_family() {
        assert_eq!(
            parse_address(" 203.0.113.9\t").map(|ip| ip.family()),
            Ok(Family::V4)
        );
        assert_eq!(
            parse_address("2001:db8::1").map(|ip| ip.family()),
            Ok(Family::V6)
        );
        assert!(parse_address("not an ip").is_err());
        assert_eq!("::1".parse::<IpAddress>(), Ok(IpAddress::from(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn display_uses_canonical_form() {
        assert_eq!(
            parse_address("2001:0db8:0000:0000:0000:0000:0000:0001")
                .unwrap()
                .to_string(),
            "2001:db8::1"
        );
        assert_eq!(IpAddress::V4([8, 8, 8, 8]).to_string(), "8.8.8.8");
    }
}
