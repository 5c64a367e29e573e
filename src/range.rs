use core::fmt;
use core::str::FromStr;

use ipnet::IpNet;
use tracing::debug;

use crate::address::{parse_ipv4, parse_ipv6, Family, IpAddress};
use crate::error::{ParseError, Result};

/// A network range: a network address and a prefix length
///
/// The network address is always stored in its masked form, bits past the prefix length are
/// cleared on construction, so `198.41.200.7/17` and `198.41.128.0/17` are the same range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrRange {
    network: IpAddress,
    prefix_len: u8,
}

impl CidrRange {
    /// Create a range from any address inside it and a prefix length
    pub fn new(address: IpAddress, prefix_len: u8) -> Result<Self> {
        if prefix_len > address.family().width() {
            return Err(ParseError::InvalidPrefixLength(format!(
                "{address}/{prefix_len}"
            )));
        }

        let network = mask(address, prefix_len);

        if network != address {
            debug!(
                literal = %address,
                %network,
                prefix_len,
                "normalized cidr range with host bits set"
            );
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Range matching only the given address
    pub fn host(address: IpAddress) -> Self {
        Self {
            network: address,
            prefix_len: address.family().width(),
        }
    }

    pub fn family(&self) -> Family {
        self.network.family()
    }

    pub fn network(&self) -> IpAddress {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check if the address belongs to this range, see [`contains`]
    pub fn contains(&self, address: &IpAddress) -> bool {
        contains(self, address)
    }
}

/// Check if an address belongs to a range
///
/// Addresses never belong to a range of the other family. The comparison is done bit by bit on
/// the first `prefix_len` bits, so prefixes that are not a multiple of 8 only compare the high
/// bits of the last partial byte.
pub fn contains(range: &CidrRange, address: &IpAddress) -> bool {
    if range.family() != address.family() {
        return false;
    }

    let network = range.network.octets();
    let address = address.octets();
    let full_bytes = usize::from(range.prefix_len / 8);
    let remaining_bits = range.prefix_len % 8;

    if network[..full_bytes] != address[..full_bytes] {
        return false;
    }

    if remaining_bits == 0 {
        return true;
    }

    let mask = 0xffu8 << (8 - remaining_bits);

    (network[full_bytes] ^ address[full_bytes]) & mask == 0
}

/// Parse a `<address>/<prefix-length>` range of the given family
pub fn parse_cidr(text: &str, family: Family) -> Result<CidrRange> {
    let (address, prefix) = text
        .split_once('/')
        .ok_or_else(|| ParseError::MalformedCidr(text.to_string()))?;

    let address = match family {
        Family::V4 => parse_ipv4(address)?,
        Family::V6 => parse_ipv6(address)?,
    };

    let invalid_prefix = || ParseError::InvalidPrefixLength(text.to_string());

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid_prefix());
    }

    let prefix_len = prefix.parse::<u8>().map_err(|_| invalid_prefix())?;

    CidrRange::new(address, prefix_len).map_err(|_| invalid_prefix())
}

fn mask(address: IpAddress, prefix_len: u8) -> IpAddress {
    match address {
        IpAddress::V4(mut bytes) => {
            mask_bytes(&mut bytes, prefix_len);
            IpAddress::V4(bytes)
        }
        IpAddress::V6(mut bytes) => {
            mask_bytes(&mut bytes, prefix_len);
            IpAddress::V6(bytes)
        }
    }
}

fn mask_bytes(bytes: &mut [u8], prefix_len: u8) {
    let full_bytes = usize::from(prefix_len / 8);
    let remaining_bits = prefix_len % 8;

    for (index, byte) in bytes.iter_mut().enumerate().skip(full_bytes) {
        if index == full_bytes && remaining_bits > 0 {
            *byte &= 0xffu8 << (8 - remaining_bits);
        } else {
            *byte = 0;
        }
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for CidrRange {
    type Err = ParseError;

    /// Parse a range, the family is given by the address part
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let family = match s.split('/').next() {
            Some(address) if address.contains(':') => Family::V6,
            _ => Family::V4,
        };

        parse_cidr(s, family)
    }
}

impl From<IpNet> for CidrRange {
    fn from(net: IpNet) -> Self {
        Self {
            network: IpAddress::from(net.network()),
            prefix_len: net.prefix_len(),
        }
    }
}

impl From<CidrRange> for IpNet {
    fn from(range: CidrRange) -> Self {
        IpNet::new(range.network.into(), range.prefix_len)
            .expect("prefix length is validated on construction")
    }
}
