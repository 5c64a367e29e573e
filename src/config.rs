use ipnet::IpNet;

use crate::address::{parse_address, Family, IpAddress};
use crate::error::{ParseError, Result};
use crate::range::{parse_cidr, CidrRange};
use crate::trusted::{resolve, RequestAddressContext, ResolvedAddress};

/// Header set by Cloudflare with the address of the client connecting to its edge
pub const DEFAULT_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// Cloudflare IPv4 edge networks
pub const CLOUDFLARE_IPV4_RANGES: &[&str] = &[
    "204.93.240.0/24",
    "204.93.177.0/24",
    "199.27.128.0/21",
    "173.245.48.0/20",
    "103.21.244.0/22",
    "103.22.200.0/22",
    "103.31.4.0/22",
    "141.101.64.0/18",
    "108.162.192.0/18",
    "190.93.240.0/20",
    "188.114.96.0/20",
    "197.234.240.0/22",
    "198.41.128.0/17",
    "162.158.0.0/15",
];

/// Cloudflare IPv6 edge networks
pub const CLOUDFLARE_IPV6_RANGES: &[&str] = &["2400:cb00::/32", "2606:4700::/32", "2803:f800::/32"];

/// Registry of trusted proxy networks
///
/// A peer address belonging to one of these networks is a proxy we trust to report the real
/// client address in the client ip header. Ranges are kept in one list per family and are
/// checked in insertion order.
///
/// By default, it trusts the Cloudflare edge networks and reads the `CF-Connecting-IP` header.
///
/// The registry is meant to be built once at startup and then shared read-only between requests.
///
/// # Example
/// ```
/// use real_client_ip::Config;
///
/// let mut config = Config::new_cloudflare();
/// config.add_trusted_range("10.0.0.0/8").unwrap();
/// config.set_client_ip_header("x-real-ip");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    ipv4_ranges: Vec<CidrRange>,
    ipv6_ranges: Vec<CidrRange>,
    client_ip_header: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new_cloudflare()
    }
}

impl Config {
    /// Create a new registry with no trusted networks
    pub fn new() -> Self {
        Self {
            ipv4_ranges: Vec::new(),
            ipv6_ranges: Vec::new(),
            client_ip_header: DEFAULT_CLIENT_IP_HEADER.to_string(),
        }
    }

    /// Create a new registry trusting the Cloudflare edge networks
    ///
    /// # Panics
    ///
    /// Panics if one of the built-in ranges is malformed.
    pub fn new_cloudflare() -> Self {
        let builtin = |ranges: &[&str], family: Family| -> Vec<CidrRange> {
            ranges
                .iter()
                .map(|range| {
                    parse_cidr(range, family)
                        .unwrap_or_else(|e| panic!("invalid built-in trusted range: {e}"))
                })
                .collect()
        };

        Self {
            ipv4_ranges: builtin(CLOUDFLARE_IPV4_RANGES, Family::V4),
            ipv6_ranges: builtin(CLOUDFLARE_IPV6_RANGES, Family::V6),
            client_ip_header: DEFAULT_CLIENT_IP_HEADER.to_string(),
        }
    }

    /// Add a trusted network
    ///
    /// range can be a CIDR or a single IP address
    pub fn add_trusted_range(&mut self, range: &str) -> Result<()> {
        let range = match range.parse::<CidrRange>() {
            Ok(range) => range,
            Err(ParseError::MalformedCidr(_)) => CidrRange::host(parse_address(range)?),
            Err(e) => return Err(e),
        };

        self.push(range);

        Ok(())
    }

    /// Add a trusted network from an [`IpNet`]
    pub fn add_trusted_net(&mut self, net: IpNet) {
        self.push(CidrRange::from(net));
    }

    fn push(&mut self, range: CidrRange) {
        match range.family() {
            Family::V4 => self.ipv4_ranges.push(range),
            Family::V6 => self.ipv6_ranges.push(range),
        }
    }

    /// Use another header to read the client address reported by the proxy
    ///
    /// Header names are case insensitive.
    pub fn set_client_ip_header(&mut self, name: &str) {
        self.client_ip_header = name.to_ascii_lowercase();
    }

    pub fn client_ip_header(&self) -> &str {
        &self.client_ip_header
    }

    /// Trusted networks of the given family, in registry order
    pub fn ranges(&self, family: Family) -> &[CidrRange] {
        match family {
            Family::V4 => &self.ipv4_ranges,
            Family::V6 => &self.ipv6_ranges,
        }
    }

    /// Find the first trusted network the address belongs to
    pub fn matching_range(&self, remote_addr: &IpAddress) -> Option<&CidrRange> {
        self.ranges(remote_addr.family())
            .iter()
            .find(|range| range.contains(remote_addr))
    }

    /// Check if a remote address is trusted given the list of trusted networks
    pub fn is_ip_trusted(&self, remote_addr: &IpAddress) -> bool {
        self.matching_range(remote_addr).is_some()
    }

    /// Resolve the effective client address of a request, see [`resolve`]
    pub fn resolve(&self, ctx: &RequestAddressContext) -> ResolvedAddress {
        resolve(ctx, self)
    }
}

/// Trusted proxies configuration as it is written in a configuration file
///
/// ```json
/// {
///   "client_ip_header": "cf-connecting-ip",
///   "ipv4_ranges": ["173.245.48.0/20"],
///   "ipv6_ranges": ["2400:cb00::/32"]
/// }
/// ```
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub client_ip_header: Option<String>,
    pub ipv4_ranges: Vec<String>,
    pub ipv6_ranges: Vec<String>,
}

#[cfg(feature = "serde")]
impl TryFrom<ConfigFile> for Config {
    type Error = ParseError;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let mut config = Config::new();

        for range in &file.ipv4_ranges {
            config.ipv4_ranges.push(parse_cidr(range.trim(), Family::V4)?);
        }

        for range in &file.ipv6_ranges {
            config.ipv6_ranges.push(parse_cidr(range.trim(), Family::V6)?);
        }

        if let Some(header) = file.client_ip_header {
            config.set_client_ip_header(&header);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(text: &str) -> IpAddress {
        parse_address(text).unwrap()
    }

    #[test]
    fn cloudflare_ranges() {
        let config = Config::default();

        assert_eq!(config.ranges(Family::V4).len(), CLOUDFLARE_IPV4_RANGES.len());
        assert_eq!(config.ranges(Family::V6).len(), CLOUDFLARE_IPV6_RANGES.len());
        assert_eq!(config.client_ip_header(), "cf-connecting-ip");

        assert!(config.is_ip_trusted(&ip("173.245.48.1")));
        assert!(config.is_ip_trusted(&ip("162.159.255.255")));
        assert!(config.is_ip_trusted(&ip("2606:4700:10::6816:1a42")));
        assert!(!config.is_ip_trusted(&ip("8.8.8.8")));
        assert!(!config.is_ip_trusted(&ip("2001:4860:4860::8888")));
        assert!(!config.is_ip_trusted(&ip("::ffff:173.245.48.1")));
    }

    #[test]
    fn matching_range_is_first_in_order() {
        let mut config = Config::new();
        config.add_trusted_range("10.0.0.0/8").unwrap();
        config.add_trusted_range("10.1.0.0/16").unwrap();

        assert_eq!(
            config.matching_range(&ip("10.1.2.3")).map(|r| r.to_string()),
            Some("10.0.0.0/8".to_string())
        );
        assert_eq!(config.matching_range(&ip("11.0.0.1")), None);
    }

    #[test]
    fn add_trusted_range() {
        let mut config = Config::new();

        config.add_trusted_range("192.0.2.10").unwrap();
        config.add_trusted_range("2001:db8::/48").unwrap();
        config.add_trusted_net("198.51.100.0/24".parse().unwrap());

        assert_eq!(config.ranges(Family::V4).len(), 2);
        assert_eq!(config.ranges(Family::V6).len(), 1);
        assert!(config.is_ip_trusted(&ip("192.0.2.10")));
        assert!(!config.is_ip_trusted(&ip("192.0.2.11")));
        assert!(config.is_ip_trusted(&ip("198.51.100.200")));
        assert!(config.is_ip_trusted(&ip("2001:db8:0:ffff::1")));

        assert_eq!(
            config.add_trusted_range("192.0.2.0/40"),
            Err(ParseError::InvalidPrefixLength("192.0.2.0/40".to_string()))
        );
        assert_eq!(
            config.add_trusted_range("example.com"),
            Err(ParseError::MalformedAddress("example.com".to_string()))
        );
    }

    #[test]
    fn header_is_case_insensitive() {
        let mut config = Config::new();
        config.set_client_ip_header("X-Real-IP");

        assert_eq!(config.client_ip_header(), "x-real-ip");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn from_config_file() {
        let file: ConfigFile = serde_json::from_str(
            r#"{
                "client_ip_header": "True-Client-IP",
                "ipv4_ranges": ["173.245.48.0/20", " 10.0.0.0/8 "],
                "ipv6_ranges": ["2400:cb00::/32"]
            }"#,
        )
        .unwrap();
        let config = Config::try_from(file).unwrap();

        assert_eq!(config.client_ip_header(), "true-client-ip");
        assert_eq!(config.ranges(Family::V4).len(), 2);
        assert!(config.is_ip_trusted(&ip("10.20.30.40")));

        let file: ConfigFile = serde_json::from_str(r#"{"ipv4_ranges": ["2400:cb00::/32"]}"#).unwrap();
        assert_eq!(
            Config::try_from(file).err(),
            Some(ParseError::MalformedAddress("2400:cb00::".to_string()))
        );

        let file: ConfigFile = serde_json::from_str("{}").unwrap();
        let config = Config::try_from(file).unwrap();
        assert_eq!(config.client_ip_header(), DEFAULT_CLIENT_IP_HEADER);
        assert!(config.ranges(Family::V4).is_empty());
    }
}
