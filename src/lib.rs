//! # Real client ip
//!
//! This crate resolve the real client ip address of a request arriving through a trusted reverse
//! proxy network, like Cloudflare.
//!
//! ## Usage
//!
//! ```rust
//! use real_client_ip::{Config, ResolvedAddress};
//!
//! let config = Config::new_cloudflare();
//! let mut request = http::Request::get("/").body(()).unwrap();
//! request.headers_mut().insert("cf-connecting-ip", "203.0.113.9".parse().unwrap());
//!
//! // the request comes from a Cloudflare edge, the header can be trusted
//! let socket_ip_addr = core::net::IpAddr::from([173, 245, 48, 1]);
//! let resolved = ResolvedAddress::from_request(socket_ip_addr, &request, &config);
//! assert_eq!(resolved.ip(), core::net::IpAddr::from([203, 0, 113, 9]));
//!
//! // anyone else sending the header is ignored
//! let socket_ip_addr = core::net::IpAddr::from([8, 8, 8, 8]);
//! let resolved = ResolvedAddress::from_request(socket_ip_addr, &request, &config);
//! assert_eq!(resolved.ip(), socket_ip_addr);
//! ```
//!
//! ## Features
//!
//!  * Parse IPv4 and IPv6 addresses and CIDR ranges, including compressed and IPv4-embedded IPv6 notations.
//!  * Substitute the client ip header only when the peer address belongs to a trusted network of its family.
//!  * `http`: read the client ip header from `http` requests (enabled by default).
//!  * `serde`: load the trusted networks from a configuration file.

mod address;
mod config;
mod error;
mod extract;
mod range;
mod trusted;

pub use address::{parse_address, parse_ipv4, parse_ipv6, Family, IpAddress};
#[cfg(feature = "serde")]
pub use config::ConfigFile;
pub use config::{Config, CLOUDFLARE_IPV4_RANGES, CLOUDFLARE_IPV6_RANGES, DEFAULT_CLIENT_IP_HEADER};
pub use error::{ParseError, Result};
pub use extract::RequestInformation;
pub use range::{contains, parse_cidr, CidrRange};
pub use trusted::{resolve, RequestAddressContext, ResolutionState, ResolvedAddress};
