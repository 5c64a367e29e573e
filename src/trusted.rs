use core::net::IpAddr;

use tracing::{debug, trace};

use crate::address::{parse_address, IpAddress};
use crate::error::Result;
use crate::extract::RequestInformation;
use crate::range::CidrRange;
use crate::Config;

/// Addresses known about a single request before deciding which one is the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAddressContext {
    peer_address: IpAddress,
    proxy_claimed_address: Option<IpAddress>,
    is_proxied: bool,
}

impl RequestAddressContext {
    pub fn new(peer_address: IpAddress, proxy_claimed_address: Option<IpAddress>) -> Self {
        Self {
            peer_address,
            proxy_claimed_address,
            is_proxied: proxy_claimed_address.is_some(),
        }
    }

    /// Create a context from the raw value of the client ip header
    ///
    /// A value that is not a valid address is dropped: the request is then resolved as if the
    /// header was absent.
    pub fn from_raw(peer_address: IpAddress, proxy_claimed_address: Option<&str>) -> Self {
        let claimed = proxy_claimed_address.and_then(|raw| match parse_address(raw) {
            Ok(address) => Some(address),
            Err(e) => {
                debug!(peer = %peer_address, error = %e, "ignoring malformed client ip header");
                None
            }
        });

        Self {
            peer_address,
            proxy_claimed_address: claimed,
            is_proxied: proxy_claimed_address.is_some(),
        }
    }

    /// Create a context when the transport layer only provides the peer address as text
    ///
    /// The peer address is normalized before any range check. An error means the peer cannot be
    /// classified, and the caller should keep using whatever address it already had.
    pub fn from_text(peer_address: &str, proxy_claimed_address: Option<&str>) -> Result<Self> {
        let peer_address = parse_address(peer_address)?;

        Ok(Self::from_raw(peer_address, proxy_claimed_address))
    }

    pub fn peer_address(&self) -> IpAddress {
        self.peer_address
    }

    pub fn proxy_claimed_address(&self) -> Option<IpAddress> {
        self.proxy_claimed_address
    }

    /// Whether the request carried the client ip header at all, valid or not
    ///
    /// This does not mean the header can be trusted, only [`resolve`] decides that.
    pub fn is_proxied(&self) -> bool {
        self.is_proxied
    }
}

/// Outcome of the trust decision for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// The peer address is the client address
    ResolvedDirect,
    /// The peer is a trusted proxy, the address it reported is the client address
    ResolvedSubstituted,
}

/// Effective client address of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    address: IpAddress,
    peer: IpAddress,
    state: ResolutionState,
    matched_range: Option<CidrRange>,
}

impl ResolvedAddress {
    /// The effective client address
    pub fn address(&self) -> IpAddress {
        self.address
    }

    /// The effective client address as a `std` address
    pub fn ip(&self) -> IpAddr {
        self.address.into()
    }

    /// The address that was directly connected to us
    pub fn peer(&self) -> IpAddress {
        self.peer
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn is_substituted(&self) -> bool {
        self.state == ResolutionState::ResolvedSubstituted
    }

    /// The trusted network the peer belongs to, if any
    ///
    /// This can be set on a direct resolution when the proxy did not report a client address.
    pub fn matched_range(&self) -> Option<CidrRange> {
        self.matched_range
    }

    /// Resolve the client address of a request received from `ip_addr`
    pub fn from_request<T: RequestInformation>(ip_addr: IpAddr, request: &T, config: &Config) -> Self {
        let ctx = RequestAddressContext::from_raw(
            ip_addr.into(),
            request.client_ip_header(config.client_ip_header()),
        );

        resolve(&ctx, config)
    }
}

/// Decide which address is the client for a request
///
/// The claimed address is only used when the peer belongs to a trusted network of its family
/// **and** a claimed address was supplied. In every other case the peer address is kept, so a
/// client that is not connected through a trusted proxy can never choose its own address by
/// sending the header.
pub fn resolve(ctx: &RequestAddressContext, config: &Config) -> ResolvedAddress {
    let peer = ctx.peer_address;
    let matched_range = config.matching_range(&peer).copied();

    if let Some(range) = &matched_range {
        trace!(%peer, %range, "peer belongs to a trusted network");
    }

    match (matched_range, ctx.proxy_claimed_address) {
        (Some(range), Some(claimed)) => {
            debug!(%peer, client = %claimed, %range, "using client address reported by trusted proxy");

            ResolvedAddress {
                address: claimed,
                peer,
                state: ResolutionState::ResolvedSubstituted,
                matched_range,
            }
        }
        (range, claimed) => {
            if range.is_none() && claimed.is_some() {
                debug!(%peer, "peer is not a trusted proxy, ignoring client ip header");
            }

            ResolvedAddress {
                address: peer,
                peer,
                state: ResolutionState::ResolvedDirect,
                matched_range,
            }
        }
    }
}
