use thiserror::Error;

/// Result type alias for address and range parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Input validation failures raised while parsing addresses and ranges.
///
/// None of these are fatal: a request whose peer address cannot be parsed is
/// simply not classified, and a malformed claimed address is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is not a valid address of the expected family.
    #[error("malformed address: {0:?}")]
    MalformedAddress(String),

    /// The prefix length is missing, not a number, or wider than the family.
    #[error("invalid prefix length: {0:?}")]
    InvalidPrefixLength(String),

    /// The range has no `/` separating the address from the prefix length.
    #[error("malformed cidr: {0:?}")]
    MalformedCidr(String),
}
