//! Client identity used to partition rate limit state.

use std::fmt;
use std::net::IpAddr;

/// Header carrying the originating client address behind a proxy.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Key used when neither a forwarded address nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Opaque identity of a logical client.
///
/// Derived from network data, so two real clients behind one proxy share a
/// key and a client can spoof `X-Forwarded-For`. Any string is a valid key,
/// including the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Create a key from any string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key for a request.
    ///
    /// Precedence:
    /// 1. First comma-separated entry of `X-Forwarded-For`, trimmed
    /// 2. The direct peer address
    /// 3. The literal `"unknown"`
    ///
    /// An empty header counts as absent.
    pub fn from_request_parts(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> Self {
        if let Some(forwarded) = forwarded_for.filter(|value| !value.is_empty()) {
            let first = forwarded.split(',').next().unwrap_or_default();
            return Self::new(first.trim());
        }

        match peer {
            Some(ip) => Self::new(ip.to_string()),
            None => Self::new(UNKNOWN_CLIENT),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ClientKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
