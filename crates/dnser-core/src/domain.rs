//! Canonical domain names
//!
//! Every domain-shaped string entering dnser (layout values, names and
//! targets reported by a provider) goes through [`Domain::normalize`] so that
//! `example.org` and `example.org.` never compare unequal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Separator that terminates every fully-qualified name
pub const SEPARATOR: char = '.';

/// A fully-qualified domain name, normalized to end with `.`
///
/// The only non-normalized value a `Domain` may carry is the IP literal used
/// as the target of an A record (see [`Domain::from_ip`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Normalize a raw name by appending the trailing separator if absent
    ///
    /// Normalizing an already-normalized value is a no-op.
    pub fn normalize(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        if raw.ends_with(SEPARATOR) {
            Self(raw.to_string())
        } else {
            Self(format!("{raw}{SEPARATOR}"))
        }
    }

    /// Represent an IPv4 address as a record target
    pub fn from_ip(ip: Ipv4Addr) -> Self {
        Self(ip.to_string())
    }

    /// Wrap a provider-reported A-record value without normalizing it
    pub fn verbatim(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The name as stored, including the trailing separator
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its trailing separator, as most HTTP APIs expect it
    pub fn without_separator(&self) -> &str {
        self.0.strip_suffix(SEPARATOR).unwrap_or(&self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Domain {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl From<String> for Domain {
    fn from(raw: String) -> Self {
        Self::normalize(raw)
    }
}

/// Free-function form of [`Domain::normalize`]
pub fn normalize(raw: impl AsRef<str>) -> Domain {
    Domain::normalize(raw)
}
