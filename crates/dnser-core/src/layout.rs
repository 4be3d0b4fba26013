//! Zone layout loading
//!
//! A layout document declares, for each managed apex, the address of its A
//! record and the tree of aliases hanging off it:
//!
//! ```yaml
//! apiVersion: 1
//! config:
//! - ip: 127.0.0.1
//!   domain: example.org
//!   aliases:
//!   - foo.example.org:
//!     - bar.example.org
//!     - baz.example.org
//!   - foobar.example.org
//! ```
//!
//! An alias entry is either a bare name (a leaf) or a single-key mapping from
//! a name to its own aliases. Every name is normalized on the way in.

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::tree::{AliasNode, DesiredZone};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashSet;
use std::io::Read;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::debug;

/// The only layout version this crate understands
pub const SUPPORTED_API_VERSION: u32 = 1;

/// Maximum length of a domain name (RFC 1035)
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label (RFC 1035)
const MAX_LABEL_LEN: usize = 63;

/// A parsed and validated layout document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneLayout {
    /// Version marker of the document
    pub api_version: u32,
    /// Managed zones, in document order
    pub zones: Vec<DesiredZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLayout {
    api_version: u32,
    #[serde(default)]
    config: Vec<RawZone>,
}

#[derive(Debug, Deserialize)]
struct RawZone {
    ip: String,
    domain: String,
    #[serde(default)]
    aliases: Value,
}

impl ZoneLayout {
    /// Parse a layout from a YAML string
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed YAML, an unsupported
    /// `apiVersion`, an invalid IP, an invalid name or a badly shaped alias
    /// entry.
    pub fn from_str(data: &str) -> Result<Self> {
        let raw: RawLayout = serde_yaml::from_str(data)
            .map_err(|e| Error::config_parse(format!("invalid layout document: {e}")))?;
        Self::from_raw(raw)
    }

    /// Parse a layout from a reader
    ///
    /// # Errors
    ///
    /// See [`ZoneLayout::from_str`].
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let raw: RawLayout = serde_yaml::from_reader(reader)
            .map_err(|e| Error::config_parse(format!("invalid layout document: {e}")))?;
        Self::from_raw(raw)
    }

    /// Load a layout from a file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`ZoneLayout::from_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading zone layout from {}", path.display());
        let data = std::fs::read_to_string(path)?;
        Self::from_str(&data)
    }

    fn from_raw(raw: RawLayout) -> Result<Self> {
        if raw.api_version != SUPPORTED_API_VERSION {
            return Err(Error::config_parse(format!(
                "unsupported apiVersion {} (expected {})",
                raw.api_version, SUPPORTED_API_VERSION
            )));
        }

        let zones = raw
            .config
            .into_iter()
            .map(zone_from_raw)
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} zone(s)", zones.len());
        Ok(Self {
            api_version: raw.api_version,
            zones,
        })
    }
}

fn zone_from_raw(raw: RawZone) -> Result<DesiredZone> {
    let apex = domain_of(&raw.domain)?;
    let ip: Ipv4Addr = raw.ip.trim().parse().map_err(|e| {
        Error::config_parse(format!("invalid ip {:?} for {}: {}", raw.ip, apex, e))
    })?;

    let children = match raw.aliases {
        Value::Null => Vec::new(),
        Value::Sequence(entries) => nodes_of(&entries)?,
        other => {
            return Err(Error::config_parse(format!(
                "aliases of {} must be a sequence, got {}",
                apex,
                kind_of(&other)
            )));
        }
    };

    check_names_unique(&apex, &children)?;
    Ok(DesiredZone::new(apex, ip, children))
}

/// Reject a tree that names the apex or any alias more than once
///
/// Each name owns at most one record, so a repeated name would be pulled
/// toward two targets on alternating passes.
fn check_names_unique(apex: &Domain, children: &[AliasNode]) -> Result<()> {
    let mut seen = HashSet::new();
    seen.insert(apex);

    let mut pending: Vec<&AliasNode> = children.iter().collect();
    while let Some(node) = pending.pop() {
        if &node.value == apex {
            return Err(Error::config_parse(format!(
                "apex {apex} cannot also be listed as an alias"
            )));
        }
        if !seen.insert(&node.value) {
            return Err(Error::config_parse(format!(
                "alias {} appears more than once under {}",
                node.value, apex
            )));
        }
        pending.extend(node.children.iter());
    }
    Ok(())
}

fn nodes_of(entries: &[Value]) -> Result<Vec<AliasNode>> {
    entries.iter().map(node_of).collect()
}

fn node_of(entry: &Value) -> Result<AliasNode> {
    match entry {
        Value::String(name) => Ok(AliasNode::leaf(domain_of(name)?)),
        Value::Mapping(mapping) => {
            let mut pairs = mapping.iter();
            let (Some((key, value)), None) = (pairs.next(), pairs.next()) else {
                return Err(Error::config_parse(format!(
                    "alias mapping must have exactly one key, got {}",
                    mapping.len()
                )));
            };

            let Value::String(name) = key else {
                return Err(Error::config_parse(format!(
                    "alias name must be a string, got {}",
                    kind_of(key)
                )));
            };

            let children = match value {
                Value::Null => Vec::new(),
                Value::Sequence(entries) => nodes_of(entries)?,
                Value::String(_) => vec![node_of(value)?],
                other => {
                    return Err(Error::config_parse(format!(
                        "aliases of {} must be a sequence, got {}",
                        name,
                        kind_of(other)
                    )));
                }
            };

            Ok(AliasNode::with_children(domain_of(name)?, children))
        }
        other => Err(Error::config_parse(format!(
            "alias entry must be a name or a mapping, got {}",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Validate and normalize a name from the layout
fn domain_of(raw: &str) -> Result<Domain> {
    let raw = raw.trim();
    validate_domain_name(raw)?;
    Ok(Domain::normalize(raw))
}

/// Validate that a string is a plausible domain name
///
/// This implements basic DNS domain name validation per RFC 1035, relaxed to
/// accept underscores and a leading wildcard label.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() {
        return Err(Error::config_parse("domain name cannot be empty"));
    }

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(Error::config_parse(format!(
            "domain name too long: {} chars (max {}): {}",
            domain.len(),
            MAX_DOMAIN_LEN,
            domain
        )));
    }

    for (index, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config_parse(format!(
                "domain name has empty label: '{domain}'"
            )));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::config_parse(format!(
                "domain label too long: {} chars (max {}): '{}'",
                label.len(),
                MAX_LABEL_LEN,
                label
            )));
        }

        if index == 0 && label == "*" {
            continue;
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config_parse(format!(
                "domain label contains invalid characters: '{label}'"
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config_parse(format!(
                "domain label cannot start or end with hyphen: '{label}'"
            )));
        }
    }

    Ok(())
}
