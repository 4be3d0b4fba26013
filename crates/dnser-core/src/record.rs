//! Flat DNS records and the actions derived from them

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Kind of record dnser manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A record: the target is an IPv4 literal
    Address,
    /// Alias record: the target is another domain name
    Alias,
}

/// A record as reported by a provider, or as derived from the desired layout
///
/// For [`RecordKind::Address`] the target holds the IP literal, kept as a
/// [`Domain`] so every comparison is a plain string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record kind
    pub kind: RecordKind,
    /// Owner name
    pub name: Domain,
    /// IP literal or aliased name
    pub target: Domain,
}

impl DnsRecord {
    /// Create an alias record `name -> target`
    pub fn alias(name: impl Into<Domain>, target: impl Into<Domain>) -> Self {
        Self {
            kind: RecordKind::Alias,
            name: name.into(),
            target: target.into(),
        }
    }

    /// Create an A record `name -> ip`
    pub fn address(name: impl Into<Domain>, ip: Ipv4Addr) -> Self {
        Self {
            kind: RecordKind::Address,
            name: name.into(),
            target: Domain::from_ip(ip),
        }
    }

    /// Whether this is an alias record
    pub fn is_alias(&self) -> bool {
        self.kind == RecordKind::Alias
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            RecordKind::Address => "A",
            RecordKind::Alias => "ALIAS",
        };
        write!(f, "{} {} -> {}", kind, self.name, self.target)
    }
}

/// A single change to submit to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Create or replace the record with this name
    Upsert(DnsRecord),
    /// Remove the record with this name
    Delete {
        /// Name of the record to remove
        name: Domain,
    },
}

impl Action {
    /// Name of the record this action touches
    pub fn name(&self) -> &Domain {
        match self {
            Action::Upsert(record) => &record.name,
            Action::Delete { name } => name,
        }
    }
}

/// Upserts and deletes needed to converge one or more zones
///
/// Order within each list carries no meaning, and the two lists do not
/// reference each other, so a caller may apply them in either order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    /// Records to create or replace
    pub puts: Vec<DnsRecord>,
    /// Names of records to remove
    pub deletes: Vec<Domain>,
}

impl ActionSet {
    /// Create an empty action set
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }

    /// Total number of actions
    pub fn len(&self) -> usize {
        self.puts.len() + self.deletes.len()
    }

    /// Append another set's actions after this one's
    pub fn extend(&mut self, other: ActionSet) {
        self.puts.extend(other.puts);
        self.deletes.extend(other.deletes);
    }

    /// Deletes first, then upserts
    pub fn into_actions(self) -> Vec<Action> {
        self.deletes
            .into_iter()
            .map(|name| Action::Delete { name })
            .chain(self.puts.into_iter().map(Action::Upsert))
            .collect()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::new();
        for action in iter {
            match action {
                Action::Upsert(record) => set.puts.push(record),
                Action::Delete { name } => set.deletes.push(name),
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_normalize_names() {
        let alias = DnsRecord::alias("foo.example.org", "example.org");
        assert!(alias.is_alias());
        assert_eq!(alias.name.as_str(), "foo.example.org.");
        assert_eq!(alias.target.as_str(), "example.org.");

        let a = DnsRecord::address("example.org", Ipv4Addr::new(127, 0, 0, 1));
        assert!(!a.is_alias());
        assert_eq!(a.target.as_str(), "127.0.0.1");
    }

    #[test]
    fn test_into_actions_puts_deletes_first() {
        let set = ActionSet {
            puts: vec![DnsRecord::alias("a.example.org", "example.org")],
            deletes: vec![Domain::normalize("b.example.org")],
        };

        let actions = set.clone().into_actions();
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], Action::Delete { .. }));
        assert_eq!(actions[1].name().as_str(), "a.example.org.");

        let rebuilt: ActionSet = actions.into_iter().collect();
        assert_eq!(rebuilt, set);
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::Delete {
            name: Domain::normalize("b.example.org"),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({"action": "delete", "name": "b.example.org."}));
    }
}
