//! Alias trees and desired zones
//!
//! An [`AliasNode`] stands for one alias record whose target is its parent's
//! name. The root of a zone's tree is the apex itself, which is served by the
//! zone's A record rather than by an alias.

use crate::domain::Domain;
use crate::record::DnsRecord;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// A node in an alias tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasNode {
    /// Name of the alias
    pub value: Domain,
    /// Aliases pointing at this node, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AliasNode>,
}

impl AliasNode {
    /// Create a node without children
    pub fn leaf(value: impl Into<Domain>) -> Self {
        Self {
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with the given children
    pub fn with_children(value: impl Into<Domain>, children: Vec<AliasNode>) -> Self {
        Self {
            value: value.into(),
            children,
        }
    }

    /// True iff the node has no dependents
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Emit this node as an alias to `parent`, followed by its subtree
    pub fn flatten(&self, parent: &Domain) -> Vec<DnsRecord> {
        let mut records = Vec::new();
        self.flatten_into(parent, &mut records);
        records
    }

    fn flatten_into(&self, parent: &Domain, out: &mut Vec<DnsRecord>) {
        out.push(DnsRecord::alias(self.value.clone(), parent.clone()));
        for child in &self.children {
            child.flatten_into(&self.value, out);
        }
    }

    /// Number of nodes in the subtree, this node included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(AliasNode::size).sum::<usize>()
    }
}

/// Flatten a forest of nodes that all alias `parent`
pub fn flatten_forest(parent: &Domain, nodes: &[AliasNode]) -> Vec<DnsRecord> {
    let mut records = Vec::new();
    for node in nodes {
        node.flatten_into(parent, &mut records);
    }
    records
}

/// One managed zone apex with its address and alias tree
///
/// The loader guarantees `aliases.value == apex`; the reconciliation engine
/// does not check it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredZone {
    /// Zone apex
    pub apex: Domain,
    /// Address the apex A record should hold
    pub ip: Ipv4Addr,
    /// Alias tree rooted at the apex
    pub aliases: AliasNode,
}

impl DesiredZone {
    /// Create a zone whose tree root is the apex
    pub fn new(apex: impl Into<Domain>, ip: Ipv4Addr, children: Vec<AliasNode>) -> Self {
        let apex = apex.into();
        Self {
            aliases: AliasNode::with_children(apex.clone(), children),
            apex,
            ip,
        }
    }

    /// The A record this zone wants at its apex
    pub fn address_record(&self) -> DnsRecord {
        DnsRecord::address(self.apex.clone(), self.ip)
    }

    /// Every record this zone wants: its aliases followed by the apex A record
    pub fn desired_records(&self) -> Vec<DnsRecord> {
        let mut records = flatten_forest(&self.apex, &self.aliases.children);
        records.push(self.address_record());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_leaf() {
        let leaf = AliasNode::leaf("bar.example.org");
        assert!(leaf.is_leaf());

        let inner = AliasNode::with_children("foo.example.org", vec![leaf]);
        assert!(!inner.is_leaf());
        assert_eq!(inner.size(), 2);
    }

    #[test]
    fn test_flatten_emits_node_then_subtree() {
        let node = AliasNode::with_children(
            "foo.example.org",
            vec![
                AliasNode::leaf("bar.example.org"),
                AliasNode::leaf("baz.example.org"),
            ],
        );

        let records = node.flatten(&Domain::normalize("example.org"));
        assert_eq!(
            records,
            vec![
                DnsRecord::alias("foo.example.org", "example.org"),
                DnsRecord::alias("bar.example.org", "foo.example.org"),
                DnsRecord::alias("baz.example.org", "foo.example.org"),
            ]
        );
    }

    #[test]
    fn test_desired_records_skip_the_root_alias() {
        let zone = DesiredZone::new(
            "example.org",
            Ipv4Addr::new(10, 0, 0, 1),
            vec![AliasNode::leaf("www.example.org")],
        );

        assert_eq!(zone.aliases.value, zone.apex);
        assert_eq!(
            zone.desired_records(),
            vec![
                DnsRecord::alias("www.example.org", "example.org"),
                DnsRecord::address("example.org", Ipv4Addr::new(10, 0, 0, 1)),
            ]
        );
    }
}
