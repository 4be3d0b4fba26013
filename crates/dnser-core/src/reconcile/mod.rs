//! Reconciliation of desired zones against observed records
//!
//! [`compute_actions`] is a pure function: it reads its arguments and returns
//! the [`ActionSet`] that converges the provider onto the desired layout.
//!
//! ## Algorithm (per zone)
//!
//! 1. Rebuild the alias tree currently hanging off the apex by target-chasing
//!    over the observed alias records.
//! 2. Flatten the rebuilt tree and the desired tree into flat record lists.
//! 3. Add the apex A record to the desired list, and to the current list only
//!    when the observed one already matches.
//! 4. Diff the two lists by name.
//!
//! ## Blind spot
//!
//! Only records reachable from the apex by target-chasing take part in the
//! diff. An alias whose target is outside the reachable chain is never
//! proposed for deletion, even when the layout does not mention it.

pub mod plan;

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::record::{ActionSet, DnsRecord};
use crate::tree::{AliasNode, DesiredZone, flatten_forest};
use std::collections::HashMap;
use tracing::{debug, trace};

pub use plan::{Stage, stage};

/// Compute the actions needed to converge every zone in `desired`
///
/// `observed` may hold records of several zones as well as records unrelated
/// to any of them; unrelated records are left alone. Per-zone results are
/// concatenated in the order of `desired`.
///
/// # Errors
///
/// Returns [`Error::CyclicRecordChain`] when the observed alias records form
/// a cycle reachable from one of the apexes.
pub fn compute_actions(desired: &[DesiredZone], observed: &[DnsRecord]) -> Result<ActionSet> {
    let mut actions = ActionSet::new();
    for zone in desired {
        actions.extend(compute_zone_actions(zone, observed)?);
    }
    Ok(actions)
}

/// Compute the actions needed to converge a single zone
///
/// # Errors
///
/// Returns [`Error::CyclicRecordChain`] when target-chasing from the apex
/// runs into a cycle.
pub fn compute_zone_actions(zone: &DesiredZone, observed: &[DnsRecord]) -> Result<ActionSet> {
    let current_tree = observed_tree(&zone.apex, observed)?;
    let mut current = flatten_forest(&zone.apex, &current_tree);

    let want_a = zone.address_record();
    if let Some(have_a) = find_by_name(observed, &zone.apex) {
        if *have_a == want_a {
            current.push(have_a.clone());
        } else {
            debug!("Apex record for {} differs: have {}, want {}", zone.apex, have_a, want_a);
        }
    }

    let desired = zone.desired_records();

    let actions = diff_by_name(&current, &desired);
    debug!(
        "Zone {}: {} current, {} desired, {} put(s), {} delete(s)",
        zone.apex,
        current.len(),
        desired.len(),
        actions.puts.len(),
        actions.deletes.len()
    );
    Ok(actions)
}

/// Rebuild the alias tree below `apex` from a flat record list
///
/// Each alias record whose target is a node's name becomes a child of that
/// node. Names on the path from the apex down to the current node are
/// tracked; meeting one of them again means the records form a cycle.
///
/// # Errors
///
/// Returns [`Error::CyclicRecordChain`] on a cycle.
pub fn observed_tree(apex: &Domain, observed: &[DnsRecord]) -> Result<Vec<AliasNode>> {
    let mut by_target: HashMap<&Domain, Vec<&DnsRecord>> = HashMap::new();
    for record in observed.iter().filter(|r| r.is_alias()) {
        by_target.entry(&record.target).or_default().push(record);
    }

    let mut path = vec![apex];
    children_of(apex, apex, &by_target, &mut path)
}

fn children_of<'a>(
    apex: &Domain,
    parent: &Domain,
    by_target: &HashMap<&'a Domain, Vec<&'a DnsRecord>>,
    path: &mut Vec<&'a Domain>,
) -> Result<Vec<AliasNode>> {
    let Some(records) = by_target.get(parent) else {
        return Ok(Vec::new());
    };

    let mut children = Vec::with_capacity(records.len());
    for &record in records {
        if path.contains(&&record.name) {
            return Err(Error::cyclic_chain(apex.as_str(), record.name.as_str()));
        }
        trace!("{} -> {}", record.name, parent);

        path.push(&record.name);
        let grandchildren = children_of(apex, &record.name, by_target, path)?;
        path.pop();

        children.push(AliasNode::with_children(record.name.clone(), grandchildren));
    }
    Ok(children)
}

/// Diff two flat record lists by name
///
/// A desired record with no same-named current record, or with a differing
/// one, becomes a put. A current record with no same-named desired record
/// becomes a delete. Lookups use the first record carrying a name.
pub fn diff_by_name(current: &[DnsRecord], desired: &[DnsRecord]) -> ActionSet {
    let current_by_name = index_by_name(current);
    let desired_by_name = index_by_name(desired);

    let puts = desired
        .iter()
        .filter(|want| current_by_name.get(&want.name) != Some(want))
        .cloned()
        .collect();

    let deletes = current
        .iter()
        .filter(|have| !desired_by_name.contains_key(&have.name))
        .map(|have| have.name.clone())
        .collect();

    ActionSet { puts, deletes }
}

fn index_by_name(records: &[DnsRecord]) -> HashMap<&Domain, &DnsRecord> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        index.entry(&record.name).or_insert(record);
    }
    index
}

fn find_by_name<'a>(records: &'a [DnsRecord], name: &Domain) -> Option<&'a DnsRecord> {
    records.iter().find(|r| &r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

    fn d(name: &str) -> Domain {
        Domain::normalize(name)
    }

    fn example_zone() -> DesiredZone {
        DesiredZone::new(
            "example.org",
            LOCALHOST,
            vec![
                AliasNode::with_children(
                    "foo.example.org",
                    vec![
                        AliasNode::leaf("bar.example.org"),
                        AliasNode::leaf("baz.example.org"),
                    ],
                ),
                AliasNode::leaf("foobar.example.org"),
            ],
        )
    }

    #[test]
    fn test_reference_scenario() {
        let observed = vec![
            DnsRecord::address("example.org", LOCALHOST),
            DnsRecord::address("another.org", LOCALHOST),
            DnsRecord::alias("foo.example.org", "example.org"),
            DnsRecord::alias("bar.foo.example.org", "foo.example.org"),
        ];

        let actions = compute_actions(&[example_zone()], &observed).unwrap();

        assert_eq!(
            actions.puts,
            vec![
                DnsRecord::alias("bar.example.org", "foo.example.org"),
                DnsRecord::alias("baz.example.org", "foo.example.org"),
                DnsRecord::alias("foobar.example.org", "example.org"),
            ]
        );
        assert_eq!(actions.deletes, vec![d("bar.foo.example.org")]);
    }

    #[test]
    fn test_matching_state_yields_no_actions() {
        let zone = example_zone();
        let observed = zone.desired_records();

        let actions = compute_actions(&[zone], &observed).unwrap();
        assert!(actions.is_empty(), "expected no actions, got {actions:?}");
    }

    #[test]
    fn test_children_order_is_not_significant() {
        let zone = example_zone();
        let mut observed = zone.desired_records();
        observed.reverse();

        assert!(compute_actions(&[zone], &observed).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_apex_address_is_corrected() {
        let observed = vec![DnsRecord::address("example.org", Ipv4Addr::new(10, 0, 0, 9))];
        let zone = DesiredZone::new("example.org", LOCALHOST, Vec::new());

        let actions = compute_actions(&[zone], &observed).unwrap();
        assert_eq!(actions.puts, vec![DnsRecord::address("example.org", LOCALHOST)]);
        assert!(actions.deletes.is_empty());
    }

    #[test]
    fn test_missing_apex_address_is_created() {
        let zone = DesiredZone::new("example.org", LOCALHOST, Vec::new());
        let actions = compute_actions(&[zone], &[]).unwrap();
        assert_eq!(actions.puts, vec![DnsRecord::address("example.org", LOCALHOST)]);
    }

    #[test]
    fn test_reachable_undesired_alias_is_deleted() {
        let zone = DesiredZone::new("example.org", LOCALHOST, Vec::new());
        let observed = vec![
            DnsRecord::address("example.org", LOCALHOST),
            DnsRecord::alias("old.example.org", "example.org"),
            DnsRecord::alias("older.example.org", "old.example.org"),
        ];

        let actions = compute_actions(&[zone], &observed).unwrap();
        assert!(actions.puts.is_empty());
        assert_eq!(actions.deletes, vec![d("old.example.org"), d("older.example.org")]);
    }

    #[test]
    fn test_unreachable_alias_is_left_alone() {
        // stray.example.org. targets a name outside the apex's chain, so the
        // diff never sees it, whether or not the layout mentions it.
        let zone = DesiredZone::new(
            "example.org",
            LOCALHOST,
            vec![AliasNode::leaf("stray.example.org")],
        );
        let observed = vec![
            DnsRecord::address("example.org", LOCALHOST),
            DnsRecord::alias("stray.example.org", "elsewhere.net"),
            DnsRecord::alias("orphan.example.org", "elsewhere.net"),
        ];

        let actions = compute_actions(&[zone], &observed).unwrap();
        assert!(!actions.deletes.contains(&d("orphan.example.org")));
        assert!(!actions.deletes.contains(&d("stray.example.org")));
        // The desired stray alias is simply put over the unreachable one.
        assert_eq!(
            actions.puts,
            vec![DnsRecord::alias("stray.example.org", "example.org")]
        );
    }

    #[test]
    fn test_moved_alias_is_put_not_deleted() {
        let zone = DesiredZone::new(
            "example.org",
            LOCALHOST,
            vec![
                AliasNode::leaf("a.example.org"),
                AliasNode::with_children("b.example.org", vec![AliasNode::leaf("c.example.org")]),
            ],
        );
        let observed = vec![
            DnsRecord::address("example.org", LOCALHOST),
            DnsRecord::alias("a.example.org", "example.org"),
            DnsRecord::alias("b.example.org", "example.org"),
            DnsRecord::alias("c.example.org", "a.example.org"),
        ];

        let actions = compute_actions(&[zone], &observed).unwrap();
        assert_eq!(actions.puts, vec![DnsRecord::alias("c.example.org", "b.example.org")]);
        assert!(actions.deletes.is_empty());
    }

    #[test]
    fn test_zones_are_aggregated_in_order() {
        let first = DesiredZone::new("one.org", LOCALHOST, vec![AliasNode::leaf("www.one.org")]);
        let second = DesiredZone::new("two.org", LOCALHOST, vec![AliasNode::leaf("www.two.org")]);

        let actions = compute_actions(&[first, second], &[]).unwrap();
        let names: Vec<&str> = actions.puts.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["www.one.org.", "one.org.", "www.two.org.", "two.org."]);
    }

    #[test]
    fn test_cycle_fails_fast() {
        let zone = DesiredZone::new("example.org", LOCALHOST, Vec::new());
        let observed = vec![
            DnsRecord::alias("a.example.org", "example.org"),
            DnsRecord::alias("b.example.org", "a.example.org"),
            DnsRecord::alias("a.example.org", "b.example.org"),
        ];

        let err = compute_actions(&[zone], &observed).unwrap_err();
        assert!(matches!(err, Error::CyclicRecordChain { .. }), "got {err:?}");
    }

    #[test]
    fn test_self_alias_on_apex_is_a_cycle() {
        let apex = d("example.org");
        let observed = vec![DnsRecord::alias("example.org", "example.org")];

        let err = observed_tree(&apex, &observed).unwrap_err();
        assert!(matches!(err, Error::CyclicRecordChain { ref name, .. } if name == "example.org."));
    }

    #[test]
    fn test_unreachable_cycle_is_ignored() {
        let zone = DesiredZone::new("example.org", LOCALHOST, Vec::new());
        let observed = vec![
            DnsRecord::address("example.org", LOCALHOST),
            DnsRecord::alias("x.other.org", "y.other.org"),
            DnsRecord::alias("y.other.org", "x.other.org"),
        ];

        assert!(compute_actions(&[zone], &observed).unwrap().is_empty());
    }

    #[test]
    fn test_observed_tree_mirrors_chain() {
        let observed = vec![
            DnsRecord::alias("foo.example.org", "example.org"),
            DnsRecord::alias("bar.foo.example.org", "foo.example.org"),
            DnsRecord::address("foo.example.org", LOCALHOST),
        ];

        let tree = observed_tree(&d("example.org"), &observed).unwrap();
        assert_eq!(
            tree,
            vec![AliasNode::with_children(
                "foo.example.org",
                vec![AliasNode::leaf("bar.foo.example.org")],
            )]
        );
    }

    #[test]
    fn test_diff_uses_first_match() {
        let current = vec![
            DnsRecord::alias("a.example.org", "example.org"),
            DnsRecord::alias("a.example.org", "b.example.org"),
        ];
        let desired = vec![DnsRecord::alias("a.example.org", "example.org")];

        assert!(diff_by_name(&current, &desired).is_empty());
    }
}
