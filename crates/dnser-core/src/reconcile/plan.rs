//! Dependency-ordered application plan
//!
//! An action set can be applied in one go, but a provider that validates
//! alias targets (or a caller that wants a partially-applied set to stay
//! consistent) needs each target to exist before the aliases pointing at it.
//! [`stage`] splits an [`ActionSet`] into stages to be applied in order;
//! actions inside one stage are independent of each other.
//!
//! - Stage 0 holds every delete and every upsert whose target is not upserted
//!   in the same set.
//! - An upsert whose target is upserted in stage `n` lands in stage `n + 1`.

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::record::{ActionSet, DnsRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A group of actions that may be applied concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Position in the plan, starting at 0
    pub depth: usize,
    /// Actions of this stage
    pub actions: ActionSet,
}

/// Split `actions` for `zone` into dependency-ordered stages
///
/// An empty action set yields no stages.
///
/// # Errors
///
/// Returns [`Error::CyclicRecordChain`] if the upserted aliases target each
/// other in a cycle, which no order of application can satisfy.
pub fn stage(zone: &Domain, actions: &ActionSet) -> Result<Vec<Stage>> {
    if actions.is_empty() {
        return Ok(Vec::new());
    }

    let mut puts_by_name: HashMap<&Domain, &DnsRecord> = HashMap::with_capacity(actions.puts.len());
    for record in &actions.puts {
        puts_by_name.entry(&record.name).or_insert(record);
    }

    let mut depths = HashMap::with_capacity(actions.puts.len());
    let mut stages: BTreeMap<usize, ActionSet> = BTreeMap::new();
    stages.entry(0).or_default().deletes = actions.deletes.clone();

    for record in &actions.puts {
        let mut path = Vec::new();
        let depth = depth_of(zone, record, &puts_by_name, &mut depths, &mut path)?;
        stages.entry(depth).or_default().puts.push(record.clone());
    }

    Ok(stages
        .into_iter()
        .filter(|(_, actions)| !actions.is_empty())
        .map(|(depth, actions)| Stage { depth, actions })
        .collect())
}

fn depth_of<'a>(
    zone: &Domain,
    record: &'a DnsRecord,
    puts_by_name: &HashMap<&'a Domain, &'a DnsRecord>,
    depths: &mut HashMap<&'a Domain, usize>,
    path: &mut Vec<&'a Domain>,
) -> Result<usize> {
    if let Some(depth) = depths.get(&record.name) {
        return Ok(*depth);
    }

    let depth = match puts_by_name.get(&record.target) {
        Some(&target) if record.is_alias() => {
            if target.name == record.name || path.contains(&&target.name) {
                return Err(Error::cyclic_chain(zone.as_str(), record.name.as_str()));
            }
            path.push(&record.name);
            let depth = depth_of(zone, target, puts_by_name, depths, path)? + 1;
            path.pop();
            depth
        }
        _ => 0,
    };

    depths.insert(&record.name, depth);
    Ok(depth)
}
