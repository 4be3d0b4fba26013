// # Memory Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Holds a flat list of records behind a lock and applies action sets to it
// the way a real provider would: upserts replace by name, deletes remove by
// name. Useful for tests, demos, and for checking that an action set really
// converges a zone (apply, list again, recompute: nothing left to do).
//
// ## Zones
//
// The store is shared by every zone; `list_records` returns all of it and
// leaves zone selection to target-chasing in the reconciler.

use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::domain::Domain;
use crate::record::{ActionSet, DnsRecord};
use crate::traits::{ApplyOutcome, DnsProvider, DnsProviderFactory};
use crate::Error;

/// In-memory DNS provider
///
/// Cloning is cheap and clones share the same records.
///
/// # Example
///
/// ```rust,no_run
/// use dnser_core::provider::MemoryProvider;
/// use dnser_core::{ActionSet, DnsProvider, DnsRecord, Domain};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = MemoryProvider::new();
///     let zone = Domain::normalize("example.org");
///
///     let actions = ActionSet {
///         puts: vec![DnsRecord::alias("www.example.org", "example.org")],
///         deletes: Vec::new(),
///     };
///     provider.apply(&zone, &actions).await?;
///
///     assert_eq!(provider.list_records(&zone).await?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<RwLock<Vec<DnsRecord>>>,
}

impl MemoryProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider pre-populated with `records`
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(records)),
        }
    }

    /// Snapshot of every stored record
    pub async fn records(&self) -> Vec<DnsRecord> {
        self.inner.read().await.clone()
    }

    /// Get the number of stored records
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the provider holds no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remove every record
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn list_records(&self, zone: &Domain) -> Result<Vec<DnsRecord>, Error> {
        let guard = self.inner.read().await;
        debug!("Listing {} record(s) for {}", guard.len(), zone);
        Ok(guard.clone())
    }

    async fn apply(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome, Error> {
        let mut guard = self.inner.write().await;
        let mut outcome = ApplyOutcome::default();

        for name in &actions.deletes {
            let before = guard.len();
            guard.retain(|record| &record.name != name);
            if guard.len() < before {
                outcome.deleted += 1;
            }
        }

        for put in &actions.puts {
            match guard.iter_mut().find(|record| record.name == put.name) {
                Some(existing) => *existing = put.clone(),
                None => guard.push(put.clone()),
            }
            outcome.upserted += 1;
        }

        debug!(
            "Applied to {}: {} upserted, {} deleted",
            zone, outcome.upserted, outcome.deleted
        );
        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory providers
pub struct MemoryProviderFactory;

impl DnsProviderFactory for MemoryProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>, Error> {
        match config {
            ProviderConfig::Memory => Ok(Box::new(MemoryProvider::new())),
            _ => Err(Error::config("Invalid config for memory provider")),
        }
    }
}

/// Register the memory provider with a registry
pub fn register(registry: &crate::ProviderRegistry) {
    registry.register_provider("memory", Box::new(MemoryProviderFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn zone() -> Domain {
        Domain::normalize("example.org")
    }

    #[tokio::test]
    async fn test_memory_provider_upsert_replaces_by_name() {
        let provider = MemoryProvider::with_records(vec![DnsRecord::alias(
            "www.example.org",
            "old.example.org",
        )]);

        let actions = ActionSet {
            puts: vec![
                DnsRecord::alias("www.example.org", "example.org"),
                DnsRecord::address("example.org", Ipv4Addr::new(10, 0, 0, 1)),
            ],
            deletes: Vec::new(),
        };
        let outcome = provider.apply(&zone(), &actions).await.unwrap();

        assert_eq!(outcome, ApplyOutcome { upserted: 2, deleted: 0 });
        assert_eq!(provider.len().await, 2);
        assert_eq!(
            provider.records().await[0],
            DnsRecord::alias("www.example.org", "example.org")
        );
    }

    #[tokio::test]
    async fn test_memory_provider_delete_missing_is_noop() {
        let provider = MemoryProvider::with_records(vec![DnsRecord::alias(
            "www.example.org",
            "example.org",
        )]);

        let actions = ActionSet {
            puts: Vec::new(),
            deletes: vec![Domain::normalize("www.example.org"), Domain::normalize("gone.example.org")],
        };
        let outcome = provider.apply(&zone(), &actions).await.unwrap();

        assert_eq!(outcome.deleted, 1);
        assert!(provider.is_empty().await);
    }

    #[test]
    fn test_memory_provider_clones_share_records() {
        let provider = MemoryProvider::new();
        let clone = provider.clone();

        tokio_test::block_on(async {
            let actions = ActionSet {
                puts: vec![DnsRecord::alias("www.example.org", "example.org")],
                deletes: Vec::new(),
            };
            provider.apply(&zone(), &actions).await.unwrap();
            assert_eq!(clone.len().await, 1);

            clone.clear().await;
            assert!(provider.is_empty().await);
        });
    }

    #[test]
    fn test_factory_only_accepts_memory_config() {
        let factory = MemoryProviderFactory;
        assert!(factory.create(&ProviderConfig::Memory).is_ok());
        assert!(factory.create(&ProviderConfig::default()).is_err());
    }
}
