// # DNS Provider Trait
//
// Defines the interface between the reconciler and a DNS hosting provider.
//
// ## Implementations
//
// - In-memory: `dnser_core::provider::MemoryProvider`
// - Cloudflare: `dnser-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnser_core::{DnsProvider, Domain, compute_actions};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let zone = Domain::normalize("example.org");
//
//     let observed = provider.list_records(&zone).await?;
//     let actions = compute_actions(&zones, &observed)?;
//     provider.apply(&zone, &actions).await?;
//
//     Ok(())
// }
// ```

use crate::domain::Domain;
use crate::record::{ActionSet, DnsRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Counts of what a provider changed while applying an action set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Records created or replaced
    pub upserted: usize,
    /// Records removed
    pub deleted: usize,
}

impl ApplyOutcome {
    /// Sum of two outcomes
    pub fn merge(self, other: ApplyOutcome) -> ApplyOutcome {
        ApplyOutcome {
            upserted: self.upserted + other.upserted,
            deleted: self.deleted + other.deleted,
        }
    }
}

/// Trait for DNS provider implementations
///
/// A provider is thin I/O glue: it reports what a zone currently holds and
/// submits changes. Deciding *what* to change belongs to the reconciler.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Page through listings
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (errors bubble to the caller)
/// - ❌ Poll until changes are live
/// - ❌ Decide whether a change is needed (owned by the reconciler)
/// - ❌ Cache records between calls
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every A and alias record currently live in `zone`
    ///
    /// Implementations must page through all results and return names and
    /// alias targets normalized with [`Domain::normalize`]. Records of other
    /// types are filtered out.
    ///
    /// # Parameters
    ///
    /// - `zone`: The zone apex (e.g. `example.org.`)
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: The zone's records, in provider order
    /// - `Err(Error)`: If listing failed
    async fn list_records(&self, zone: &Domain) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Apply an action set to `zone`
    ///
    /// Puts are submitted as upserts (create or replace by name), deletes as
    /// removals by name. Deleting a name that no longer exists is a no-op.
    ///
    /// # Parameters
    ///
    /// - `zone`: The zone apex the actions belong to
    /// - `actions`: The changes to submit
    ///
    /// # Returns
    ///
    /// - `Ok(ApplyOutcome)`: What was changed
    /// - `Err(Error)`: If any change was rejected
    async fn apply(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare", "memory")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
