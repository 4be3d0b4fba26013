// # dnser-core
//
// Core library for declarative DNS alias layouts.
//
// ## Architecture Overview
//
// This library converges the records held by a DNS provider onto a layout of
// apex A records and alias trees:
// - **Domain / AliasNode / DesiredZone**: canonical names and alias trees
// - **DnsRecord / ActionSet**: flat records and the changes derived from them
// - **compute_actions**: pure reconciliation of desired zones against
//   observed records
// - **ZoneLayout**: YAML layout loader
// - **DnsProvider**: Trait for listing and changing records via provider APIs
// - **Reconciler**: Runs list → compute → apply passes over a provider
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Pure core**: reconciliation reads its arguments and nothing else
// 2. **Idempotency**: applying the computed actions and recomputing yields
//    no actions
// 3. **Plugin-Based**: Providers are registered dynamically
// 4. **Library-First**: All core functionality can be used as a library

pub mod domain;
pub mod tree;
pub mod record;
pub mod reconcile;
pub mod layout;
pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod provider;

// Re-export core types for convenience
pub use domain::{Domain, normalize};
pub use tree::{AliasNode, DesiredZone};
pub use record::{Action, ActionSet, DnsRecord, RecordKind};
pub use reconcile::{Stage, compute_actions, compute_zone_actions, stage};
pub use layout::ZoneLayout;
pub use traits::{ApplyOutcome, DnsProvider, DnsProviderFactory};
pub use engine::{EngineEvent, ReconcileReport, Reconciler, ZonePlan, ZoneReport};
pub use registry::ProviderRegistry;
pub use config::{EngineConfig, ProviderConfig};
pub use error::{Error, Result};
pub use provider::MemoryProvider;
