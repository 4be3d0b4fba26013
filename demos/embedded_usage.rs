//! Minimal embedding example for dnser-core
//!
//! This example demonstrates using dnser-core as a library in a custom
//! application: a custom provider, a layout parsed from a string, and two
//! reconciliation passes driven by the application.

use dnser_core::{
    ActionSet, ApplyOutcome, DnsProvider, DnsRecord, Domain, EngineConfig, MemoryProvider,
    Reconciler, Result, ZoneLayout,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const LAYOUT: &str = r#"apiVersion: 1
config:
- ip: 127.0.0.1
  domain: example.org
  aliases:
  - foo.example.org:
    - bar.example.org
    - baz.example.org
  - foobar.example.org
"#;

/// Custom DNS provider for embedded usage
///
/// Keeps records in memory and prints every change it is asked to make.
struct EmbeddedProvider {
    store: MemoryProvider,
    apply_calls: Arc<AtomicUsize>,
}

impl EmbeddedProvider {
    fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            store: MemoryProvider::with_records(records),
            apply_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for EmbeddedProvider {
    async fn list_records(&self, zone: &Domain) -> Result<Vec<DnsRecord>> {
        let records = self.store.list_records(zone).await?;
        println!("[Embedded] {} holds {} record(s)", zone, records.len());
        Ok(records)
    }

    async fn apply(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        for name in &actions.deletes {
            println!("[Embedded] {} DELETE {}", zone, name);
        }
        for record in &actions.puts {
            println!("[Embedded] {} UPSERT {}", zone, record);
        }
        self.store.apply(zone, actions).await
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded dnser-core Example ===\n");

    println!("1. Parsing layout...");
    let layout = ZoneLayout::from_str(LAYOUT)?;

    // A zone that drifted: bar hangs off the wrong name and foobar is missing
    let provider = EmbeddedProvider::new(vec![
        DnsRecord::address("example.org", Ipv4Addr::new(127, 0, 0, 1)),
        DnsRecord::alias("foo.example.org", "example.org"),
        DnsRecord::alias("bar.foo.example.org", "foo.example.org"),
    ]);
    let apply_calls = Arc::clone(&provider.apply_calls);

    println!("2. Creating reconciler...");
    let config = EngineConfig {
        event_channel_capacity: 100,
        ..EngineConfig::default()
    }
    .with_staged_apply(true);
    let (reconciler, mut event_rx) = Reconciler::new(Box::new(provider), layout.zones, config)?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("3. Planning...");
    for plan in reconciler.plan().await? {
        println!(
            "   {}: {} action(s) in {} stage(s)",
            plan.zone,
            plan.actions.len(),
            plan.stages.len()
        );
    }

    println!("\n4. First pass...");
    let first = reconciler.run_once().await?;
    println!("   changed: {}", !first.is_converged());

    println!("\n5. Second pass...");
    let second = reconciler.run_once().await?;
    println!("   converged: {}", second.is_converged());

    drop(reconciler);
    let _ = tokio::time::timeout(std::time::Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("apply() was called {} time(s)", apply_calls.load(Ordering::SeqCst));
    println!("Key Points:");
    println!("- The application owns the provider and decides when passes run");
    println!("- Reconciliation is pure; only list/apply touch the provider");
    println!("- A converged zone is never submitted again");

    Ok(())
}
