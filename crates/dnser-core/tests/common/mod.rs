//! Test doubles and common fixtures for contract tests
//!
//! This module provides minimal test doubles that verify how the reconciler
//! talks to providers, plus the reference layout shared by several tests.

#![allow(dead_code)]

use dnser_core::error::{Error, Result};
use dnser_core::{
    ActionSet, AliasNode, ApplyOutcome, DesiredZone, DnsProvider, DnsRecord, Domain,
    MemoryProvider,
};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const LOCALHOST: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub const REFERENCE_LAYOUT: &str = r#"apiVersion: 1
config:
- ip: 127.0.0.1
  domain: example.org
  aliases:
  - foo.example.org:
    - bar.example.org
    - baz.example.org
  - foobar.example.org
"#;

/// The zone described by [`REFERENCE_LAYOUT`]
pub fn reference_zone() -> DesiredZone {
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

/// Records a provider holds before the reference zone is reconciled
pub fn reference_observed() -> Vec<DnsRecord> {
    vec![
        DnsRecord::address("example.org", LOCALHOST),
        DnsRecord::address("another.org", LOCALHOST),
        DnsRecord::alias("foo.example.org", "example.org"),
        DnsRecord::alias("bar.foo.example.org", "foo.example.org"),
    ]
}

pub fn domain(name: &str) -> Domain {
    Domain::normalize(name)
}

/// A provider backed by [`MemoryProvider`] that records every call
pub struct RecordingProvider {
    inner: MemoryProvider,
    list_call_count: Arc<AtomicUsize>,
    applied: Arc<Mutex<Vec<ActionSet>>>,
    fail_list: bool,
    fail_apply: bool,
}

impl RecordingProvider {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            inner: MemoryProvider::with_records(records),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            applied: Arc::new(Mutex::new(Vec::new())),
            fail_list: false,
            fail_apply: false,
        }
    }

    /// Create a RecordingProvider that shares records and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            list_call_count: Arc::clone(&other.list_call_count),
            applied: Arc::clone(&other.applied),
            fail_list: other.fail_list,
            fail_apply: other.fail_apply,
        }
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Every action set passed to apply(), in call order
    pub fn applied(&self) -> Vec<ActionSet> {
        self.applied.lock().unwrap().clone()
    }

    /// Records currently held
    pub async fn records(&self) -> Vec<DnsRecord> {
        self.inner.records().await
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn list_records(&self, zone: &Domain) -> Result<Vec<DnsRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(Error::provider("recording", "listing unavailable"));
        }
        self.inner.list_records(zone).await
    }

    async fn apply(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome> {
        self.applied.lock().unwrap().push(actions.clone());
        if self.fail_apply {
            return Err(Error::provider("recording", "change batch rejected"));
        }
        self.inner.apply(zone, actions).await
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}
