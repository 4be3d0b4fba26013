//! Core traits for dnser
//!
//! This module defines the abstract interfaces that provider implementations
//! must follow.
//!
//! - [`DnsProvider`]: List and change records via provider APIs

pub mod dns_provider;

pub use dns_provider::{ApplyOutcome, DnsProvider, DnsProviderFactory};
