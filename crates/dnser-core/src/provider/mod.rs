// # Built-in Providers
//
// This module provides implementations of the DnsProvider trait that need no
// external service.

pub mod memory;

pub use memory::{MemoryProvider, MemoryProviderFactory, register};
