//! Error types for dnser
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dnser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnser
#[derive(Error, Debug)]
pub enum Error {
    /// The zone layout document could not be parsed or has an unsupported shape
    #[error("Layout parse error: {0}")]
    ConfigParse(String),

    /// Provider or engine configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listing records from a provider failed
    #[error("Failed to list records for zone {zone}: {source}")]
    ProviderList {
        /// Zone apex being listed
        zone: String,
        /// Underlying adapter error
        #[source]
        source: Box<Error>,
    },

    /// Applying an action set through a provider failed
    #[error("Failed to apply changes to zone {zone}: {source}")]
    ProviderApply {
        /// Zone apex being changed
        zone: String,
        /// Underlying adapter error
        #[source]
        source: Box<Error>,
    },

    /// Target-chasing revisited a name already on the current alias chain
    #[error("Cyclic record chain in zone {zone}: {name} points back into its own chain")]
    CyclicRecordChain {
        /// Zone apex whose tree was being reconstructed
        zone: String,
        /// Name at which the cycle was detected
        name: String,
    },

    /// I/O errors (reading layout files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a layout parse error
    pub fn config_parse(msg: impl Into<String>) -> Self {
        Self::ConfigParse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an adapter error raised while listing `zone`
    pub fn provider_list(zone: impl Into<String>, source: Error) -> Self {
        Self::ProviderList {
            zone: zone.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an adapter error raised while applying changes to `zone`
    pub fn provider_apply(zone: impl Into<String>, source: Error) -> Self {
        Self::ProviderApply {
            zone: zone.into(),
            source: Box::new(source),
        }
    }

    /// Create a cyclic chain error
    pub fn cyclic_chain(zone: impl Into<String>, name: impl Into<String>) -> Self {
        Self::CyclicRecordChain {
            zone: zone.into(),
            name: name.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
