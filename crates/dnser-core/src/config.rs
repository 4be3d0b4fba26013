//! Configuration types for dnser
//!
//! The zone layout itself lives in [`crate::layout`]; this module holds the
//! settings of the provider and of the reconciliation runner.

use serde::{Deserialize, Serialize};

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, looked up from the apex otherwise)
        zone_id: Option<String>,
        /// Account ID (optional)
        account_id: Option<String>,
    },

    /// In-memory provider (tests and demos)
    Memory,

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Memory => Ok(()),
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Memory => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Cloudflare {
            api_token: String::new(),
            zone_id: None,
            account_id: None,
        }
    }
}

/// Reconciliation runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Compute and report actions without applying them
    #[serde(default)]
    pub dry_run: bool,

    /// Apply each zone's actions in dependency-ordered stages
    ///
    /// When disabled (the default) the whole action set of a zone is
    /// submitted in a single call.
    #[serde(default)]
    pub staged_apply: bool,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 256 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable staged application
    pub fn with_staged_apply(mut self, staged_apply: bool) -> Self {
        self.staged_apply = staged_apply;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            staged_apply: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_validation() {
        assert!(ProviderConfig::default().validate().is_err());
        assert!(ProviderConfig::Memory.validate().is_ok());

        let custom = ProviderConfig::Custom {
            factory: "route53".to_string(),
            config: serde_json::Value::Null,
        };
        assert!(custom.validate().is_err());
        assert_eq!(custom.type_name(), "route53");
    }

    #[test]
    fn test_provider_config_is_tagged() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "type": "cloudflare",
            "api_token": "t",
            "zone_id": null,
            "account_id": null,
        }))
        .unwrap();
        assert_eq!(config.type_name(), "cloudflare");
    }

    #[test]
    fn test_engine_config_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.dry_run);
        assert!(!config.staged_apply);
        assert_eq!(config.event_channel_capacity, 256);
        assert!(config.validate().is_ok());

        let config = EngineConfig {
            event_channel_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
