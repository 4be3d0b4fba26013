// # dnser
//
// Runs one reconciliation pass: loads a zone layout, lists what the DNS
// provider holds, and upserts/deletes records until the provider matches the
// layout. All reconciliation logic lives in dnser-core; this binary only
// wires configuration, logging and the provider together.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Layout
// - `DNSER_CONFIG`: Path to the YAML zone layout (required)
//
// ### DNS Provider
// - `DNSER_PROVIDER_TYPE`: Provider type (cloudflare, memory)
// - `DNSER_PROVIDER_API_TOKEN`: API token
// - `DNSER_PROVIDER_ZONE_ID`: Zone ID (optional)
//
// ### Engine
// - `DNSER_MODE`: `dry-run` to compute and print actions without applying
// - `DNSER_STAGED_APPLY`: `true` to apply targets before the aliases using them
// - `DNSER_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DNSER_CONFIG=/etc/dnser/layout.yaml
// export DNSER_PROVIDER_TYPE=cloudflare
// export DNSER_PROVIDER_API_TOKEN=your_token
// export DNSER_MODE=dry-run
//
// dnser
// ```

use anyhow::{Context, Result};
use dnser_core::{EngineConfig, ProviderConfig, ProviderRegistry, Reconciler, ZoneLayout};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Pass completed (or interrupted by a signal)
/// - 1: Configuration or startup error
/// - 2: Runtime error (listing, reconciling or applying failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnserExitCode {
    /// Pass completed
    Clean = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DnserExitCode> for ExitCode {
    fn from(code: DnserExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    layout_path: PathBuf,
    provider_type: String,
    provider_api_token: String,
    provider_zone_id: Option<String>,
    dry_run: bool,
    staged_apply: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let layout_path = lookup("DNSER_CONFIG")
            .filter(|s| !s.is_empty())
            .context(
                "DNSER_CONFIG is required. \
                Set it via: export DNSER_CONFIG=/path/to/layout.yaml",
            )?;

        let staged_apply = match lookup("DNSER_STAGED_APPLY") {
            None => false,
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("DNSER_STAGED_APPLY '{raw}' is not a boolean"))?,
        };

        let dry_run = match lookup("DNSER_MODE").as_deref() {
            None | Some("") | Some("live") => false,
            Some(mode) if mode.eq_ignore_ascii_case("dry-run") => true,
            Some(mode) => anyhow::bail!(
                "DNSER_MODE '{}' is not valid. Valid modes: live, dry-run",
                mode
            ),
        };

        Ok(Self {
            layout_path: PathBuf::from(layout_path),
            provider_type: lookup("DNSER_PROVIDER_TYPE")
                .unwrap_or_else(|| "cloudflare".to_string()),
            provider_api_token: lookup("DNSER_PROVIDER_API_TOKEN").unwrap_or_default(),
            provider_zone_id: lookup("DNSER_PROVIDER_ZONE_ID").filter(|s| !s.is_empty()),
            dry_run,
            staged_apply,
            log_level: lookup("DNSER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks values that can be judged without touching the network or the
    /// layout file's contents.
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "cloudflare" => self.validate_api_token()?,
            "memory" => {}
            _ => anyhow::bail!(
                "DNSER_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare, memory",
                self.provider_type
            ),
        }

        if !self.layout_path.is_file() {
            anyhow::bail!(
                "DNSER_CONFIG does not point to a file: {}",
                self.layout_path.display()
            );
        }

        if self.log_level().is_none() {
            anyhow::bail!(
                "DNSER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    fn validate_api_token(&self) -> Result<()> {
        if self.provider_api_token.is_empty() {
            anyhow::bail!(
                "DNSER_PROVIDER_API_TOKEN is required. \
                Set it via: export DNSER_PROVIDER_API_TOKEN=your_token"
            );
        }

        // Cloudflare API tokens are typically 40 characters alphanumeric
        if self.provider_api_token.len() < 20 {
            anyhow::bail!(
                "DNSER_PROVIDER_API_TOKEN appears too short ({} chars). \
                Cloudflare tokens are typically 40 characters. \
                Verify your token is correct.",
                self.provider_api_token.len()
            );
        }

        let token_lower = self.provider_api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("example")
        {
            anyhow::bail!(
                "DNSER_PROVIDER_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        Ok(())
    }

    fn log_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }

    fn provider_config(&self) -> ProviderConfig {
        match self.provider_type.as_str() {
            "memory" => ProviderConfig::Memory,
            _ => ProviderConfig::Cloudflare {
                api_token: self.provider_api_token.clone(),
                zone_id: self.provider_zone_id.clone(),
                account_id: None,
            },
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_dry_run(self.dry_run)
            .with_staged_apply(self.staged_apply)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnserExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnserExitCode::ConfigError.into();
    }

    let log_level = config.log_level().unwrap_or(Level::INFO);
    // Logs go to stderr so a dry-run plan on stdout stays machine-readable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnserExitCode::ConfigError.into();
    }

    info!("Starting dnser");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnserExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match build_reconciler(&config) {
            Ok(reconciler) => run(reconciler, config.dry_run).await,
            Err(e) => {
                error!("Startup error: {:#}", e);
                DnserExitCode::ConfigError
            }
        }
    })
    .into()
}

/// Load the layout and wire the provider into a reconciler
fn build_reconciler(config: &Config) -> Result<Reconciler> {
    let layout = ZoneLayout::from_path(&config.layout_path)
        .with_context(|| format!("loading {}", config.layout_path.display()))?;
    info!(
        "Layout loaded: {} zone(s) from {}",
        layout.zones.len(),
        config.layout_path.display()
    );

    let registry = ProviderRegistry::new();
    dnser_core::provider::register(&registry);
    #[cfg(feature = "cloudflare")]
    dnser_provider_cloudflare::register(&registry);
    info!("Available providers: {}", registry.list_providers().join(", "));

    let provider = registry.create_provider(&config.provider_config())?;
    // Progress is logged by the engine itself; the event receiver is dropped
    let (reconciler, _) = Reconciler::new(provider, layout.zones, config.engine_config())?;
    Ok(reconciler)
}

/// Run one pass, stopping early on SIGINT/SIGTERM
async fn run(reconciler: Reconciler, dry_run: bool) -> DnserExitCode {
    tokio::select! {
        result = reconciler.run_once() => match result {
            Ok(report) => {
                if dry_run {
                    match serde_json::to_string_pretty(&report.zones) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            error!("Failed to serialize plan: {}", e);
                            return DnserExitCode::RuntimeError;
                        }
                    }
                }
                if report.is_converged() {
                    info!("All zones already match the layout");
                }
                DnserExitCode::Clean
            }
            Err(e) => {
                error!("Reconciliation failed: {}", e);
                DnserExitCode::RuntimeError
            }
        },
        signal = shutdown_signal() => {
            match signal {
                Ok(name) => warn!("Received {}, abandoning the pass", name),
                Err(e) => {
                    error!("Signal handling error: {}", e);
                    return DnserExitCode::RuntimeError;
                }
            }
            DnserExitCode::Clean
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for SIGINT
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
