// # Cloudflare Provider Real Environment Validation Tool
//
// Checks the Cloudflare provider against the real Cloudflare API: lists a
// zone, computes what a layout would change, and optionally applies it.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe)
// DNSER_MODE=dry-run \
// CLOUDFLARE_API_TOKEN=your_token \
// CLOUDFLARE_ZONE_ID=your_zone_id \
// DNSER_CONFIG=layout.yaml \
// cargo run --bin cloudflare_validation
//
// # Live mode (makes actual changes!)
// DNSER_MODE=live \
// CLOUDFLARE_API_TOKEN=your_token \
// DNSER_CONFIG=layout.yaml \
// cargo run --bin cloudflare_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `CLOUDFLARE_API_TOKEN`: Cloudflare API token
// - `DNSER_CONFIG`: Layout file whose zones live in the Cloudflare account
//
// Optional:
// - `CLOUDFLARE_ZONE_ID`: Zone ID (if not provided, will auto-discover)
// - `DNSER_MODE`: "dry-run" or "live" (default: dry-run)

use dnser_core::{DnsProvider, ZoneLayout, compute_zone_actions, stage};
use dnser_provider_cloudflare::CloudflareProvider;
use std::env;
use std::process::ExitCode;

fn required(name: &str) -> Option<String> {
    let value = env::var(name).ok().filter(|v| !v.is_empty());
    if value.is_none() {
        tracing::error!("{} environment variable is required", name);
    }
    value
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("=== Cloudflare Provider Real Environment Validation ===");

    let (Some(api_token), Some(layout_path)) =
        (required("CLOUDFLARE_API_TOKEN"), required("DNSER_CONFIG"))
    else {
        return ExitCode::from(1);
    };
    let zone_id = env::var("CLOUDFLARE_ZONE_ID").ok();

    let mode = env::var("DNSER_MODE").unwrap_or_else(|_| "dry-run".to_string());
    let dry_run = !mode.eq_ignore_ascii_case("live");
    if dry_run {
        tracing::warn!("Running in DRY-RUN mode - no changes will be made");
    } else {
        tracing::warn!("Running in LIVE mode - will make actual DNS changes!");
    }

    tracing::info!("--- Step 1: Loading layout ---");
    let layout = match ZoneLayout::from_path(&layout_path) {
        Ok(layout) => layout,
        Err(e) => {
            tracing::error!("✗ {}", e);
            return ExitCode::from(1);
        }
    };
    tracing::info!("✓ {} zone(s) in {}", layout.zones.len(), layout_path);

    tracing::info!("--- Step 2: Creating Cloudflare Provider ---");
    let provider = match CloudflareProvider::new(api_token, zone_id, dry_run) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("✗ {}", e);
            return ExitCode::from(1);
        }
    };
    tracing::info!("Provider created: {:?}", provider);

    for zone in &layout.zones {
        tracing::info!("--- Zone {} ---", zone.apex);

        let observed = match provider.list_records(&zone.apex).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("✗ Listing failed: {}", e);
                return ExitCode::from(2);
            }
        };
        tracing::info!("✓ Listed {} A/CNAME record(s)", observed.len());

        let actions = match compute_zone_actions(zone, &observed) {
            Ok(actions) => actions,
            Err(e) => {
                tracing::error!("✗ {}", e);
                return ExitCode::from(2);
            }
        };
        match stage(&zone.apex, &actions) {
            Ok(stages) => {
                for stage in &stages {
                    tracing::info!(
                        "  stage {}: {}",
                        stage.depth,
                        serde_json::to_string(&stage.actions).unwrap_or_default()
                    );
                }
            }
            Err(e) => tracing::warn!("Actions cannot be staged: {}", e),
        }

        if actions.is_empty() {
            tracing::info!("✓ Zone already matches the layout");
            continue;
        }

        match provider.apply(&zone.apex, &actions).await {
            Ok(outcome) => tracing::info!(
                "✓ Apply succeeded: {} upserted, {} deleted{}",
                outcome.upserted,
                outcome.deleted,
                if dry_run { " (simulated)" } else { "" }
            ),
            Err(e) => {
                tracing::error!("✗ Apply failed: {}", e);
                return ExitCode::from(2);
            }
        }

        if !dry_run {
            tracing::info!("--- Checking idempotency ---");
            let converged = match provider.list_records(&zone.apex).await {
                Ok(records) => compute_zone_actions(zone, &records)
                    .map(|a| a.is_empty())
                    .unwrap_or(false),
                Err(_) => false,
            };
            if converged {
                tracing::info!("✓ Idempotency verified (nothing left to do)");
            } else {
                tracing::warn!("⚠ Zone still differs from the layout after apply");
            }
        }
    }

    if dry_run {
        tracing::info!("=== DRY-RUN COMPLETE ===");
        tracing::info!("No changes were made to DNS records.");
        tracing::info!("To make actual changes, set DNSER_MODE=live");
    } else {
        tracing::info!("=== LIVE MODE COMPLETE ===");
    }

    ExitCode::SUCCESS
}
