// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for dnser.
//
// ## Behavior
//
// - Lists every A and CNAME record of a zone, page by page
// - Applies an action set: deletes first, then upserts (PUT over an existing
//   record id, POST otherwise)
// - Maps HTTP status codes to specific errors (401/403, 404, 409, 429, 5xx)
// - HTTP timeout configured (30 seconds)
// - Dry-run mode: reads are performed, writes are only logged
// - NO retry, backoff or rate limiting: errors go straight to the caller
// - NO caching between calls
//
// CNAME records play the role of alias records. Cloudflare reports names
// without the trailing separator; they are normalized on the way in and
// stripped on the way out.
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=..`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dnser_core::config::ProviderConfig;
use dnser_core::traits::{ApplyOutcome, DnsProvider, DnsProviderFactory};
use dnser_core::{ActionSet, DnsRecord, Domain, Error, RecordKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page (Cloudflare's maximum)
const PAGE_SIZE: u32 = 100;

/// TTL written on created and updated records, in seconds
const DEFAULT_TTL: u32 = 300;

/// Environment variable switching the provider to dry-run
pub const MODE_ENV: &str = "DNSER_MODE";

/// A DNS record as Cloudflare reports it
#[derive(Debug, Clone, Deserialize)]
struct CloudflareRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
}

impl CloudflareRecord {
    /// Convert to a dnser record; other record types yield `None`
    fn to_record(&self) -> Option<DnsRecord> {
        match self.record_type.as_str() {
            "A" => Some(match self.content.parse::<Ipv4Addr>() {
                Ok(ip) => DnsRecord::address(self.name.as_str(), ip),
                Err(_) => DnsRecord {
                    kind: RecordKind::Address,
                    name: Domain::normalize(&self.name),
                    target: Domain::verbatim(self.content.clone()),
                },
            }),
            "CNAME" => Some(DnsRecord::alias(
                self.name.as_str(),
                self.content.as_str(),
            )),
            _ => None,
        }
    }
}

/// Body of a create or update request
#[derive(Debug, Serialize)]
struct RecordPayload<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

impl<'a> RecordPayload<'a> {
    fn from_record(record: &'a DnsRecord) -> Self {
        let (record_type, content) = match record.kind {
            RecordKind::Address => ("A", record.target.as_str()),
            RecordKind::Alias => ("CNAME", record.target.without_separator()),
        };
        Self {
            record_type,
            name: record.name.without_separator(),
            content,
            ttl: DEFAULT_TTL,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    result: Vec<CloudflareRecord>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot: every call talks to the API afresh and any
/// failure is returned to the caller untouched.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/PUT/DELETE requests
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, looked up from the apex otherwise)
    zone_id: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// API root, without trailing slash
    base_url: String,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up from the apex otherwise)
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the token is empty, or [`Error::Http`]
    /// if the HTTP client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            zone_id,
            client,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            dry_run,
        })
    }

    /// Point the provider at another API root (a mock server in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolve the zone ID for an apex
    ///
    /// If zone_id is set, returns it directly. Otherwise, queries Cloudflare API.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_zone_id(&self, zone: &Domain) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let zone_name = zone.without_separator();
        tracing::debug!("Looking up zone ID for {}", zone_name);

        let url = format!("{}/zones", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("name", zone_name)])
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;
        let response = check_status(response, &format!("zone {zone_name}")).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {e}")))?;

        let zones = json["result"].as_array().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: result is not an array")
        })?;

        let zone = zones
            .first()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {zone_name}")))?;

        let zone_id = zone["id"].as_str().ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: zone.id is not a string")
        })?;

        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(zone_id.to_string())
    }

    /// Fetch every record of a zone, following pagination
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100
    /// Authorization: Bearer <token>
    /// ```
    async fn fetch_records(&self, zone_id: &str) -> Result<Vec<CloudflareRecord>> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .bearer_auth(&self.api_token)
                .send()
                .await
                .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;
            let response = check_status(response, &format!("records of zone {zone_id}")).await?;

            let body: ListResponse = response.json().await.map_err(|e| {
                Error::provider("cloudflare", format!("Failed to parse response: {e}"))
            })?;
            if !body.success {
                return Err(Error::provider(
                    "cloudflare",
                    format!("Record listing rejected: {}", Value::Array(body.errors)),
                ));
            }

            let total_pages = body.result_info.map_or(1, |info| info.total_pages);
            tracing::debug!(
                "Fetched page {}/{} ({} record(s))",
                page,
                total_pages,
                body.result.len()
            );
            records.extend(body.result);

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// Create or replace one record
    async fn upsert(
        &self,
        zone_id: &str,
        existing: Option<&CloudflareRecord>,
        record: &DnsRecord,
    ) -> Result<()> {
        let payload = RecordPayload::from_record(record);
        let request = match existing {
            Some(current) => {
                let url = format!(
                    "{}/zones/{}/dns_records/{}",
                    self.base_url, zone_id, current.id
                );
                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would send PUT request to {} with payload: {}",
                        url,
                        serde_json::to_string(&payload)?
                    );
                    return Ok(());
                }
                self.client.put(url)
            }
            None => {
                let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would send POST request to {} with payload: {}",
                        url,
                        serde_json::to_string(&payload)?
                    );
                    return Ok(());
                }
                self.client.post(url)
            }
        };

        let response = request
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;
        check_status(response, &format!("record {}", record.name)).await?;

        tracing::info!("DNS record written: {}", record);
        Ok(())
    }

    /// Remove one record by id
    async fn delete(&self, zone_id: &str, current: &CloudflareRecord) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, current.id
        );
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;
        check_status(response, &format!("record {}", current.name)).await?;

        tracing::info!("DNS record deleted: {}", current.name);
        Ok(())
    }
}

/// Map a non-success HTTP status to a specific error
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {status}"
        )),
        404 => Error::not_found(format!("Cloudflare has no {what}")),
        409 => Error::provider(
            "cloudflare",
            format!("Conflict on {what}: {status} - {error_text}"),
        ),
        429 => Error::rate_limited(format!("Cloudflare rate limit exceeded. Status: {status}")),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {status} - {error_text}"),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("Request for {what} failed: {status} - {error_text}"),
        ),
    })
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(&self, zone: &Domain) -> Result<Vec<DnsRecord>> {
        let zone_id = self.resolve_zone_id(zone).await?;
        let records: Vec<DnsRecord> = self
            .fetch_records(&zone_id)
            .await?
            .iter()
            .filter_map(CloudflareRecord::to_record)
            .collect();

        tracing::debug!("Zone {} holds {} A/CNAME record(s)", zone, records.len());
        Ok(records)
    }

    /// Apply an action set to a zone
    ///
    /// The zone is listed once to resolve record ids. Deletes of names that
    /// no longer exist are skipped.
    ///
    /// # API Calls
    ///
    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// PUT    /zones/:zone_id/dns_records/:record_id
    /// POST   /zones/:zone_id/dns_records
    /// ```
    async fn apply(&self, zone: &Domain, actions: &ActionSet) -> Result<ApplyOutcome> {
        tracing::info!(
            "Applying {} action(s) to Cloudflare zone {} [mode: {}]",
            actions.len(),
            zone,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.resolve_zone_id(zone).await?;
        let current = self.fetch_records(&zone_id).await?;

        let mut by_name: HashMap<Domain, &CloudflareRecord> = HashMap::new();
        for record in current
            .iter()
            .filter(|r| r.record_type == "A" || r.record_type == "CNAME")
        {
            by_name.entry(Domain::normalize(&record.name)).or_insert(record);
        }

        let mut outcome = ApplyOutcome::default();

        for name in &actions.deletes {
            match by_name.get(name) {
                Some(existing) => {
                    self.delete(&zone_id, existing).await?;
                    outcome.deleted += 1;
                }
                None => tracing::debug!("{} is already absent", name),
            }
        }

        for record in &actions.puts {
            let existing = by_name.get(&record.name).copied();
            self.upsert(&zone_id, existing, record).await?;
            outcome.upserted += 1;
        }

        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Whether the environment requests dry-run mode
pub fn dry_run_from_env() -> bool {
    std::env::var(MODE_ENV)
        .unwrap_or_default()
        .eq_ignore_ascii_case("dry-run")
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                // Records are addressed through the zone; the account is not needed
                account_id: _,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                let dry_run = dry_run_from_env();
                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    zone_id.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dnser_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnser_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &dnser_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
