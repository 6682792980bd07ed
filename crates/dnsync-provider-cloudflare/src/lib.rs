// # Cloudflare Remote Store
//
// This crate provides the Cloudflare API v4 implementation of `RemoteStore`.
//
// ## Behavior
//
// - ✅ One HTTP request per store call (lookup, create, update or delete)
// - ✅ Full error propagation; the sync is the unit of retry
// - ✅ HTTP timeout configured (30 seconds), reported as a retryable error
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Dry-run mode: lookups are real, mutations are only logged
// - ❌ NO retry or backoff logic
// - ❌ NO caching of records between calls
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (Remote Store)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTPS API calls to the configured API base only
// - ✅ Parse Cloudflare response envelopes into `RemoteRecord`
//
// **Forbidden Capabilities**:
// - ❌ Decide whether a mutation is needed (owned by the plan builder)
// - ❌ Touch records other than the one named by the call
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Construction fails with a configuration error if token or zone is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dnsync_core::config::ProviderConfig;
use dnsync_core::record::normalize_name;
use dnsync_core::traits::{RemoteStore, RemoteStoreFactory};
use dnsync_core::{DeclaredRecord, Error, IdentityKey, RecordType, Registry, RemoteRecord, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Cloudflare remote store, scoped to a single zone
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all GET requests (record lookups)
/// - Log the intended POST/PATCH/DELETE with its payload
/// - **NOT** modify any record
pub struct CloudflareStore {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone holding every managed record
    zone_id: String,

    /// API base, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// If true, perform lookups but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareStore")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Cloudflare's response wrapper
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

/// A DNS record as returned by the API
#[derive(Debug, Deserialize)]
struct CloudflareRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    ttl: u32,
    #[serde(default)]
    proxied: bool,
    priority: Option<u16>,
}

impl CloudflareRecord {
    fn into_remote(self) -> Result<RemoteRecord> {
        let record_type: RecordType = self.record_type.parse().map_err(|_| {
            Error::provider(
                PROVIDER,
                format!("unsupported record type `{}` for {}", self.record_type, self.id),
            )
        })?;

        Ok(RemoteRecord {
            id: self.id,
            name: normalize_name(&self.name),
            record_type,
            content: self.content,
            ttl: self.ttl,
            proxied: self.proxied,
            priority: self.priority,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DeletedRecord {
    id: String,
}

/// Body of POST and PATCH requests
#[derive(Debug, Serialize)]
struct RecordPayload<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u16>,
}

impl<'a> From<&'a DeclaredRecord> for RecordPayload<'a> {
    fn from(record: &'a DeclaredRecord) -> Self {
        Self {
            record_type: record.record_type.as_str(),
            name: &record.name,
            content: &record.content,
            ttl: record.ttl,
            proxied: record
                .record_type
                .is_proxiable()
                .then_some(record.effective_proxied()),
            priority: if record.record_type.requires_priority() {
                record.priority
            } else {
                None
            },
        }
    }
}

impl CloudflareStore {
    /// Create a store against the public Cloudflare API
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone holding every managed record
    /// - `dry_run`: If true, perform lookups but skip mutations
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>, dry_run: bool) -> Result<Self> {
        Self::with_base_url(api_token, zone_id, CLOUDFLARE_API_BASE, dry_run)
    }

    /// Create a store against a custom API base (for example a mock server)
    pub fn with_base_url(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        base_url: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Replace the default 30 second request timeout
    pub fn with_http_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    /// Send a request and unwrap the response envelope
    ///
    /// `context` names the call in error messages, e.g. "create api.example.com (A)".
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(e, context))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, context))?;

        if !status.is_success() {
            return Err(status_error(status, &body, context));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(PROVIDER, format!("{}: failed to parse response: {}", context, e))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{}: {}", context, describe_errors(&envelope.errors)),
            ));
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl RemoteStore for CloudflareStore {
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=api.example.com&type=A
    /// Authorization: Bearer <token>
    /// ```
    async fn find_by_name_and_type(&self, key: &IdentityKey) -> Result<Option<RemoteRecord>> {
        tracing::debug!("Looking up {} in zone {}", key, self.zone_id);

        let context = format!("lookup {}", key);
        let request = self
            .client
            .get(self.records_url())
            .query(&[("name", key.name.as_str()), ("type", key.record_type.as_str())]);

        let records: Vec<CloudflareRecord> = self.execute(request, &context).await?.unwrap_or_default();
        if records.len() > 1 {
            tracing::warn!("{} matched {} records, using the first", key, records.len());
        }

        records.into_iter().next().map(CloudflareRecord::into_remote).transpose()
    }

    async fn create(&self, record: &DeclaredRecord) -> Result<RemoteRecord> {
        let payload = RecordPayload::from(record);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would POST {} with payload: {}",
                self.records_url(),
                serde_json::to_string(&payload)?
            );
            return Ok(RemoteRecord::from_declared("dry-run", record));
        }

        let context = format!("create {}", record.key());
        let request = self.client.post(self.records_url()).json(&payload);
        let created: CloudflareRecord = self
            .execute(request, &context)
            .await?
            .ok_or_else(|| Error::provider(PROVIDER, format!("{}: response has no result", context)))?;

        created.into_remote()
    }

    async fn update(&self, id: &str, record: &DeclaredRecord) -> Result<RemoteRecord> {
        let payload = RecordPayload::from(record);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would PATCH {} with payload: {}",
                self.record_url(id),
                serde_json::to_string(&payload)?
            );
            return Ok(RemoteRecord::from_declared(id, record));
        }

        let context = format!("update {} [{}]", record.key(), id);
        let request = self.client.patch(self.record_url(id)).json(&payload);
        let updated: CloudflareRecord = self
            .execute(request, &context)
            .await?
            .ok_or_else(|| Error::provider(PROVIDER, format!("{}: response has no result", context)))?;

        updated.into_remote()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would DELETE {}", self.record_url(id));
            return Ok(());
        }

        let context = format!("delete [{}]", id);
        let request = self.client.delete(self.record_url(id));
        if let Some(deleted) = self.execute::<DeletedRecord>(request, &context).await? {
            tracing::debug!("Cloudflare confirmed deletion of {}", deleted.id);
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

fn transport_error(e: reqwest::Error, context: &str) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("{}: request timed out", context))
    } else {
        Error::http(format!("{}: {}", context, e))
    }
}

/// Map a non-2xx status to the matching error kind
fn status_error(status: reqwest::StatusCode, body: &str, context: &str) -> Error {
    let detail = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| describe_errors(&envelope.errors))
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions ({})",
            context, status
        )),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        409 => Error::provider(PROVIDER, format!("{}: conflict ({}): {}", context, status, detail)),
        429 => Error::rate_limited(format!("{}: rate limit exceeded ({})", context, status)),
        500..=599 => Error::provider_transient(
            PROVIDER,
            format!("{}: server error ({}): {}", context, status, detail),
        ),
        _ => Error::provider(PROVIDER, format!("{}: {} - {}", context, status, detail)),
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request was not successful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Factory for creating Cloudflare stores
pub struct CloudflareFactory;

impl RemoteStoreFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig, dry_run: bool) -> Result<Arc<dyn RemoteStore>> {
        match config {
            ProviderConfig::Cloudflare { api_token, zone_id } => {
                if dry_run {
                    tracing::warn!("Cloudflare store running in DRY-RUN mode - no changes will be made");
                }
                Ok(Arc::new(CloudflareStore::new(
                    api_token.clone(),
                    zone_id.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare store with a registry
///
/// # Example
///
/// ```rust
/// use dnsync_core::Registry;
///
/// let registry = Registry::new();
/// dnsync_provider_cloudflare::register(&registry);
/// assert!(registry.has_store("cloudflare"));
/// ```
pub fn register(registry: &Registry) {
    registry.register_store(PROVIDER, Box::new(CloudflareFactory));
}
