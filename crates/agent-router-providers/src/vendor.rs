// agent-router-providers/src/vendor.rs
// ============================================================================
// Module: Vendor Pricing Service
// Description: Rate-limited, breaker-guarded vendor price lookups.
// Purpose: Back the vendor pricing tools with stable, never-null results.
// Dependencies: agent-router-core, reqwest, serde, tracing
// ============================================================================

//! ## Overview
//! [`VendorPricing`] fans a query out to vendor adapters. Every vendor call
//! passes through the per-vendor rate limiter, and a vendor whose circuit
//! breaker is open is skipped without a request and reported with reason
//! `circuit_breaker_open`. Transient HTTP failures (429, 5xx, transport) are
//! retried with doubling backoff; a call that still fails counts as one
//! breaker failure. A vendor with nothing to report still yields a stable
//! record with `price: null` and a `reason`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use agent_router_core::Clock;
use agent_router_core::VendorCircuitBreaker;
use agent_router_core::VendorRateLimiter;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::adapters::VendorAdapter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reason for a vendor that returned no priced result.
pub const REASON_NO_MATCH: &str = "no_match";
/// Reason for a vendor whose request failed.
pub const REASON_ADAPTER_ERROR: &str = "adapter_error";
/// Reason for a vendor skipped by its circuit breaker.
pub const REASON_CIRCUIT_OPEN: &str = "circuit_breaker_open";
/// Maximum vendor page size read into memory.
const MAX_PAGE_BYTES: u64 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Normalized vendor price result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorQuote {
    /// Vendor key.
    pub vendor: String,
    /// Vendor SKU, empty when unknown.
    pub sku: String,
    /// Unit price, `None` when no price was found.
    pub price: Option<f64>,
    /// ISO currency code.
    pub currency: String,
    /// Availability marker.
    pub availability: String,
    /// Lead time text.
    #[serde(rename = "leadTime")]
    pub lead_time: String,
    /// Page the quote came from.
    pub url: String,
    /// Parser confidence in `[0, 1]`.
    pub confidence: f64,
    /// Query that produced the quote.
    pub query: String,
    /// Why the quote has no price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VendorQuote {
    /// Returns an unpriced quote with an optional reason.
    #[must_use]
    pub fn empty(vendor: &str, query: &str, reason: Option<&str>) -> Self {
        Self {
            vendor: vendor.to_string(),
            sku: String::new(),
            price: None,
            currency: "USD".to_string(),
            availability: "unknown".to_string(),
            lead_time: String::new(),
            url: String::new(),
            confidence: 0.0,
            query: query.to_string(),
            reason: reason.map(str::to_string),
        }
    }
}

/// Vendor request failure surfaced in search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorFailure {
    /// Vendor key.
    pub vendor: String,
    /// Failure description.
    pub error: String,
}

/// Result of a multi-vendor search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Trimmed query.
    pub query: String,
    /// Number of vendors targeted.
    pub vendor_count: usize,
    /// Number of results returned.
    pub result_count: usize,
    /// Results sorted by confidence, highest first.
    pub results: Vec<VendorQuote>,
    /// Vendor request failures.
    pub errors: Vec<VendorFailure>,
    /// Vendors skipped by an open circuit breaker.
    pub skipped: Vec<String>,
}

/// Result of a single-SKU check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Vendor was queried; the quote may be unpriced.
    Quote(VendorQuote),
    /// Vendor breaker is open; no request was made.
    CircuitOpen {
        /// Vendor key.
        vendor: String,
    },
}

/// Configured vendor source description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Vendor key.
    pub vendor: String,
    /// Display name.
    pub display_name: String,
    /// Search URL template.
    pub search_url_template: String,
    /// `configured` or `circuit_open`.
    pub status: String,
    /// Consecutive failures recorded by the breaker.
    pub failure_count: u32,
}

/// Configured vendors and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesReport {
    /// Number of vendors.
    pub vendor_count: usize,
    /// Vendor descriptions.
    pub vendors: Vec<SourceInfo>,
    /// Requests per minute per vendor.
    pub rate_limit_rpm: u32,
    /// Request timeout in seconds.
    pub request_timeout_sec: u64,
    /// Retry attempts on transient failures.
    pub max_retries: u32,
    /// Maximum batch size.
    pub max_line_items: usize,
}

/// One line of a batch lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Search query.
    pub query: String,
    /// Optional vendor subset.
    #[serde(default)]
    pub vendors: Option<Vec<String>>,
    /// Optional quantity used for the extended price.
    #[serde(default)]
    pub quantity: Option<f64>,
}

/// Result for one batch line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLine {
    /// Position in the request.
    pub index: usize,
    /// Query as submitted.
    pub query: String,
    /// Quantity as submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Highest-confidence quote, unpriced when none was found.
    pub best: VendorQuote,
    /// Best price times quantity, when both are known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_price: Option<f64>,
    /// All quotes for this line.
    pub results: Vec<VendorQuote>,
    /// Line-level validation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a batch lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of lines.
    pub item_count: usize,
    /// Number of lines with a priced best quote.
    pub priced_count: usize,
    /// Sum of extended prices.
    pub estimated_total: f64,
    /// Per-line results.
    pub items: Vec<BatchLine>,
}

/// Vendor pricing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorPricingConfig {
    /// Requests per minute per vendor (reported only; the limiter enforces it).
    pub rate_limit_rpm: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Extra attempts on 429, 5xx, and transport failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry.
    pub retry_backoff: Duration,
    /// Outbound user agent.
    pub user_agent: String,
    /// Maximum batch lines.
    pub max_line_items: usize,
}

impl Default for VendorPricingConfig {
    fn default() -> Self {
        Self {
            rate_limit_rpm: 30,
            request_timeout: Duration::from_secs(15),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            user_agent: "AgentRouter-PricingBot/1.0".to_string(),
            max_line_items: 50,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Vendor request validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VendorError {
    /// Query was empty.
    #[error("query must be a non-empty string")]
    EmptyQuery,
    /// SKU was empty.
    #[error("sku must be a non-empty string")]
    EmptySku,
    /// Batch had no lines.
    #[error("items must be a non-empty list")]
    EmptyBatch,
    /// Unknown vendor keys.
    #[error("unknown vendor(s): {}; supported: {}", unknown.join(", "), supported.join(", "))]
    UnknownVendor {
        /// Unrecognized keys.
        unknown: Vec<String>,
        /// Supported keys.
        supported: Vec<String>,
    },
    /// Batch exceeded the line limit.
    #[error("batch has {count} line items; maximum is {max}")]
    TooManyLineItems {
        /// Submitted lines.
        count: usize,
        /// Allowed lines.
        max: usize,
    },
    /// HTTP client could not be created.
    #[error("vendor client error: {0}")]
    Client(String),
}

/// Outcome of one vendor call.
enum FetchOutcome {
    /// A priced quote.
    Quote(VendorQuote),
    /// The page had no price.
    NoMatch,
    /// The request failed after retries.
    Failed(String),
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Vendor pricing service.
pub struct VendorPricing {
    /// Adapters in registration order.
    adapters: Vec<VendorAdapter>,
    /// Settings.
    config: VendorPricingConfig,
    /// Per-vendor spacing.
    limiter: Arc<VendorRateLimiter>,
    /// Per-vendor breaker.
    breaker: Arc<VendorCircuitBreaker>,
    /// Time source for retry backoff.
    clock: Arc<dyn Clock>,
    /// HTTP client.
    client: Client,
}

impl VendorPricing {
    /// Creates the service.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Client`] when the HTTP client cannot be built.
    pub fn new(
        config: VendorPricingConfig,
        adapters: Vec<VendorAdapter>,
        limiter: Arc<VendorRateLimiter>,
        breaker: Arc<VendorCircuitBreaker>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VendorError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| VendorError::Client("http client build failed".to_string()))?;
        Ok(Self {
            adapters,
            config,
            limiter,
            breaker,
            clock,
            client,
        })
    }

    /// Returns the supported vendor keys.
    #[must_use]
    pub fn supported_vendors(&self) -> Vec<String> {
        self.adapters.iter().map(|adapter| adapter.key.clone()).collect()
    }

    /// Returns the configured batch ceiling.
    #[must_use]
    pub const fn max_line_items(&self) -> usize {
        self.config.max_line_items
    }

    /// Returns the breaker shared with this service.
    #[must_use]
    pub fn breaker(&self) -> &VendorCircuitBreaker {
        &self.breaker
    }

    /// Searches vendors for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError`] for an empty query or unknown vendor keys.
    pub fn search(
        &self,
        query: &str,
        vendors: Option<&[String]>,
        max_results: usize,
    ) -> Result<SearchReport, VendorError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VendorError::EmptyQuery);
        }
        let targets = self.resolve_vendors(vendors)?;

        let mut results = Vec::with_capacity(targets.len());
        let mut errors = Vec::new();
        let mut skipped = Vec::new();
        for adapter in &targets {
            if self.breaker.is_open(&adapter.key) {
                info!(vendor = %adapter.key, "vendor circuit open; skipping");
                skipped.push(adapter.key.clone());
                results.push(VendorQuote::empty(&adapter.key, query, Some(REASON_CIRCUIT_OPEN)));
                continue;
            }
            match self.fetch(adapter, query) {
                FetchOutcome::Quote(quote) => results.push(quote),
                FetchOutcome::NoMatch => {
                    results.push(VendorQuote::empty(&adapter.key, query, Some(REASON_NO_MATCH)));
                }
                FetchOutcome::Failed(error) => {
                    errors.push(VendorFailure {
                        vendor: adapter.key.clone(),
                        error,
                    });
                    results.push(VendorQuote::empty(&adapter.key, query, Some(REASON_ADAPTER_ERROR)));
                }
            }
        }

        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results.truncate(max_results);
        Ok(SearchReport {
            query: query.to_string(),
            vendor_count: targets.len(),
            result_count: results.len(),
            results,
            errors,
            skipped,
        })
    }

    /// Looks up one SKU at one vendor.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError`] for an unknown vendor or empty SKU.
    pub fn check(&self, vendor: &str, sku: &str) -> Result<CheckOutcome, VendorError> {
        let adapter = self.adapter(vendor).ok_or_else(|| VendorError::UnknownVendor {
            unknown: vec![vendor.to_string()],
            supported: self.supported_vendors(),
        })?;
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(VendorError::EmptySku);
        }
        if self.breaker.is_open(&adapter.key) {
            info!(vendor = %adapter.key, "vendor circuit open; skipping");
            return Ok(CheckOutcome::CircuitOpen {
                vendor: adapter.key.clone(),
            });
        }
        let quote = match self.fetch(adapter, sku) {
            FetchOutcome::Quote(quote) => quote,
            FetchOutcome::NoMatch => VendorQuote::empty(&adapter.key, sku, Some(REASON_NO_MATCH)),
            FetchOutcome::Failed(_) => {
                VendorQuote::empty(&adapter.key, sku, Some(REASON_ADAPTER_ERROR))
            }
        };
        Ok(CheckOutcome::Quote(quote))
    }

    /// Describes configured vendors and their breaker state.
    #[must_use]
    pub fn list_sources(&self) -> SourcesReport {
        let vendors: Vec<SourceInfo> = self
            .adapters
            .iter()
            .map(|adapter| SourceInfo {
                vendor: adapter.key.clone(),
                display_name: adapter.display_name.clone(),
                search_url_template: adapter.search_url_template.clone(),
                status: if self.breaker.is_open(&adapter.key) { "circuit_open" } else { "configured" }
                    .to_string(),
                failure_count: self.breaker.failure_count(&adapter.key),
            })
            .collect();
        SourcesReport {
            vendor_count: vendors.len(),
            vendors,
            rate_limit_rpm: self.config.rate_limit_rpm,
            request_timeout_sec: self.config.request_timeout.as_secs(),
            max_retries: self.config.max_retries,
            max_line_items: self.config.max_line_items,
        }
    }

    /// Prices a list of line items.
    ///
    /// Line-level validation failures are reported on the line; only an
    /// empty or oversized batch fails the whole call.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::EmptyBatch`] or [`VendorError::TooManyLineItems`].
    pub fn batch(
        &self,
        items: &[BatchItem],
        max_results_per_item: usize,
    ) -> Result<BatchReport, VendorError> {
        if items.is_empty() {
            return Err(VendorError::EmptyBatch);
        }
        if items.len() > self.config.max_line_items {
            return Err(VendorError::TooManyLineItems {
                count: items.len(),
                max: self.config.max_line_items,
            });
        }
        let mut lines = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let line = match self.search(&item.query, item.vendors.as_deref(), max_results_per_item)
            {
                Ok(report) => {
                    let best = report.results.first().cloned().unwrap_or_else(|| {
                        VendorQuote::empty("", &report.query, Some(REASON_NO_MATCH))
                    });
                    let extended_price = best
                        .price
                        .zip(item.quantity)
                        .map(|(price, quantity)| crate::adapters::round2(price * quantity));
                    BatchLine {
                        index,
                        query: item.query.clone(),
                        quantity: item.quantity,
                        best,
                        extended_price,
                        results: report.results,
                        error: None,
                    }
                }
                Err(err) => BatchLine {
                    index,
                    query: item.query.clone(),
                    quantity: item.quantity,
                    best: VendorQuote::empty("", &item.query, Some(REASON_NO_MATCH)),
                    extended_price: None,
                    results: Vec::new(),
                    error: Some(err.to_string()),
                },
            };
            lines.push(line);
        }
        let priced_count = lines.iter().filter(|line| line.best.price.is_some()).count();
        let estimated_total =
            crate::adapters::round2(lines.iter().filter_map(|line| line.extended_price).sum());
        Ok(BatchReport {
            item_count: lines.len(),
            priced_count,
            estimated_total,
            items: lines,
        })
    }

    /// Returns the adapter for `vendor`.
    fn adapter(&self, vendor: &str) -> Option<&VendorAdapter> {
        self.adapters.iter().find(|adapter| adapter.key == vendor)
    }

    /// Resolves the requested vendor subset, defaulting to all vendors.
    fn resolve_vendors(&self, vendors: Option<&[String]>) -> Result<Vec<&VendorAdapter>, VendorError> {
        let Some(requested) = vendors.filter(|list| !list.is_empty()) else {
            return Ok(self.adapters.iter().collect());
        };
        let unknown: Vec<String> =
            requested.iter().filter(|key| self.adapter(key).is_none()).cloned().collect();
        if !unknown.is_empty() {
            return Err(VendorError::UnknownVendor {
                unknown,
                supported: self.supported_vendors(),
            });
        }
        Ok(requested.iter().filter_map(|key| self.adapter(key)).collect())
    }

    /// Calls one vendor, updating the breaker with the outcome.
    fn fetch(&self, adapter: &VendorAdapter, query: &str) -> FetchOutcome {
        self.limiter.wait(&adapter.key);
        let url = adapter.search_url(query);
        match self.get_with_retry(&url) {
            Ok(page) => {
                self.breaker.record_success(&adapter.key);
                adapter
                    .profile
                    .parse(&adapter.key, &page, query, &url)
                    .map_or(FetchOutcome::NoMatch, FetchOutcome::Quote)
            }
            Err(error) => {
                warn!(vendor = %adapter.key, error = %error, "vendor request failed");
                self.breaker.record_failure(&adapter.key);
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Fetches a page, retrying 429, 5xx, and transport failures.
    fn get_with_retry(&self, url: &str) -> Result<String, String> {
        let mut attempt = 0_u32;
        loop {
            let retryable = match self.client.get(url).send() {
                Ok(response) if response.status() == StatusCode::OK => {
                    return read_page(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let message = format!("vendor returned {}", status.as_u16());
                    if !is_retryable(status) {
                        return Err(message);
                    }
                    message
                }
                Err(err) => format!("request failed: {err}"),
            };
            if attempt >= self.config.max_retries {
                return Err(retryable);
            }
            let factor = 2_u32.saturating_pow(attempt);
            self.clock.sleep(self.config.retry_backoff.saturating_mul(factor));
            attempt += 1;
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for statuses worth retrying.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Reads a page body up to the size limit.
fn read_page(response: reqwest::blocking::Response) -> Result<String, String> {
    let mut body = Vec::new();
    response
        .take(MAX_PAGE_BYTES)
        .read_to_end(&mut body)
        .map_err(|err| format!("failed to read response: {err}"))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
