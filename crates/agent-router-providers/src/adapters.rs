// agent-router-providers/src/adapters.rs
// ============================================================================
// Module: Vendor Adapters
// Description: Search URL templates and page parsing profiles per vendor.
// Purpose: Turn a vendor search page into at most one priced quote.
// Dependencies: regex, url
// ============================================================================

//! ## Overview
//! Adapters are data, not code: each vendor is a search URL template plus a
//! [`ParseProfile`] of regular expressions and confidence levels. Parsing is
//! heuristic and intentionally shallow; the first price and first SKU on the
//! page win.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use url::form_urlencoded;

use crate::vendor::VendorQuote;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Availability marker when the page advertises stock.
const IN_STOCK: &str = "in_stock";
/// Availability marker when stock is unknown.
const CHECK_VENDOR: &str = "check_vendor";
/// Lead time when the page does not advertise stock.
const CALL_FOR_LEAD_TIME: &str = "call_for_lead_time";
/// Availability phrases shared by every vendor.
const AVAILABILITY_PATTERN: &str = r"(?i)in\s*stock|available|ships?\s*\w+";

// ============================================================================
// SECTION: Parse Profile
// ============================================================================

/// Regex-based extraction rules for one vendor.
#[derive(Debug, Clone)]
pub struct ParseProfile {
    /// Price pattern; the first non-empty capture group is the price.
    pub price: Regex,
    /// SKU pattern; the first non-empty capture group is the SKU.
    pub sku: Regex,
    /// Pattern whose presence marks the item as in stock.
    pub availability: Regex,
    /// Lead time reported for in-stock items.
    pub lead_time: String,
    /// Confidence when both price and SKU were found.
    pub full_confidence: f64,
    /// Confidence when only a price was found.
    pub price_only_confidence: f64,
}

impl ParseProfile {
    /// Extracts a quote from a search page, or `None` when no price is present.
    #[must_use]
    pub fn parse(&self, vendor: &str, html: &str, query: &str, page_url: &str) -> Option<VendorQuote> {
        let price = first_group(&self.price, html).and_then(|raw| parse_price(&raw))?;
        let in_stock = self.availability.is_match(html);
        let availability = if in_stock { IN_STOCK } else { CHECK_VENDOR };
        let mut quote = VendorQuote::empty(vendor, query, None);
        quote.price = Some(price);
        quote.availability = availability.to_string();
        quote.url = page_url.to_string();
        match first_group(&self.sku, html) {
            Some(sku) => {
                quote.sku = sku;
                quote.lead_time =
                    if in_stock { self.lead_time.clone() } else { CALL_FOR_LEAD_TIME.to_string() };
                quote.confidence = round2(self.full_confidence);
            }
            None => {
                quote.confidence = round2(self.price_only_confidence);
            }
        }
        Some(quote)
    }
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Vendor search endpoint and parsing rules.
#[derive(Debug, Clone)]
pub struct VendorAdapter {
    /// Stable vendor key.
    pub key: String,
    /// Human-readable vendor name.
    pub display_name: String,
    /// Search URL template with a `{q}` placeholder.
    pub search_url_template: String,
    /// Page parsing rules.
    pub profile: ParseProfile,
}

impl VendorAdapter {
    /// Returns the search URL for `query`, form-encoding the query.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.search_url_template.replace("{q}", &encoded)
    }

    /// Replaces the search URL template.
    #[must_use]
    pub fn with_search_url(mut self, template: impl Into<String>) -> Self {
        self.search_url_template = template.into();
        self
    }
}

/// Returns the built-in Grainger, Graybar, and HD Supply adapters.
///
/// # Errors
///
/// Returns [`regex::Error`] if a built-in pattern fails to compile.
pub fn default_adapters() -> Result<Vec<VendorAdapter>, regex::Error> {
    Ok(vec![
        VendorAdapter {
            key: "grainger".to_string(),
            display_name: "Grainger Industrial Supply".to_string(),
            search_url_template: "https://www.grainger.com/search?searchQuery={q}".to_string(),
            profile: ParseProfile {
                price: Regex::new(r#""price"\s*:\s*"?([\d.]+)"?"#)?,
                sku: Regex::new(r#"(?i)"sku"\s*:\s*"([A-Z0-9]+)"|item\s*#\s*:?\s*([A-Z0-9]+)"#)?,
                availability: Regex::new(AVAILABILITY_PATTERN)?,
                lead_time: "1-3 business days".to_string(),
                full_confidence: 0.65,
                price_only_confidence: 0.4,
            },
        },
        VendorAdapter {
            key: "graybar".to_string(),
            display_name: "Graybar Electric".to_string(),
            search_url_template: "https://www.graybar.com/search?q={q}".to_string(),
            profile: ParseProfile {
                price: Regex::new(r#""price"\s*:\s*"?([\d.]+)"?|\$\s*([\d,]+\.?\d*)"#)?,
                sku: Regex::new(
                    r#"(?i)"sku"\s*:\s*"([A-Z0-9\-]+)"|catalog\s*#\s*:?\s*([A-Z0-9\-]+)"#,
                )?,
                availability: Regex::new(AVAILABILITY_PATTERN)?,
                lead_time: "2-5 business days".to_string(),
                full_confidence: 0.60,
                price_only_confidence: 0.35,
            },
        },
        VendorAdapter {
            key: "hdsupply".to_string(),
            display_name: "HD Supply".to_string(),
            search_url_template: "https://hdsupply.com/search?q={q}".to_string(),
            profile: ParseProfile {
                price: Regex::new(r#""price"\s*:\s*"?([\d.]+)"?|\$\s*([\d,]+\.?\d*)"#)?,
                sku: Regex::new(r#"(?i)"sku"\s*:\s*"([A-Z0-9\-]+)"|sku\s*:?\s*#?\s*([A-Z0-9\-]+)"#)?,
                availability: Regex::new(AVAILABILITY_PATTERN)?,
                lead_time: "3-7 business days".to_string(),
                full_confidence: 0.55,
                price_only_confidence: 0.30,
            },
        },
    ])
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the first non-empty capture group of the first match.
fn first_group(pattern: &Regex, text: &str) -> Option<String> {
    let captures = pattern.captures(text)?;
    captures
        .iter()
        .skip(1)
        .flatten()
        .map(|group| group.as_str())
        .find(|group| !group.is_empty())
        .map(str::to_string)
}

/// Parses a price, dropping thousands separators.
fn parse_price(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok().filter(|price| price.is_finite())
}

/// Rounds to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
