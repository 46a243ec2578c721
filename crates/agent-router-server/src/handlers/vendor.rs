// agent-router-server/src/handlers/vendor.rs
// ============================================================================
// Module: Vendor Pricing Tools
// Description: Tool surface over the vendor pricing service.
// Purpose: Expose search, check, source listing, and batch pricing to agents.
// Dependencies: agent-router-providers, serde, serde_json
// ============================================================================

//! ## Overview
//! Thin wrappers over [`VendorPricing`]. Reports are returned with `ok: true`
//! merged in; validation errors map onto the router error taxonomy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_router_providers::BatchItem;
use agent_router_providers::CheckOutcome;
use agent_router_providers::VendorError;
use agent_router_providers::VendorPricing;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use super::ToolServices;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// `vendor_price_search` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    /// Search query.
    query: String,
    /// Optional vendor subset.
    #[serde(default)]
    vendors: Option<Vec<String>>,
    /// Maximum quotes returned.
    #[serde(default = "default_max_results")]
    max_results: usize,
}

/// `vendor_price_check` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckArgs {
    /// Vendor key.
    vendor: String,
    /// Vendor SKU or part number.
    sku: String,
}

/// `vendor_price_batch` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchArgs {
    /// Bill of materials lines.
    items: Vec<BatchItem>,
    /// Quotes kept per line.
    #[serde(default = "default_max_results_per_item")]
    max_results_per_item: usize,
}

/// Default quote count for searches.
const fn default_max_results() -> usize {
    5
}

/// Default quote count per batch line.
const fn default_max_results_per_item() -> usize {
    3
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps vendor validation errors onto handler errors.
fn vendor_error(error: VendorError) -> HandlerError {
    match error {
        VendorError::TooManyLineItems {
            count,
            max,
        } => HandlerError::MaxLineItems {
            count,
            max,
        },
        VendorError::Client(message) => HandlerError::Internal(message),
        other => HandlerError::InvalidInput(other.to_string()),
    }
}

/// Serializes `report` and merges `ok: true` into it.
fn ok_report<T: Serialize>(report: &T) -> Result<Value, HandlerError> {
    let mut value = serde_json::to_value(report)
        .map_err(|err| HandlerError::Internal(format!("report serialization failed: {err}")))?;
    if let Some(object) = value.as_object_mut() {
        object.insert("ok".to_string(), Value::Bool(true));
    }
    Ok(value)
}

/// Vendor keys as a schema enum.
fn vendor_enum(pricing: &VendorPricing) -> Value {
    json!(pricing.supported_vendors())
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Registers the vendor pricing tools.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let pricing = services.pricing.clone();
    registry.register(
        ToolDefinition::new(
            "vendor_price_search",
            "Search supported electrical distributors for a product and return quotes ordered by match confidence, highest first.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "vendors": {"type": "array", "items": {"type": "string", "enum": vendor_enum(&pricing)}},
                    "max_results": {"type": "integer", "minimum": 1, "default": default_max_results()}
                },
                "required": ["query"]
            }),
        ),
        move |arguments: Value| {
            let args: SearchArgs = parse_args(arguments)?;
            let report = pricing
                .search(&args.query, args.vendors.as_deref(), args.max_results)
                .map_err(vendor_error)?;
            ok_report(&report)
        },
    );

    let pricing = services.pricing.clone();
    registry.register(
        ToolDefinition::new(
            "vendor_price_check",
            "Check the price and availability of one SKU at one vendor.",
            json!({
                "type": "object",
                "properties": {
                    "vendor": {"type": "string", "enum": vendor_enum(&pricing)},
                    "sku": {"type": "string"}
                },
                "required": ["vendor", "sku"]
            }),
        ),
        move |arguments: Value| {
            let args: CheckArgs = parse_args(arguments)?;
            match pricing.check(&args.vendor, &args.sku).map_err(vendor_error)? {
                CheckOutcome::Quote(quote) => Ok(json!({"ok": true, "result": quote})),
                CheckOutcome::CircuitOpen {
                    vendor,
                } => Err(HandlerError::CircuitOpen {
                    vendor,
                }),
            }
        },
    );

    let pricing = services.pricing.clone();
    registry.register(
        ToolDefinition::new(
            "vendor_list_sources",
            "List configured vendor sources with circuit breaker status and pricing limits.",
            json!({"type": "object", "properties": {}}),
        ),
        move |_arguments: Value| ok_report(&pricing.list_sources()),
    );

    let pricing = services.pricing.clone();
    registry.register(
        ToolDefinition::new(
            "vendor_price_batch",
            "Price a bill of materials across vendors, returning the best quote per line and an estimated total.",
            json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "maxItems": pricing.max_line_items(),
                        "items": {
                            "type": "object",
                            "properties": {
                                "query": {"type": "string"},
                                "vendors": {"type": "array", "items": {"type": "string"}},
                                "quantity": {"type": "number", "minimum": 0}
                            },
                            "required": ["query"]
                        }
                    },
                    "max_results_per_item": {"type": "integer", "minimum": 1, "default": default_max_results_per_item()}
                },
                "required": ["items"]
            }),
        ),
        move |arguments: Value| {
            let args: BatchArgs = parse_args(arguments)?;
            let report =
                pricing.batch(&args.items, args.max_results_per_item).map_err(vendor_error)?;
            ok_report(&report)
        },
    );
}
