//! Wire shapes for the provider's Orders API.
//!
//! Request bodies are built from typed structs, and the two response shapes the
//! gateway reads (create-order, capture-order) are decoded into explicit structs
//! and validated here, before any workflow logic looks at them.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::GatewayError;

pub const STATUS_CREATED: &str = "CREATED";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_PENDING: &str = "PENDING";
pub const REL_APPROVE: &str = "approve";

// ── Requests ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Capture,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderBody {
    pub intent: Intent,
    pub application_context: ApplicationContext,
    pub purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationContext {
    pub cancel_url: String,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseUnit {
    pub reference_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amount {
    pub value: String,
    pub currency_code: String,
}

impl CreateOrderBody {
    /// A capture-intent order with a single purchase unit.
    pub fn capture(
        invoice_id: &str,
        amount: &BigDecimal,
        currency: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Self {
        Self {
            intent: Intent::Capture,
            application_context: ApplicationContext {
                cancel_url: cancel_url.to_string(),
                return_url: return_url.to_string(),
            },
            purchase_units: vec![PurchaseUnit {
                reference_id: invoice_id.to_string(),
                amount: Amount {
                    value: amount.to_string(),
                    currency_code: currency.to_string(),
                },
            }],
        }
    }
}

// ── Responses ──

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkDescription {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

/// Raw create-order body. Every field is optional so that a malformed body
/// decodes and can be rejected with a precise error. Link entries stay raw
/// until [`LinkDescription::from_entries`] so one bad entry cannot sink the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<Value>>,
}

impl LinkDescription {
    /// Decode each entry on its own, skipping the ones that are not link objects.
    pub fn from_entries(entries: &[Value]) -> Vec<Self> {
        entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect()
    }
}

/// A create-order response that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    pub id: String,
    pub approve_url: String,
}

impl CreateOrderResponse {
    /// Decode and validate a create-order result.
    ///
    /// Fails with `EmptyResponse` when the body is not an object of the right
    /// shape, `status` is not `CREATED`, `id` is empty, or `links` is missing,
    /// empty or not a list. Fails with `EmptyApproveUrl` when no link has the
    /// `approve` relation.
    pub fn validate(result: &Value) -> Result<CreatedOrder, GatewayError> {
        let response: Self =
            serde_json::from_value(result.clone()).map_err(|_| GatewayError::EmptyResponse)?;

        if response.status.as_deref() != Some(STATUS_CREATED) {
            return Err(GatewayError::EmptyResponse);
        }
        let id = match response.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(GatewayError::EmptyResponse),
        };
        let links = match response.links {
            Some(links) if !links.is_empty() => links,
            _ => return Err(GatewayError::EmptyResponse),
        };

        let links = LinkDescription::from_entries(&links);
        let approve_url = approve_url(&links).ok_or(GatewayError::EmptyApproveUrl)?;
        Ok(CreatedOrder { id, approve_url })
    }
}

/// Find the approval link. When several `approve` links are present the last
/// one wins; this mirrors a plain overwrite loop and is kept for compatibility,
/// not because the provider defines an ordering.
pub fn approve_url(links: &[LinkDescription]) -> Option<String> {
    let mut found = None;
    for link in links {
        if let (Some(REL_APPROVE), Some(href)) = (link.rel.as_deref(), link.href.as_deref()) {
            if !href.is_empty() {
                found = Some(href.to_string());
            }
        }
    }
    found
}

/// Capture-order body; only the status is consulted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureOrderResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CaptureOrderResponse {
    /// Decode a capture result. An undecodable body is treated as one with no
    /// status rather than an error.
    pub fn decode(result: &Value) -> Self {
        match serde_json::from_value(result.clone()) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "capture response did not match the expected shape");
                Self::default()
            }
        }
    }

    /// Provider status, `PENDING` when absent or empty.
    pub fn status(&self) -> &str {
        match self.status.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => STATUS_PENDING,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == STATUS_COMPLETED
    }
}
