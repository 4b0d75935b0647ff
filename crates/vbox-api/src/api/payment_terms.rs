// Payment-term master list. Deployed backends disagree on both the route and
// the field names, so the raw payload is normalized here.

use serde_json::Value;
use tracing::debug;

use vbox_core::models::PaymentTerm;

use super::{decode, path, MarketplaceClient};
use crate::dispatcher::RequestOptions;
use crate::error::ApiError;

const LIST_KEYS: [&str; 3] = ["terms", "data", "payment_terms"];
const ID_KEYS: [&str; 4] = ["payment_term_id", "termid", "term_id", "id"];
const NAME_KEYS: [&str; 4] = ["payment_term_name", "termname", "term_name", "name"];
const UNKNOWN_NAME: &str = "Unknown";

impl MarketplaceClient {
    /// Tries `/payment-terms`, and `/master/payment-terms` only when the
    /// first route is missing (404).
    pub async fn fetch_payment_terms(&self) -> Result<Vec<PaymentTerm>, ApiError> {
        const GENERIC: &str = "Failed to fetch payment terms";

        let response = match self
            .call(&path("/payment-terms"), RequestOptions::get(), GENERIC)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                debug!("payment-terms route missing, trying master list");
                self.call(&path("/master/payment-terms"), RequestOptions::get(), GENERIC)
                    .await?
            }
            Err(e) => return Err(e),
        };

        let raw: Value = decode(&response, "payment terms")?;
        Ok(normalize_payment_terms(&raw))
    }
}

/// Normalize a payment-term payload: either a bare list or an object with
/// the list under `terms`, `data`, or `payment_terms`. Anything else yields
/// an empty list.
pub fn normalize_payment_terms(raw: &Value) -> Vec<PaymentTerm> {
    let items = match raw {
        Value::Array(items) => Some(items),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    items
        .map(|items| items.iter().map(normalize_payment_term).collect())
        .unwrap_or_default()
}

/// Normalize one entry. The id comes from the first candidate field holding
/// a whole number (or a string of one); the name from the first non-null
/// candidate. A missing id becomes 0 and a missing name `"Unknown"`.
pub fn normalize_payment_term(raw: &Value) -> PaymentTerm {
    let id = ID_KEYS
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(as_id)
        .unwrap_or(0);

    let name = NAME_KEYS
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    PaymentTerm {
        id,
        name,
        description,
    }
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
