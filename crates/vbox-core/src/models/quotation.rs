// Quotations: a buyer's request for a price on a seller's listing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a quotation. Any state may follow any other; no
/// ordering is implied. Statuses this client does not know are kept verbatim
/// in `Other` so one odd entry never spoils a whole page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuotationStatus {
    Pending,
    Negotiating,
    Accepted,
    Rejected,
    Expired,
    ConvertedToOrder,
    Other(String),
}

impl QuotationStatus {
    pub const ALL: [QuotationStatus; 6] = [
        Self::Pending,
        Self::Negotiating,
        Self::Accepted,
        Self::Rejected,
        Self::Expired,
        Self::ConvertedToOrder,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Negotiating => "negotiating",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::ConvertedToOrder => "converted_to_order",
            Self::Other(raw) => raw,
        }
    }

    /// Human-readable label. Unknown statuses show their raw value.
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Negotiating => "Negotiating",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::Expired => "Expired",
            Self::ConvertedToOrder => "Converted to Order",
            Self::Other(raw) => raw,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::Negotiating => "💬",
            Self::Accepted => "✅",
            Self::Rejected => "❌",
            Self::Expired => "⌛",
            Self::ConvertedToOrder => "📦",
            Self::Other(_) => "📋",
        }
    }
}

impl From<String> for QuotationStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => Self::Pending,
            "negotiating" => Self::Negotiating,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "expired" => Self::Expired,
            "converted_to_order" => Self::ConvertedToOrder,
            _ => Self::Other(raw),
        }
    }
}

impl From<QuotationStatus> for String {
    fn from(status: QuotationStatus) -> Self {
        match status {
            QuotationStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /vboxtrade/quotations/`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotationRequest {
    pub seller_price_id: i64,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
    /// Payment term id from the master list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A quotation as returned by the backend. Only the number and status are
/// required; the poller needs nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(default)]
    pub id: String,
    pub quotation_number: String,
    #[serde(default)]
    pub quotation_date: String,
    #[serde(default)]
    pub seller_price_id: i64,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub commodity_name: String,
    #[serde(default)]
    pub variety_name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_of_measure: String,
    #[serde(default)]
    pub offer_price: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
    pub status: QuotationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationList {
    #[serde(default)]
    pub quotations: Vec<Quotation>,
    #[serde(default)]
    pub total: u64,
}
