// Public market data: ticker chips and FPO sell offers.

use serde::{Deserialize, Serialize};

/// One entry of the price ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketChip {
    pub id: String,
    pub commodity: String,
    pub variety: String,
    #[serde(default)]
    pub emoji: String,
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
}

/// A farmer producer organisation's offer to sell a commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpoOffer {
    pub id: String,
    pub fpo_name: String,
    #[serde(default)]
    pub fpo_logo: String,
    #[serde(default)]
    pub fpo_type: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub pincode: String,
    pub commodity: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    pub variety: String,
    #[serde(default)]
    pub min_order_qty: f64,
    #[serde(default)]
    pub max_order_qty: f64,
    #[serde(default)]
    pub available_from: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub grade: String,
}

impl FpoOffer {
    /// Case-insensitive match on commodity and variety.
    pub fn matches(&self, commodity: &str, variety: &str) -> bool {
        self.commodity.to_lowercase() == commodity.to_lowercase()
            && self.variety.to_lowercase() == variety.to_lowercase()
    }
}
