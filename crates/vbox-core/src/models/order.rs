// Orders, their status history, and recorded payments.

use serde::{Deserialize, Serialize};

/// Which side of the trade the caller is listing orders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderRole {
    #[default]
    Buyer,
    Seller,
}

impl OrderRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

/// Body of `POST /vboxtrade/orders`, usually built from an accepted quotation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub order_number: String,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub quotation_id: Option<i64>,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub buyer_name: String,
    #[serde(default)]
    pub commodity_name: String,
    #[serde(default)]
    pub variety_name: String,
    #[serde(default)]
    pub order_quantity: f64,
    #[serde(default)]
    pub unit_of_measure: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub order_status: String,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<String>,
    #[serde(default)]
    pub outstanding_amount: f64,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    pub history_id: i64,
    pub status_code: String,
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub changed_by: i64,
    #[serde(default)]
    pub changed_at: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayment {
    pub payment_id: i64,
    pub payment_type: String,
    pub payment_amount: f64,
    #[serde(default)]
    pub payment_mode: String,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub transaction_reference: Option<String>,
    #[serde(default)]
    pub payment_gateway: Option<String>,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub created_at: String,
}

/// An order with its full status history and payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub status_history: Vec<OrderStatusHistory>,
    #[serde(default)]
    pub payments: Vec<OrderPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderList {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub total: u64,
}

/// Body of `POST /vboxtrade/orders/{id}/payments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaymentCreate {
    pub payment_type: String,
    pub payment_amount: f64,
    pub payment_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_gateway: Option<String>,
    pub discount_amount: f64,
    pub tax_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_flattens_order_fields() {
        let detail: OrderDetail = serde_json::from_str(
            r#"{
                "order_id": 7,
                "order_number": "ORD-7",
                "order_status": "confirmed",
                "total_amount": 1200.5,
                "status_history": [
                    {"history_id": 1, "status_code": "created", "comments": null}
                ],
                "payments": []
            }"#,
        )
        .unwrap();

        assert_eq!(detail.order.order_id, 7);
        assert_eq!(detail.order.order_status, "confirmed");
        assert_eq!(detail.status_history.len(), 1);
        assert!(detail.payments.is_empty());
    }

    #[test]
    fn role_defaults_to_buyer() {
        assert_eq!(OrderRole::default().as_str(), "buyer");
        assert_eq!(OrderRole::Seller.as_str(), "seller");
    }
}
