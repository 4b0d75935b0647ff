// Orders placed from accepted quotations, with their status and payments.

use serde_json::{json, Map};

use vbox_core::models::{
    Order, OrderCreateRequest, OrderDetail, OrderList, OrderPayment, OrderPaymentCreate, OrderRole,
};

use super::{decode, json_body, path, MarketplaceClient};
use crate::error::ApiError;
use crate::http_client::HttpMethod;

impl MarketplaceClient {
    pub async fn create_order(&self, request: &OrderCreateRequest) -> Result<Order, ApiError> {
        let options = self
            .authorized("create an order", HttpMethod::Post)?
            .with_json_body(json_body(request)?);
        let response = self
            .call(&path("/orders"), options, "Failed to create order")
            .await?;
        decode(&response, "order")
    }

    pub async fn fetch_orders(
        &self,
        role: OrderRole,
        limit: u32,
        offset: u32,
    ) -> Result<OrderList, ApiError> {
        let options = self.authorized("view orders", HttpMethod::Get)?;
        let suffix = format!(
            "/orders?role={}&limit={limit}&offset={offset}",
            role.as_str()
        );
        let response = self
            .call(&path(&suffix), options, "Failed to fetch orders")
            .await?;
        decode(&response, "order list")
    }

    pub async fn fetch_order_detail(&self, order_id: i64) -> Result<OrderDetail, ApiError> {
        let options = self.authorized("view order details", HttpMethod::Get)?;
        let response = self
            .call(&path(&format!("/orders/{order_id}")), options, "Order not found")
            .await?;
        decode(&response, "order detail")
    }

    /// Move an order to the status with id `status_id`.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        status_id: i64,
        comments: Option<&str>,
    ) -> Result<Order, ApiError> {
        let mut fields = Map::new();
        fields.insert("status".into(), json!(status_id));
        if let Some(comments) = comments {
            fields.insert("comments".into(), json!(comments));
        }

        let options = self
            .authorized("update order status", HttpMethod::Patch)?
            .with_json_body(json_body(&fields)?);
        let response = self
            .call(
                &path(&format!("/orders/{order_id}/status")),
                options,
                "Failed to update status",
            )
            .await?;
        decode(&response, "order")
    }

    pub async fn record_order_payment(
        &self,
        order_id: i64,
        payment: &OrderPaymentCreate,
    ) -> Result<OrderPayment, ApiError> {
        let options = self
            .authorized("record payment", HttpMethod::Post)?
            .with_json_body(json_body(payment)?);
        let response = self
            .call(
                &path(&format!("/orders/{order_id}/payments")),
                options,
                "Failed to record payment",
            )
            .await?;
        decode(&response, "order payment")
    }
}

#[cfg(test)]
mod tests {
    use vbox_core::models::{OrderCreateRequest, OrderPaymentCreate, OrderRole};

    use crate::api::test_support::*;
    use crate::http_client::{HttpMethod, HttpResponse};

    const ORDER: &str = r#"{"order_id":7,"order_number":"ORD-7","order_status":"confirmed"}"#;

    #[tokio::test]
    async fn every_order_call_checks_credential_first() {
        let (http, client) = client();

        let payment = OrderPaymentCreate {
            payment_type: "advance".into(),
            payment_amount: 100.0,
            payment_mode: "upi".into(),
            transaction_reference: None,
            payment_gateway: None,
            discount_amount: 0.0,
            tax_amount: 0.0,
        };

        let messages = vec![
            client
                .create_order(&OrderCreateRequest::default())
                .await
                .unwrap_err()
                .to_string(),
            client
                .fetch_orders(OrderRole::Buyer, 50, 0)
                .await
                .unwrap_err()
                .to_string(),
            client.fetch_order_detail(7).await.unwrap_err().to_string(),
            client
                .update_order_status(7, 3, None)
                .await
                .unwrap_err()
                .to_string(),
            client
                .record_order_payment(7, &payment)
                .await
                .unwrap_err()
                .to_string(),
        ];

        assert_eq!(
            messages,
            vec![
                "please log in to create an order",
                "please log in to view orders",
                "please log in to view order details",
                "please log in to update order status",
                "please log in to record payment",
            ]
        );
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn list_uses_role_and_paging() {
        let (http, client) = authed_client();
        http.respond(
            PRIMARY,
            HttpResponse::ok_json(format!(r#"{{"orders":[{ORDER}],"total":1}}"#)),
        );

        let list = client.fetch_orders(OrderRole::Seller, 20, 40).await.unwrap();

        assert_eq!(list.orders[0].order_number, "ORD-7");
        assert_eq!(
            http.requests()[0].url,
            "https://primary.test/vboxtrade/orders?role=seller&limit=20&offset=40"
        );
    }

    #[tokio::test]
    async fn missing_order_reports_not_found() {
        let (http, client) = authed_client();
        http.respond(PRIMARY, HttpResponse::new(404, ""));
        http.respond(FALLBACK, HttpResponse::new(404, "not json"));

        let err = client.fetch_order_detail(99).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Order not found");
    }

    #[tokio::test]
    async fn status_update_patches_status_and_comments() {
        let (http, client) = authed_client();
        http.respond(PRIMARY, HttpResponse::ok_json(ORDER));

        client
            .update_order_status(7, 3, Some("dispatched today"))
            .await
            .unwrap();
        client.update_order_status(7, 4, None).await.unwrap();

        let requests = http.requests();
        assert_eq!(requests[0].method, HttpMethod::Patch);
        assert_eq!(requests[0].url, "https://primary.test/vboxtrade/orders/7/status");
        let with_comments: serde_json::Value =
            serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        let without: serde_json::Value =
            serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            with_comments,
            serde_json::json!({"status": 3, "comments": "dispatched today"})
        );
        assert_eq!(without, serde_json::json!({"status": 4}));
    }

    #[tokio::test]
    async fn payment_is_posted_to_order() {
        let (http, client) = authed_client();
        http.respond(
            PRIMARY,
            HttpResponse::new(
                201,
                r#"{"payment_id":11,"payment_type":"advance","payment_amount":500.0,"payment_status":"pending"}"#,
            ),
        );

        let payment = OrderPaymentCreate {
            payment_type: "advance".into(),
            payment_amount: 500.0,
            payment_mode: "bank_transfer".into(),
            transaction_reference: Some("UTR123".into()),
            payment_gateway: None,
            discount_amount: 0.0,
            tax_amount: 0.0,
        };
        let recorded = client.record_order_payment(7, &payment).await.unwrap();

        assert_eq!(recorded.payment_id, 11);
        assert_eq!(recorded.payment_status, "pending");
        assert_eq!(
            http.requests()[0].url,
            "https://primary.test/vboxtrade/orders/7/payments"
        );
    }
}
