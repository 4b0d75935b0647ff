// Quotations: create one against a seller listing, and page through your own.

use vbox_core::models::{Quotation, QuotationList, QuotationRequest};

use super::{decode, json_body, path, MarketplaceClient};
use crate::error::ApiError;
use crate::http_client::HttpMethod;

impl MarketplaceClient {
    pub async fn create_quotation(&self, request: &QuotationRequest) -> Result<Quotation, ApiError> {
        let options = self
            .authorized("create a quotation", HttpMethod::Post)?
            .with_json_body(json_body(request)?);
        let response = self
            .call(&path("/quotations/"), options, "Failed to create quotation")
            .await?;
        decode(&response, "quotation")
    }

    /// One page of the signed-in buyer's quotations.
    pub async fn fetch_quotations(&self, limit: u32, offset: u32) -> Result<QuotationList, ApiError> {
        let options = self.authorized("view quotations", HttpMethod::Get)?;
        let response = self
            .call(
                &path(&format!("/quotations/?limit={limit}&offset={offset}")),
                options,
                "Failed to fetch quotations",
            )
            .await?;
        decode(&response, "quotation list")
    }
}
