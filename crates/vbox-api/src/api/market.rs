// Public market data. No credential required.

use vbox_core::models::{FpoOffer, MarketChip};

use super::{decode, path, MarketplaceClient};
use crate::dispatcher::RequestOptions;
use crate::error::ApiError;

impl MarketplaceClient {
    pub async fn fetch_ticker(&self, limit: u32) -> Result<Vec<MarketChip>, ApiError> {
        let response = self
            .call(
                &path(&format!("/ticker?limit={limit}")),
                RequestOptions::get(),
                "Failed to fetch ticker data",
            )
            .await?;
        decode(&response, "ticker")
    }

    /// Offers for one commodity and variety. The backend may ignore the
    /// query and return everything, so results are filtered again here.
    pub async fn fetch_offers(
        &self,
        commodity: &str,
        variety: &str,
    ) -> Result<Vec<FpoOffer>, ApiError> {
        let query = format!(
            "?commodity={}&variety={}",
            urlencoding::encode(commodity),
            urlencoding::encode(variety)
        );
        let response = self
            .call(
                &path(&format!("/fpo-offers{query}")),
                RequestOptions::get(),
                "Failed to fetch FPO offers",
            )
            .await?;
        let offers: Vec<FpoOffer> = decode(&response, "FPO offers")?;
        Ok(offers
            .into_iter()
            .filter(|offer| offer.matches(commodity, variety))
            .collect())
    }

    pub async fn fetch_all_offers(&self) -> Result<Vec<FpoOffer>, ApiError> {
        let response = self
            .call(
                &path("/fpo-offers"),
                RequestOptions::get(),
                "Failed to fetch FPO offers",
            )
            .await?;
        decode(&response, "FPO offers")
    }
}
