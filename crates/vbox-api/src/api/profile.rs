// Buyer profile: personal and business details, KYC, and delivery addresses.

use serde::Deserialize;
use tracing::debug;

use vbox_core::models::{
    Address, AddressDraft, AddressUpdate, BusinessProfile, FullProfile, KycDetails,
    PersonalProfile,
};

use super::{decode, json_body, path, MarketplaceClient};
use crate::error::ApiError;
use crate::http_client::HttpMethod;

/// The address list arrives either bare or wrapped in `{"addresses": [..]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AddressPayload {
    List(Vec<Address>),
    Wrapped {
        #[serde(default)]
        addresses: Vec<Address>,
    },
}

impl MarketplaceClient {
    /// Everything on the profile page. A buyer with no saved profile (404)
    /// gets an empty one rather than an error.
    pub async fn fetch_full_profile(&self) -> Result<FullProfile, ApiError> {
        let options = self.authorized("view profile", HttpMethod::Get)?;
        match self
            .call(&path("/buyer/profile"), options, "Failed to fetch profile")
            .await
        {
            Ok(response) => decode(&response, "profile"),
            Err(e) if e.is_not_found() => {
                debug!("no profile saved yet");
                Ok(FullProfile::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_personal_profile(
        &self,
        profile: &PersonalProfile,
    ) -> Result<PersonalProfile, ApiError> {
        let options = self
            .authorized("update profile", HttpMethod::Put)?
            .with_json_body(json_body(profile)?);
        let response = self
            .call(
                &path("/buyer/profile/personal"),
                options,
                "Failed to update personal profile",
            )
            .await?;
        decode(&response, "personal profile")
    }

    pub async fn update_business_profile(
        &self,
        profile: &BusinessProfile,
    ) -> Result<BusinessProfile, ApiError> {
        let options = self
            .authorized("update profile", HttpMethod::Put)?
            .with_json_body(json_body(profile)?);
        let response = self
            .call(
                &path("/buyer/profile/business"),
                options,
                "Failed to update business profile",
            )
            .await?;
        decode(&response, "business profile")
    }

    pub async fn update_kyc(&self, kyc: &KycDetails) -> Result<KycDetails, ApiError> {
        let options = self
            .authorized("update KYC", HttpMethod::Put)?
            .with_json_body(json_body(kyc)?);
        let response = self
            .call(
                &path("/buyer/profile/kyc"),
                options,
                "Failed to update KYC details",
            )
            .await?;
        decode(&response, "KYC details")
    }

    /// Saved addresses. 404 means none yet.
    pub async fn fetch_addresses(&self) -> Result<Vec<Address>, ApiError> {
        let options = self.authorized("view addresses", HttpMethod::Get)?;
        let response = match self
            .call(&path("/buyer/addresses"), options, "Failed to fetch addresses")
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let payload: AddressPayload = decode(&response, "address list")?;
        Ok(match payload {
            AddressPayload::List(addresses) => addresses,
            AddressPayload::Wrapped { addresses } => addresses,
        })
    }

    pub async fn create_address(&self, draft: &AddressDraft) -> Result<Address, ApiError> {
        let options = self
            .authorized("add address", HttpMethod::Post)?
            .with_json_body(json_body(draft)?);
        let response = self
            .call(&path("/buyer/addresses"), options, "Failed to add address")
            .await?;
        decode(&response, "address")
    }

    /// Partial update; only the fields set in `update` are sent.
    pub async fn update_address(
        &self,
        address_id: i64,
        update: &AddressUpdate,
    ) -> Result<Address, ApiError> {
        let options = self
            .authorized("update address", HttpMethod::Patch)?
            .with_json_body(json_body(update)?);
        let response = self
            .call(
                &path(&format!("/buyer/addresses/{address_id}")),
                options,
                "Failed to update address",
            )
            .await?;
        decode(&response, "address")
    }

    pub async fn delete_address(&self, address_id: i64) -> Result<(), ApiError> {
        let options = self.authorized("delete address", HttpMethod::Delete)?;
        self.call(
            &path(&format!("/buyer/addresses/{address_id}")),
            options,
            "Failed to delete address",
        )
        .await?;
        Ok(())
    }
}
