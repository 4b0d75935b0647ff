// Registration, OTP login, and the signed-in user's identity.

use serde_json::{json, Map, Value};
use tracing::info;

use vbox_core::models::{AuthUser, RegisterResponse, VerifyOtpResponse};

use super::{decode, json_body, path, MarketplaceClient};
use crate::dispatcher::RequestOptions;
use crate::error::ApiError;
use crate::http_client::HttpMethod;

impl MarketplaceClient {
    /// Start registration. The backend emails a one-time password.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<RegisterResponse, ApiError> {
        let mut fields = Map::new();
        fields.insert("name".into(), json!(name));
        fields.insert("email".into(), json!(email));
        if let Some(phone) = phone {
            fields.insert("phone".into(), json!(phone));
        }

        let body = json_body(&Value::Object(fields))?;
        let options = RequestOptions::new(HttpMethod::Post).with_json_body(body);
        let response = self
            .call_auth(&path("/auth/register"), options, "Registration failed")
            .await?;
        decode(&response, "registration response")
    }

    /// Exchange an emailed OTP for a bearer token. A non-empty token is
    /// persisted immediately, so the next authenticated call picks it up.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<VerifyOtpResponse, ApiError> {
        let body = json_body(&json!({ "email": email, "otp": otp }))?;
        let options = RequestOptions::new(HttpMethod::Post).with_json_body(body);
        let response = self
            .call_auth(&path("/auth/verify-otp"), options, "OTP verification failed")
            .await?;
        let verified: VerifyOtpResponse = decode(&response, "OTP verification response")?;

        if !verified.token.is_empty() {
            self.credentials.set(&verified.token);
            info!(user = %verified.user.id, "signed in");
        }
        Ok(verified)
    }

    pub async fn resend_otp(&self, email: &str) -> Result<RegisterResponse, ApiError> {
        let body = json_body(&json!({ "email": email }))?;
        let options = RequestOptions::new(HttpMethod::Post).with_json_body(body);
        let response = self
            .call_auth(&path("/auth/resend-otp"), options, "Resend OTP failed")
            .await?;
        decode(&response, "resend OTP response")
    }

    /// Forget the stored credential. Purely local; the backend keeps no
    /// session to end.
    pub fn logout(&self) {
        self.credentials.clear();
        info!("signed out");
    }

    pub async fn get_profile(&self) -> Result<AuthUser, ApiError> {
        let options = self.authorized("view your account", HttpMethod::Get)?;
        let response = self
            .call(&path("/auth/profile"), options, "Failed to fetch profile")
            .await?;
        decode(&response, "profile")
    }
}
