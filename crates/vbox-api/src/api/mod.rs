// Typed marketplace operations on top of the failover dispatcher.
//
// Each submodule adds an `impl MarketplaceClient` block for one area of the
// backend. Everything here shares the same pre-flight credential check and
// the same mapping from dispatch failures to `ApiError`.

mod auth;
mod market;
mod orders;
mod payment_terms;
mod profile;
mod quotations;

pub use payment_terms::{normalize_payment_term, normalize_payment_terms};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use vbox_core::config::ApiConfig;
use vbox_core::{Config, CredentialStore};

use crate::dispatcher::{DispatchError, Dispatcher, RequestOptions};
use crate::error::ApiError;
use crate::http_client::{HttpClient, HttpMethod, HttpResponse, ReqwestHttpClient};
use crate::trace::TraceBuffer;

/// Path prefix shared by every marketplace endpoint.
pub const API_PREFIX: &str = "/vboxtrade";

/// Client for the marketplace backend.
///
/// Data calls go through the primary/fallback dispatcher. Authentication
/// calls go to the auth host alone. Both record into the same trace buffer.
pub struct MarketplaceClient {
    dispatcher: Dispatcher,
    auth: Dispatcher,
    credentials: CredentialStore,
}

impl MarketplaceClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api: &ApiConfig,
        traces: Arc<TraceBuffer>,
        credentials: CredentialStore,
    ) -> Self {
        let dispatcher = Dispatcher::with_fallback(
            http.clone(),
            api.primary_url.clone(),
            api.fallback_url.clone(),
            traces.clone(),
        );
        let auth = Dispatcher::new(http, vec![api.auth_url.clone()], traces);
        Self {
            dispatcher,
            auth,
            credentials,
        }
    }

    /// Production client over reqwest, with a trace buffer sized from the
    /// diagnostics config.
    pub fn from_config(config: &Config, credentials: CredentialStore) -> Self {
        let traces = Arc::new(TraceBuffer::new(config.diagnostics.trace_capacity));
        Self::new(
            Arc::new(ReqwestHttpClient::new()),
            &config.api,
            traces,
            credentials,
        )
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn traces(&self) -> &Arc<TraceBuffer> {
        self.dispatcher.traces()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    /// Stored token, or `NotAuthenticated` before anything touches the
    /// network.
    fn bearer(&self, action: &'static str) -> Result<String, ApiError> {
        self.credentials
            .get()
            .ok_or(ApiError::NotAuthenticated { action })
    }

    /// Request options carrying the bearer token, checked up front.
    fn authorized(
        &self,
        action: &'static str,
        method: HttpMethod,
    ) -> Result<RequestOptions, ApiError> {
        let token = self.bearer(action)?;
        Ok(RequestOptions::new(method).with_bearer(&token))
    }

    async fn call(
        &self,
        path: &str,
        options: RequestOptions,
        generic: &'static str,
    ) -> Result<HttpResponse, ApiError> {
        self.dispatcher
            .dispatch(path, options)
            .await
            .map_err(|e| reject(e, generic))
    }

    async fn call_auth(
        &self,
        path: &str,
        options: RequestOptions,
        generic: &'static str,
    ) -> Result<HttpResponse, ApiError> {
        self.auth
            .dispatch(path, options)
            .await
            .map_err(|e| reject(e, generic))
    }
}

/// Map a dispatch failure to the error callers see. When the last host
/// answered, the backend's `detail` (or `generic`) becomes the message;
/// the full per-host breakdown stays reachable as the error source.
fn reject(error: DispatchError, generic: &'static str) -> ApiError {
    match error.final_status() {
        Some(status) => {
            let message = error
                .final_body()
                .and_then(error_detail)
                .unwrap_or_else(|| generic.to_string());
            debug!(status, %message, "request rejected");
            ApiError::Rejected {
                status,
                message,
                source: error,
            }
        }
        None => ApiError::Dispatch(error),
    }
}

/// The `detail` string from an error payload such as `{"detail": "..."}`.
/// Anything else, including unparseable bodies, yields `None`.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse, context: &'static str) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|source| ApiError::Decode { context, source })
}

fn json_body<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(ApiError::Encode)
}

fn path(suffix: &str) -> String {
    format!("{API_PREFIX}{suffix}")
}
