// Marketplace client: host failover, request traces, and typed operations.

pub mod api;
pub mod dispatcher;
pub mod error;
pub mod http_client;
pub mod trace;

pub use api::{MarketplaceClient, API_PREFIX};
pub use dispatcher::{DispatchError, Dispatcher, RequestOptions, BODY_PREVIEW_CHARS};
pub use error::ApiError;
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use trace::{HostOutcome, RequestTrace, TraceBuffer};
