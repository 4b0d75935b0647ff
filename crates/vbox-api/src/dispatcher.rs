// Ordered host failover: try each base URL in turn, stop at the first 2xx.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::http_client::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::trace::{HostOutcome, RequestTrace, TraceBuffer};

/// Longest response-body excerpt embedded in an aggregated failure message.
pub const BODY_PREVIEW_CHARS: usize = 400;

// ---------------------------------------------------------------------------
// Request options
// ---------------------------------------------------------------------------

/// Method, headers and body for a dispatched call. The URL is supplied by
/// the dispatcher per host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("authorization", format!("Bearer {token}"))
    }

    /// Attach an already-serialized JSON body.
    pub fn with_json_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self.with_header("content-type", "application/json")
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("no backend hosts configured for {path}")]
    NoHosts { path: String },

    #[error("{}", describe_failure(.path, .attempts))]
    AllHostsFailed {
        path: String,
        attempts: Vec<HostOutcome>,
    },
}

impl DispatchError {
    /// Every host tried, primary first.
    pub fn attempts(&self) -> &[HostOutcome] {
        match self {
            Self::NoHosts { .. } => &[],
            Self::AllHostsFailed { attempts, .. } => attempts,
        }
    }

    /// HTTP status from the last host tried, if it answered at all.
    pub fn final_status(&self) -> Option<u16> {
        self.attempts().last().and_then(|a| a.status)
    }

    /// Response body from the last host tried, if it answered at all.
    pub fn final_body(&self) -> Option<&str> {
        self.attempts().last().and_then(|a| a.body.as_deref())
    }
}

fn host_label(index: usize) -> String {
    match index {
        0 => "primary".to_string(),
        1 => "fallback".to_string(),
        n => format!("host {}", n + 1),
    }
}

fn describe_failure(path: &str, attempts: &[HostOutcome]) -> String {
    let mut message = format!("request failed for {path}");
    for (index, attempt) in attempts.iter().enumerate() {
        message.push_str(&format!(
            "\n{}: {} -> {}",
            host_label(index),
            attempt.url,
            attempt.summary(BODY_PREVIEW_CHARS)
        ));
    }
    message
}

/// Collapse any run of leading slashes to exactly one.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends each call to an ordered list of base URLs, strictly one after the
/// other. The first 2xx wins; a transport error or non-2xx moves on to the
/// next host. Each host is tried once per call and no delay or timeout is
/// imposed between attempts.
pub struct Dispatcher {
    http: Arc<dyn HttpClient>,
    hosts: Vec<String>,
    traces: Arc<TraceBuffer>,
}

impl Dispatcher {
    pub fn new(http: Arc<dyn HttpClient>, hosts: Vec<String>, traces: Arc<TraceBuffer>) -> Self {
        let hosts = hosts
            .into_iter()
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .collect();
        Self {
            http,
            hosts,
            traces,
        }
    }

    /// The usual two-host arrangement.
    pub fn with_fallback(
        http: Arc<dyn HttpClient>,
        primary: impl Into<String>,
        fallback: impl Into<String>,
        traces: Arc<TraceBuffer>,
    ) -> Self {
        Self::new(http, vec![primary.into(), fallback.into()], traces)
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn traces(&self) -> &Arc<TraceBuffer> {
        &self.traces
    }

    /// Dispatch `path` to each host in order until one answers 2xx.
    ///
    /// Every call, successful or not, leaves one [`RequestTrace`] in the
    /// trace buffer. When every host fails the error message names the path
    /// and each host's outcome.
    pub async fn dispatch(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, DispatchError> {
        let path = normalize_path(path);
        if self.hosts.is_empty() {
            return Err(DispatchError::NoHosts { path });
        }

        let mut attempts = Vec::with_capacity(self.hosts.len());

        for (index, host) in self.hosts.iter().enumerate() {
            let url = format!("{host}{path}");
            if index > 0 {
                warn!(%path, %url, "failing over to {} host", host_label(index));
            }
            debug!(method = %options.method, %url, "dispatching request");

            let request = HttpRequest {
                method: options.method,
                url: url.clone(),
                headers: options.headers.clone(),
                body: options.body.clone(),
            };

            match self.http.execute(request).await {
                Ok(response) => {
                    attempts.push(HostOutcome::responded(url, &response));
                    if response.is_success() {
                        self.record(&path, options.method, attempts, true);
                        return Ok(response);
                    }
                    debug!(status = response.status, "host answered with non-success status");
                }
                Err(error) => {
                    debug!(%url, "host unreachable: {error}");
                    attempts.push(HostOutcome::unreachable(url, &error));
                }
            }
        }

        self.record(&path, options.method, attempts.clone(), false);
        let error = DispatchError::AllHostsFailed { path, attempts };
        warn!("{error}");
        Err(error)
    }

    fn record(&self, path: &str, method: HttpMethod, attempts: Vec<HostOutcome>, succeeded: bool) {
        if let Some(trace) = RequestTrace::new(path, method, attempts, succeeded) {
            self.traces.record(trace);
        }
    }
}
