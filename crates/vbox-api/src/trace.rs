// In-memory diagnostics: one trace per dispatched call, newest first.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::http_client::{HttpError, HttpMethod, HttpResponse};

/// What happened when one host was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome {
    pub url: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub body: Option<String>,
    /// Transport error message when the host never answered.
    pub error: Option<String>,
}

impl HostOutcome {
    pub fn responded(url: impl Into<String>, response: &HttpResponse) -> Self {
        Self {
            url: url.into(),
            status: Some(response.status),
            status_text: Some(response.status_text.clone()),
            body: Some(response.body.clone()),
            error: None,
        }
    }

    pub fn unreachable(url: impl Into<String>, error: &HttpError) -> Self {
        Self {
            url: url.into(),
            status: None,
            status_text: None,
            body: None,
            error: Some(error.message().to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
    }

    /// One-line summary used in aggregated failure messages. Bodies are cut
    /// to `preview_chars` characters.
    pub fn summary(&self, preview_chars: usize) -> String {
        if let Some(error) = &self.error {
            return format!("network error: {error}");
        }

        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no status".to_string());
        let mut line = match self.status_text.as_deref() {
            Some(text) if !text.is_empty() => format!("{status} {text}"),
            _ => status,
        };

        if let Some(body) = self.body.as_deref().filter(|b| !b.is_empty()) {
            line.push_str(" | ");
            line.extend(body.chars().take(preview_chars));
        }
        line
    }
}

/// Record of one dispatched call across every host it reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTrace {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub method: HttpMethod,
    attempts: Vec<HostOutcome>,
    pub succeeded: bool,
}

impl RequestTrace {
    /// Returns `None` when `attempts` is empty: a trace always carries at
    /// least the primary host's outcome.
    pub fn new(
        path: impl Into<String>,
        method: HttpMethod,
        attempts: Vec<HostOutcome>,
        succeeded: bool,
    ) -> Option<Self> {
        if attempts.is_empty() {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            path: path.into(),
            method,
            attempts,
            succeeded,
        })
    }

    pub fn primary(&self) -> &HostOutcome {
        &self.attempts[0]
    }

    /// The second host, if the call got that far.
    pub fn fallback(&self) -> Option<&HostOutcome> {
        self.attempts.get(1)
    }

    /// Every host tried, in order.
    pub fn attempts(&self) -> &[HostOutcome] {
        &self.attempts
    }
}

/// Bounded ring of recent traces. Owned by whoever builds the dispatcher and
/// shared through `Arc`; once full, recording evicts the oldest entry.
#[derive(Debug)]
pub struct TraceBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<RequestTrace>>,
}

impl TraceBuffer {
    /// A `capacity` of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Recording must never fail the request it describes, so a poisoned
    // lock is recovered rather than propagated.
    fn entries(&self) -> MutexGuard<'_, VecDeque<RequestTrace>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, trace: RequestTrace) {
        let mut entries = self.entries();
        entries.push_front(trace);
        entries.truncate(self.capacity);
    }

    /// All traces, newest first.
    pub fn snapshot(&self) -> Vec<RequestTrace> {
        self.entries().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<RequestTrace> {
        self.entries().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
