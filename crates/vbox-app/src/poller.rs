// Background quotation status poller.
//
// Every cycle fetches the first page of quotations, diffs it against the
// persisted snapshot, and pushes one `StatusChange` per transition onto the
// events channel. Cycles never overlap: a tick that lands while a cycle is
// still in flight is dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use vbox_api::MarketplaceClient;
use vbox_core::config::PollerConfig;
use vbox_core::db::{Database, QUOTE_STATUS_KEY};

use crate::notifications::{
    diff_statuses, snapshot_from_value, snapshot_to_value, StatusChange, StatusSnapshot,
};

/// What a single call to [`QuotePoller::check_for_updates`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No stored credential; nothing was fetched.
    NotAuthenticated,
    /// Another cycle was still in flight.
    AlreadyPolling,
    /// The page was fetched and diffed; `changes` notifications were emitted.
    Completed { changes: usize },
    /// The fetch failed. The error was logged and the snapshot left as is.
    Failed,
}

/// Clears the in-flight flag however the cycle ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct QuotePoller {
    client: Arc<MarketplaceClient>,
    db: Arc<Database>,
    events: mpsc::Sender<StatusChange>,
    interval: Duration,
    page_size: u32,
    polling: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl QuotePoller {
    pub fn new(
        client: Arc<MarketplaceClient>,
        db: Arc<Database>,
        events: mpsc::Sender<StatusChange>,
        config: &PollerConfig,
    ) -> Self {
        Self {
            client,
            db,
            events,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            page_size: config.page_size,
            polling: AtomicBool::new(false),
            timer: Mutex::new(None),
        }
    }

    /// Whether a cycle is in flight right now.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run one poll cycle. Never fails: every error ends the cycle quietly
    /// with [`CycleOutcome::Failed`].
    pub async fn check_for_updates(&self) -> CycleOutcome {
        if !self.client.credentials().is_authenticated() {
            debug!("no credential, skipping quote status poll");
            return CycleOutcome::NotAuthenticated;
        }

        if self
            .polling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("previous quote status poll still running, skipping");
            return CycleOutcome::AlreadyPolling;
        }
        let _in_flight = InFlight(&self.polling);

        let page = match self.client.fetch_quotations(self.page_size, 0).await {
            Ok(page) => page,
            Err(e) => {
                warn!("quote status poll failed: {e}");
                return CycleOutcome::Failed;
            }
        };

        let previous = self.load_snapshot();
        let (next, changes) = diff_statuses(&previous, &page.quotations);
        self.save_snapshot(&next);

        for change in &changes {
            info!(
                quotation = %change.quotation_number,
                from = %change.previous,
                to = %change.status,
                "quotation status changed"
            );
            match self.events.try_send(change.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(quotation = %change.quotation_number, "notification channel full, dropping");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("notification receiver gone");
                }
            }
        }

        debug!(
            tracked = next.len(),
            changes = changes.len(),
            "quote status poll complete"
        );
        CycleOutcome::Completed {
            changes: changes.len(),
        }
    }

    /// Start polling: one cycle now, then one per interval. Arming an armed
    /// poller does nothing.
    ///
    /// The first cycle is spawned before the timer exists, so it runs even
    /// if the poller is disarmed right away. Each later tick also spawns its
    /// cycle as a separate task, so [`disarm`] stops future ticks without
    /// cancelling a cycle already running. The timer holds only a weak
    /// reference and ends once the poller is dropped.
    ///
    /// [`disarm`]: QuotePoller::disarm
    pub fn arm(self: &Arc<Self>) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.interval;
        let start = Instant::now() + period;
        info!(interval_secs = period.as_secs(), "quote status poller armed");

        let first = Arc::clone(self);
        tokio::spawn(async move {
            first.check_for_updates().await;
        });

        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(poller) = weak.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    poller.check_for_updates().await;
                });
            }
        }));
    }

    /// Stop future ticks. A cycle already in flight runs to completion.
    pub fn disarm(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("quote status poller disarmed");
        }
    }

    fn load_snapshot(&self) -> StatusSnapshot {
        match self.db.load_state(QUOTE_STATUS_KEY) {
            Ok(Some(value)) => snapshot_from_value(&value),
            Ok(None) => StatusSnapshot::new(),
            Err(e) => {
                warn!("failed to read quote status snapshot: {e:#}");
                StatusSnapshot::new()
            }
        }
    }

    fn save_snapshot(&self, snapshot: &StatusSnapshot) {
        if let Err(e) = self.db.save_state(QUOTE_STATUS_KEY, &snapshot_to_value(snapshot)) {
            warn!("failed to persist quote status snapshot: {e:#}");
        }
    }
}

impl Drop for QuotePoller {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}
