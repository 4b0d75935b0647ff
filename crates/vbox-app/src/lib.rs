// Background quotation watcher: status diffing and the poll loop.

pub mod notifications;
pub mod poller;

pub use notifications::{diff_statuses, StatusChange, StatusSnapshot};
pub use poller::{CycleOutcome, QuotePoller};
