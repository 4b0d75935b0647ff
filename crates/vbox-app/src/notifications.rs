// Quotation status change detection.
//
// Pure functions only: the poller owns I/O and hands the previous snapshot
// and the freshly fetched page in here.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use vbox_core::models::{Quotation, QuotationStatus};

/// Last observed status per quotation number.
pub type StatusSnapshot = BTreeMap<String, QuotationStatus>;

/// A quotation whose status differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub quotation_number: String,
    pub previous: QuotationStatus,
    pub status: QuotationStatus,
}

impl StatusChange {
    /// e.g. `✅ Quote Q-17`
    pub fn title(&self) -> String {
        format!("{} Quote {}", self.status.emoji(), self.quotation_number)
    }

    pub fn description(&self) -> String {
        format!("Status changed to \"{}\"", self.status.label())
    }

    /// Where the quotation can be viewed.
    pub fn link(&self) -> String {
        format!("/quote/{}", self.quotation_number)
    }

    pub fn label(&self) -> &str {
        self.status.label()
    }
}

impl fmt::Display for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.title(), self.description(), self.link())
    }
}

/// Compare a freshly fetched page against the previous snapshot.
///
/// Returns the snapshot to persist next, built only from `current` (numbers
/// absent from the page are dropped), and one change per quotation whose
/// number was already known under a different status. Quotations seen for
/// the first time never produce a change.
pub fn diff_statuses(
    previous: &StatusSnapshot,
    current: &[Quotation],
) -> (StatusSnapshot, Vec<StatusChange>) {
    let mut next = StatusSnapshot::new();
    let mut changes = Vec::new();

    for quotation in current {
        next.insert(quotation.quotation_number.clone(), quotation.status.clone());

        match previous.get(&quotation.quotation_number) {
            Some(before) if *before != quotation.status => changes.push(StatusChange {
                quotation_number: quotation.quotation_number.clone(),
                previous: before.clone(),
                status: quotation.status.clone(),
            }),
            _ => {}
        }
    }

    (next, changes)
}

/// Read a persisted snapshot. Anything other than a JSON object reads as
/// empty, and entries whose status is not a string are skipped.
pub fn snapshot_from_value(value: &Value) -> StatusSnapshot {
    let Value::Object(map) = value else {
        debug!("stored status snapshot is not an object, starting fresh");
        return StatusSnapshot::new();
    };

    map.iter()
        .filter_map(|(number, status)| {
            match serde_json::from_value::<QuotationStatus>(status.clone()) {
                Ok(status) => Some((number.clone(), status)),
                Err(_) => {
                    debug!(%number, %status, "skipping malformed stored status");
                    None
                }
            }
        })
        .collect()
}

pub fn snapshot_to_value(snapshot: &StatusSnapshot) -> Value {
    let map: Map<String, Value> = snapshot
        .iter()
        .map(|(number, status)| (number.clone(), Value::String(status.as_str().to_string())))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote(number: &str, status: QuotationStatus) -> Quotation {
        serde_json::from_value(json!({
            "quotation_number": number,
            "status": status.as_str(),
        }))
        .unwrap()
    }

    fn snapshot(entries: &[(&str, QuotationStatus)]) -> StatusSnapshot {
        entries
            .iter()
            .map(|(n, s)| (n.to_string(), s.clone()))
            .collect()
    }

    #[test]
    fn first_observation_emits_nothing() {
        let current = vec![
            quote("Q-1", QuotationStatus::Pending),
            quote("Q-2", QuotationStatus::Accepted),
        ];

        let (next, changes) = diff_statuses(&StatusSnapshot::new(), &current);

        assert!(changes.is_empty());
        assert_eq!(
            next,
            snapshot(&[
                ("Q-1", QuotationStatus::Pending),
                ("Q-2", QuotationStatus::Accepted)
            ])
        );
    }

    #[test]
    fn only_changed_known_quotations_emit() {
        let previous = snapshot(&[
            ("Q-1", QuotationStatus::Pending),
            ("Q-2", QuotationStatus::Negotiating),
        ]);
        let current = vec![
            quote("Q-1", QuotationStatus::Accepted),
            quote("Q-2", QuotationStatus::Negotiating),
            quote("Q-3", QuotationStatus::Pending),
        ];

        let (_, changes) = diff_statuses(&previous, &current);

        assert_eq!(
            changes,
            vec![StatusChange {
                quotation_number: "Q-1".into(),
                previous: QuotationStatus::Pending,
                status: QuotationStatus::Accepted,
            }]
        );
    }

    #[test]
    fn missing_quotations_are_dropped_from_next_snapshot() {
        let previous = snapshot(&[
            ("Q-1", QuotationStatus::Pending),
            ("Q-9", QuotationStatus::Expired),
        ]);
        let current = vec![quote("Q-1", QuotationStatus::Pending)];

        let (next, changes) = diff_statuses(&previous, &current);

        assert!(changes.is_empty());
        assert_eq!(next, snapshot(&[("Q-1", QuotationStatus::Pending)]));
    }

    #[test]
    fn identical_page_is_idempotent() {
        let current = vec![quote("Q-1", QuotationStatus::Rejected)];
        let (first, _) = diff_statuses(&StatusSnapshot::new(), &current);
        let (second, changes) = diff_statuses(&first, &current);

        assert!(changes.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_statuses_are_diffed_like_known_ones() {
        let previous = snapshot(&[("Q-1", QuotationStatus::Negotiating)]);
        let current = vec![
            quote("Q-1", QuotationStatus::Other("on_hold".into())),
            quote("Q-2", QuotationStatus::Other("cancelled".into())),
        ];

        let (next, changes) = diff_statuses(&previous, &current);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].title(), "📋 Quote Q-1");
        assert_eq!(changes[0].description(), "Status changed to \"on_hold\"");
        assert_eq!(next["Q-2"], QuotationStatus::Other("cancelled".into()));
    }

    #[test]
    fn change_presentation() {
        let change = StatusChange {
            quotation_number: "Q-17".into(),
            previous: QuotationStatus::Accepted,
            status: QuotationStatus::ConvertedToOrder,
        };

        assert_eq!(change.title(), "📦 Quote Q-17");
        assert_eq!(change.description(), "Status changed to \"Converted to Order\"");
        assert_eq!(change.link(), "/quote/Q-17");
        assert_eq!(change.label(), "Converted to Order");
    }

    #[test]
    fn snapshot_value_round_trip_and_tolerance() {
        let snap = snapshot(&[
            ("Q-1", QuotationStatus::ConvertedToOrder),
            ("Q-2", QuotationStatus::Pending),
        ]);
        let value = snapshot_to_value(&snap);
        assert_eq!(
            value,
            json!({"Q-1": "converted_to_order", "Q-2": "pending"})
        );
        assert_eq!(snapshot_from_value(&value), snap);

        let mixed = json!({"Q-1": "accepted", "Q-2": "archived", "Q-3": 4});
        assert_eq!(
            snapshot_from_value(&mixed),
            snapshot(&[
                ("Q-1", QuotationStatus::Accepted),
                ("Q-2", QuotationStatus::Other("archived".into()))
            ])
        );
        assert!(snapshot_from_value(&json!(["Q-1"])).is_empty());
    }
}
