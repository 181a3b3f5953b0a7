//! Per-order event timeline.
//!
//! Every order embeds a JSON journal keyed by status name, recording when
//! the order reached each state and the human-readable description shown on
//! the tracking page. Entries are appended or overwritten per key, never
//! removed: re-cancelling an order does not erase the record of when it was
//! processing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// A single timeline entry: when a status was reached and what the customer
/// is told about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// When the order entered this status.
    pub date: DateTime<Utc>,
    /// Human-readable description shown in the tracking UI.
    pub description: String,
}

/// The order's status journal, keyed by [`OrderStatus`].
///
/// Partial population is expected: a freshly placed order carries only a
/// `processing` entry. Serialized as a plain JSON object
/// (`{"processing": {"date": ..., "description": ...}, ...}`), which is the
/// exact shape persisted in the `events` JSONB column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderTimeline(BTreeMap<OrderStatus, OrderEvent>);

impl OrderTimeline {
    /// An empty timeline.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a timeline seeded with a single entry.
    #[must_use]
    pub fn seeded(status: OrderStatus, date: DateTime<Utc>, description: impl Into<String>) -> Self {
        let mut timeline = Self::new();
        timeline.record(status, date, description);
        timeline
    }

    /// Set or overwrite the entry for `status`.
    ///
    /// All other keys are preserved untouched; re-recording an existing key
    /// refreshes its timestamp and description.
    pub fn record(
        &mut self,
        status: OrderStatus,
        date: DateTime<Utc>,
        description: impl Into<String>,
    ) {
        self.0.insert(
            status,
            OrderEvent {
                date,
                description: description.into(),
            },
        );
    }

    /// Get the entry for `status`, if the order ever reached it.
    #[must_use]
    pub fn get(&self, status: OrderStatus) -> Option<&OrderEvent> {
        self.0.get(&status)
    }

    /// Whether the timeline has an entry for `status`.
    #[must_use]
    pub fn contains(&self, status: OrderStatus) -> bool {
        self.0.contains_key(&status)
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no entry has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in status order.
    pub fn iter(&self) -> impl Iterator<Item = (OrderStatus, &OrderEvent)> {
        self.0.iter().map(|(status, event)| (*status, event))
    }
}

impl<'a> IntoIterator for &'a OrderTimeline {
    type Item = (&'a OrderStatus, &'a OrderEvent);
    type IntoIter = std::collections::btree_map::Iter<'a, OrderStatus, OrderEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).single().expect("valid timestamp")
    }

    #[test]
    fn test_record_preserves_other_keys() {
        let mut timeline = OrderTimeline::seeded(OrderStatus::Processing, at(9), "placed");
        timeline.record(OrderStatus::Cancelled, at(11), "changed my mind");

        assert_eq!(timeline.len(), 2);
        assert_eq!(
            timeline.get(OrderStatus::Processing).map(|e| e.date),
            Some(at(9))
        );
        assert_eq!(
            timeline.get(OrderStatus::Cancelled).map(|e| e.description.as_str()),
            Some("changed my mind")
        );
    }

    #[test]
    fn test_record_same_key_refreshes_entry() {
        let mut timeline = OrderTimeline::seeded(OrderStatus::Processing, at(9), "placed");
        timeline.record(OrderStatus::Processing, at(15), "back in processing");

        assert_eq!(timeline.len(), 1);
        let event = timeline.get(OrderStatus::Processing).expect("entry exists");
        assert_eq!(event.date, at(15));
        assert_eq!(event.description, "back in processing");
    }

    #[test]
    fn test_json_shape_is_status_keyed_object() {
        let timeline = OrderTimeline::seeded(OrderStatus::OnHold, at(10), "address check");
        let json = serde_json::to_value(&timeline).expect("serialize");

        let entry = json
            .get("on_hold")
            .expect("keyed by snake_case status name");
        assert_eq!(entry["description"], "address check");
        assert!(entry["date"].is_string(), "date must be an ISO-8601 string");
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut timeline = OrderTimeline::seeded(OrderStatus::Processing, at(9), "placed");
        timeline.record(OrderStatus::Shipped, at(18), "shipped to Lahore");

        let json = serde_json::to_string(&timeline).expect("serialize");
        let back: OrderTimeline = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, timeline);
    }
}
