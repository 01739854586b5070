use crate::model::VisitEvent;
use std::cmp::Reverse;

/// Default number of most-recent events the dashboard aggregates.
pub const DEFAULT_WINDOW_SIZE: usize = 200;

/// The bounded, most-recent-N slice of the visit log that every dashboard
/// statistic is derived from.
///
/// Totals computed over a window describe "the last N events", not all
/// history. Events are held newest first; events without a timestamp sort
/// after every timestamped event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationWindow {
    events: Vec<VisitEvent>,
    cap: usize,
}

impl AggregationWindow {
    /// Order `events` by timestamp descending and keep at most `cap` of them.
    ///
    /// The sort is stable, so events with equal timestamps keep the order the
    /// store returned them in.
    pub fn new(mut events: Vec<VisitEvent>, cap: usize) -> Self {
        // `None < Some`, so reversing puts untimed events at the end.
        events.sort_by_key(|e| Reverse(e.timestamp));
        events.truncate(cap);
        Self { events, cap }
    }

    pub fn events(&self) -> &[VisitEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of events this window holds.
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// `true` when the window is full, meaning older events were likely cut off.
    pub fn is_saturated(&self) -> bool {
        self.events.len() >= self.cap
    }
}
