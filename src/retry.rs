use crate::query::TimeWindow;

/// Whether an order that found nothing gets a second run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// One more run against the following calendar day, for day-shaped windows only.
    #[default]
    NextDay,
    Never,
}

impl RetryPolicy {
    /// The window to retry with, or `None` when the order is settled.
    pub fn next_window(&self, window: &TimeWindow, found: bool) -> Option<TimeWindow> {
        match self {
            RetryPolicy::Never => None,
            RetryPolicy::NextDay if found => None,
            RetryPolicy::NextDay => window.next_day(),
        }
    }
}
