use chrono::{DateTime, Months, Utc};

/// Half-open fetch window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Partition `[start, end)` into ordered, contiguous windows advancing by
/// one calendar month, the final window clipped to `end`. Empty when
/// `start >= end`. Windows bound how much provider data a single
/// checkpointed unit of work can pull.
pub fn plan_windows(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<SyncWindow> {
    let mut windows = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let next = cursor
            .checked_add_months(Months::new(1))
            .unwrap_or(end)
            .min(end);
        windows.push(SyncWindow {
            start: cursor,
            end: next,
        });
        cursor = next;
    }

    windows
}
