use std::time::Duration;

use crate::ResultRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Reporter looked at the run's buffer.
    Observed(Observation),
    /// User asked to abort the run.
    CancelRequested,
}

/// Snapshot of a run taken by the reporter at one poll tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Observation {
    /// Rows appended since the previous observation, in buffer order.
    pub new_rows: Vec<ResultRow>,
    pub error_count: usize,
    /// The background task has returned; no more rows will arrive.
    pub source_finished: bool,
    pub cancelled: bool,
    pub elapsed: Duration,
}
