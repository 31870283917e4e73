use std::time::Duration;

use crate::view_model::RunViewModel;
use crate::{ResultRow, RunId, RunRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Running,
    Complete,
    /// The source finished before the target count was reached.
    Exhausted,
    TimedOut,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunLimits {
    /// `None` waits for as long as the source keeps running.
    pub max_wait: Option<Duration>,
}

/// Reporter-side view of one run. Only ever reads what the coordinator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    run_id: RunId,
    request: RunRequest,
    limits: RunLimits,
    status: RunStatus,
    rows: Vec<ResultRow>,
    error_count: usize,
    elapsed: Duration,
    observed_once: bool,
    dirty: bool,
}

impl RunState {
    pub fn new(run_id: RunId, request: RunRequest, limits: RunLimits) -> Self {
        Self {
            run_id,
            request,
            limits,
            status: RunStatus::Running,
            rows: Vec::new(),
            error_count: 0,
            elapsed: Duration::ZERO,
            observed_once: false,
            dirty: false,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn collected(&self) -> usize {
        self.rows.len()
    }

    pub fn target(&self) -> usize {
        self.request.target_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fraction of the target collected, clamped to `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.target() == 0 {
            return 1.0;
        }
        (self.collected() as f32 / self.target() as f32).min(1.0)
    }

    pub fn view(&self) -> RunViewModel {
        RunViewModel {
            run_id: self.run_id,
            status: self.status,
            keyword: self.request.keyword.clone(),
            experience_level: self.request.experience_level,
            progress: self.progress(),
            collected: self.collected(),
            target: self.target(),
            rows: self.rows.clone(),
            error_count: self.error_count,
            export_ready: self.status == RunStatus::Complete,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        if self.status != status {
            self.status = status;
            self.mark_dirty();
        }
    }

    /// Appends rows up to the target; anything beyond it is dropped.
    pub(crate) fn append_rows(&mut self, rows: Vec<ResultRow>) -> usize {
        let room = self.target().saturating_sub(self.rows.len());
        let before = self.rows.len();
        self.rows.extend(rows.into_iter().take(room));
        let added = self.rows.len() - before;
        if added > 0 {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn set_error_count(&mut self, error_count: usize) {
        if self.error_count != error_count {
            self.error_count = error_count;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// The first observation always renders so the caller sees the empty table.
    pub(crate) fn mark_observed(&mut self) {
        if !self.observed_once {
            self.observed_once = true;
            self.mark_dirty();
        }
    }
}
