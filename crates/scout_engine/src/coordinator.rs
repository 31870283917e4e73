use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use scout_core::{Observation, RequestError, ResultRow, RunId, RunRequest};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::source::{ChannelEventSink, ScrapeSource};
use crate::{JobPosting, ResultBuffer, ScrapeError, ScrapeEvent, ScrapeQuery};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Events the source may queue ahead of the drain loop.
    pub channel_capacity: usize,
    /// How long a stopped source may take to close its loader and report the end.
    pub source_grace: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            source_grace: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("invalid run request: {0}")]
    InvalidRequest(#[from] RequestError),
}

/// Starts scrape runs: one background task per run, one fresh buffer per run.
pub struct ScrapeCoordinator {
    source: Arc<dyn ScrapeSource>,
    runtime: Handle,
    settings: CoordinatorSettings,
    next_run_id: AtomicU64,
    active: Mutex<Option<CancellationToken>>,
}

impl ScrapeCoordinator {
    pub fn new(source: Arc<dyn ScrapeSource>, runtime: Handle, settings: CoordinatorSettings) -> Self {
        Self {
            source,
            runtime,
            settings,
            next_run_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }
    }

    /// Validates the request, spawns the run's task and returns without waiting for it.
    /// A previous run that is still going is cancelled first.
    pub fn start_run(&self, request: RunRequest) -> Result<RunHandle, CoordinatorError> {
        request.validate()?;
        if request.keyword.trim().is_empty() {
            engine_warn!("Starting run with an empty keyword; results will be unfiltered");
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(cancel.clone());
        if let Some(previous) = previous {
            if !previous.is_cancelled() {
                engine_info!("Cancelling previous run before starting run {}", run_id);
                previous.cancel();
            }
        }

        let shared = Arc::new(RunShared::default());
        let query = ScrapeQuery::from_request(&request);
        engine_info!(
            "Starting run {} keyword={:?} location={:?} experience={} target={}",
            run_id,
            request.keyword,
            request.location,
            request.experience_level,
            request.target_count
        );

        self.runtime.spawn(run_task(
            self.source.clone(),
            query,
            request.clone(),
            run_id,
            shared.clone(),
            cancel.clone(),
            self.settings.clone(),
        ));

        Ok(RunHandle {
            run_id,
            request,
            shared,
            cancel,
        })
    }
}

#[derive(Default)]
struct RunShared {
    buffer: ResultBuffer,
    errors: Mutex<Vec<ScrapeError>>,
    finished: AtomicBool,
    cancel_requested: AtomicBool,
}

impl RunShared {
    fn record_error(&self, error: ScrapeError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    fn errors(&self) -> Vec<ScrapeError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The run context shared between the coordinator's task and the reporter.
#[derive(Clone)]
pub struct RunHandle {
    run_id: RunId,
    request: RunRequest,
    shared: Arc<RunShared>,
    cancel: CancellationToken,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn buffer(&self) -> &ResultBuffer {
        &self.shared.buffer
    }

    pub fn errors(&self) -> Vec<ScrapeError> {
        self.shared.errors()
    }

    pub fn error_count(&self) -> usize {
        self.shared
            .errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stops the run's task right away.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Asks the reporter polling this run to cancel it on its next tick.
    pub fn request_cancel(&self) {
        self.shared.cancel_requested.store(true, Ordering::Release);
    }

    pub fn cancel_requested(&self) -> bool {
        self.shared.cancel_requested.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the background task has returned and every row is in the buffer.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// Everything the reporter needs for one tick. `seen` is how many rows it already has.
    pub fn observe(&self, seen: usize, elapsed: Duration) -> Observation {
        // Flags first: a finished task has already pushed all of its rows.
        let source_finished = self.is_finished();
        let cancelled = self.is_cancelled();
        Observation {
            new_rows: self.shared.buffer.rows_since(seen),
            error_count: self.error_count(),
            source_finished,
            cancelled,
            elapsed,
        }
    }
}

async fn run_task(
    source: Arc<dyn ScrapeSource>,
    query: ScrapeQuery,
    request: RunRequest,
    run_id: RunId,
    shared: Arc<RunShared>,
    cancel: CancellationToken,
    settings: CoordinatorSettings,
) {
    let (tx, rx) = mpsc::channel(settings.channel_capacity.max(1));
    // Cancelled by the run token, or by the drain loop once the target is met.
    let source_cancel = cancel.child_token();

    let produce = {
        let source_cancel = source_cancel.clone();
        async move {
            let sink = ChannelEventSink::new(tx);
            let run = source.run(query, &sink, source_cancel.clone());
            tokio::pin!(run);
            tokio::select! {
                () = &mut run => return,
                () = source_cancel.cancelled() => {}
            }
            // Stopped sources still get to release their loader and report the end.
            engine_debug!("Run {} source stopping", run_id);
            if tokio::time::timeout(settings.source_grace, run).await.is_err() {
                engine_warn!(
                    "Run {} source ignored cancellation for {:?}; dropping it",
                    run_id,
                    settings.source_grace
                );
            }
        }
    };
    let drain = drain_events(rx, &request, run_id, &shared, &source_cancel);

    tokio::join!(produce, drain);
    shared.finished.store(true, Ordering::Release);
    engine_info!(
        "Run {} task finished with {} rows and {} errors",
        run_id,
        shared.buffer.len(),
        shared.errors().len()
    );
}

async fn drain_events(
    mut rx: mpsc::Receiver<ScrapeEvent>,
    request: &RunRequest,
    run_id: RunId,
    shared: &RunShared,
    source_cancel: &CancellationToken,
) {
    let target = request.target_count;
    while let Some(event) = rx.recv().await {
        match event {
            ScrapeEvent::Item(posting) => {
                if shared.buffer.len() >= target {
                    engine_debug!("Run {} dropping item past target: {}", run_id, posting.link);
                    continue;
                }
                let len = shared.buffer.push(row_from_posting(request, posting));
                engine_debug!("Run {} item {}/{}", run_id, len, target);
                if len >= target {
                    engine_info!("Run {} reached target of {} rows", run_id, target);
                    source_cancel.cancel();
                }
            }
            ScrapeEvent::Error(error) => {
                engine_warn!("Run {} source error: {}", run_id, error);
                shared.record_error(error);
            }
            ScrapeEvent::End => {
                engine_info!("Run {} source reported end", run_id);
            }
        }
    }
}

/// Keyword and level come from the request, never from the posting.
pub(crate) fn row_from_posting(request: &RunRequest, posting: JobPosting) -> ResultRow {
    ResultRow {
        search_keyword: request.keyword.clone(),
        title: posting.title,
        company: posting.company,
        link: posting.link,
        location: posting.place,
        description: posting.description,
        date: posting.date,
        experience_level: request.experience_level,
    }
}
