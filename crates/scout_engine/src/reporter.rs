use std::thread;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_info, engine_warn};
use scout_core::{update, Effect, Msg, ResultRow, RunLimits, RunState, RunStatus, RunViewModel};

use crate::{RunHandle, ScrapeError};

#[derive(Debug, Clone)]
pub struct ReporterSettings {
    pub tick: Duration,
    /// Give up (and cancel the source) after this long. `None` waits indefinitely.
    pub max_wait: Option<Duration>,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            max_wait: Some(Duration::from_secs(15 * 60)),
        }
    }
}

/// Frontends implement this to show a run while it progresses.
pub trait ProgressRenderer {
    fn render(&mut self, view: &RunViewModel);

    /// Called once when the full target has been collected.
    fn export_ready(&mut self, _view: &RunViewModel) {}
}

/// A renderer that draws nothing.
pub struct NullRenderer;

impl ProgressRenderer for NullRenderer {
    fn render(&mut self, _view: &RunViewModel) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub rows: Vec<ResultRow>,
    pub target_count: usize,
    /// Non-fatal source errors seen during the run.
    pub errors: Vec<ScrapeError>,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum RunFailure {
    #[error("timed out after {:?} with {} of {} rows", .report.elapsed, .report.rows.len(), .report.target_count)]
    TimedOut { report: RunReport },
    #[error("source finished with {} of {} rows", .report.rows.len(), .report.target_count)]
    Exhausted { report: RunReport },
    #[error("run cancelled with {} of {} rows", .report.rows.len(), .report.target_count)]
    Cancelled { report: RunReport },
}

impl RunFailure {
    /// Whatever was collected before the run stopped.
    pub fn report(&self) -> &RunReport {
        match self {
            RunFailure::TimedOut { report }
            | RunFailure::Exhausted { report }
            | RunFailure::Cancelled { report } => report,
        }
    }

    pub fn into_report(self) -> RunReport {
        match self {
            RunFailure::TimedOut { report }
            | RunFailure::Exhausted { report }
            | RunFailure::Cancelled { report } => report,
        }
    }
}

/// Polls `run` every `settings.tick` on the calling thread until it completes,
/// the source gives out, the run is cancelled, or `max_wait` passes.
pub fn poll_until_complete(
    run: &RunHandle,
    settings: &ReporterSettings,
    renderer: &mut dyn ProgressRenderer,
) -> Result<RunReport, RunFailure> {
    let started = Instant::now();
    let limits = RunLimits {
        max_wait: settings.max_wait,
    };
    let mut state = RunState::new(run.run_id(), run.request().clone(), limits);
    let mut tick: u64 = 0;

    loop {
        engine_logging::set_poll_tick(tick);
        let observation = run.observe(state.collected(), started.elapsed());
        let (next, mut effects) = update(state, Msg::Observed(observation));
        state = next;
        // Rows observed this tick are kept before the cancel lands.
        if run.cancel_requested() {
            let (next, more) = update(state, Msg::CancelRequested);
            state = next;
            effects.extend(more);
        }

        let mut export_ready = false;
        for effect in effects {
            match effect {
                Effect::CancelSource => {
                    engine_warn!("Run {} cancelling source", run.run_id());
                    run.cancel();
                }
                Effect::ExportReady => export_ready = true,
            }
        }

        if state.consume_dirty() {
            let view = state.view();
            engine_debug!("Run {}: {}/{} rows", run.run_id(), view.collected, view.target);
            renderer.render(&view);
            if export_ready {
                renderer.export_ready(&view);
            }
        }

        if state.status().is_terminal() {
            break;
        }
        thread::sleep(settings.tick);
        tick += 1;
    }

    engine_logging::clear_poll_tick();
    let report = RunReport {
        rows: state.rows().to_vec(),
        target_count: state.target(),
        errors: run.errors(),
        elapsed: state.elapsed(),
    };
    engine_info!(
        "Run {} ended {:?} after {} ticks: {} rows, {} errors",
        run.run_id(),
        state.status(),
        tick,
        report.rows.len(),
        report.errors.len()
    );

    match state.status() {
        RunStatus::Complete => Ok(report),
        RunStatus::TimedOut => Err(RunFailure::TimedOut { report }),
        RunStatus::Exhausted => Err(RunFailure::Exhausted { report }),
        RunStatus::Cancelled => Err(RunFailure::Cancelled { report }),
        // The loop above only exits on a terminal status.
        RunStatus::Running => Err(RunFailure::Cancelled { report }),
    }
}
