use crate::{ExperienceLevel, ResultRow, RunId, RunStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct RunViewModel {
    pub run_id: RunId,
    pub status: RunStatus,
    pub keyword: String,
    pub experience_level: ExperienceLevel,
    /// Collected / target, in `[0, 1]`.
    pub progress: f32,
    pub collected: usize,
    pub target: usize,
    pub rows: Vec<ResultRow>,
    pub error_count: usize,
    pub export_ready: bool,
}

impl RunViewModel {
    pub fn status_line(&self) -> String {
        match self.status {
            RunStatus::Running => "Web scraper is running...".to_string(),
            RunStatus::Complete => "Web scraping complete".to_string(),
            RunStatus::Exhausted => format!(
                "Source ran out of listings: {} of {} collected",
                self.collected, self.target
            ),
            RunStatus::TimedOut => format!(
                "Timed out waiting for listings: {} of {} collected",
                self.collected, self.target
            ),
            RunStatus::Cancelled => format!(
                "Run cancelled: {} of {} collected",
                self.collected, self.target
            ),
        }
    }
}
