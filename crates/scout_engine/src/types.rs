use std::fmt;

/// One job card as delivered by a scrape source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobPosting {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub link: String,
    pub place: String,
    pub description: String,
    pub date: String,
    /// Seniority criterion shown on the posting, if the source found one.
    pub seniority: Option<String>,
}

/// The three callbacks a scrape engine talks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    Item(JobPosting),
    Error(ScrapeError),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeError {
    pub kind: FailureKind,
    pub message: String,
}

impl ScrapeError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ScrapeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Parse,
    Driver,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Parse => write!(f, "unexpected page content"),
            FailureKind::Driver => write!(f, "browser driver error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ScrapeError {
    if err.is_timeout() {
        return ScrapeError::new(FailureKind::Timeout, err.to_string());
    }
    ScrapeError::new(FailureKind::Network, err.to_string())
}
