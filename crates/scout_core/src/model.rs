use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type RunId = u64;

/// Seniority filter offered by the listing site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceLevel {
    #[default]
    EntryLevel,
    Associate,
    MidSenior,
    Director,
    Executive,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 5] = [
        ExperienceLevel::EntryLevel,
        ExperienceLevel::Associate,
        ExperienceLevel::MidSenior,
        ExperienceLevel::Director,
        ExperienceLevel::Executive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::EntryLevel => "ENTRY_LEVEL",
            ExperienceLevel::Associate => "ASSOCIATE",
            ExperienceLevel::MidSenior => "MID_SENIOR",
            ExperienceLevel::Director => "DIRECTOR",
            ExperienceLevel::Executive => "EXECUTIVE",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        ExperienceLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| RequestError::UnknownExperienceLevel(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("target count must be positive")]
    ZeroTargetCount,
    #[error("unknown experience level {0:?} (expected one of ENTRY_LEVEL, ASSOCIATE, MID_SENIOR, DIRECTOR, EXECUTIVE)")]
    UnknownExperienceLevel(String),
}

/// User input captured when a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub keyword: String,
    pub location: String,
    pub experience_level: ExperienceLevel,
    pub target_count: usize,
}

impl RunRequest {
    pub fn new(
        keyword: impl Into<String>,
        location: impl Into<String>,
        experience_level: ExperienceLevel,
        target_count: usize,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            location: location.into(),
            experience_level,
            target_count,
        }
    }

    /// Only the count is checked; form-level bounds are the caller's business.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.target_count == 0 {
            return Err(RequestError::ZeroTargetCount);
        }
        Ok(())
    }
}

/// One scraped job listing, tagged with the run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub search_keyword: String,
    pub title: String,
    pub company: String,
    pub link: String,
    pub location: String,
    pub description: String,
    pub date: String,
    #[serde(rename = "experience")]
    pub experience_level: ExperienceLevel,
}

/// Column names in export order.
pub const RESULT_COLUMNS: [&str; 8] = [
    "search_keyword",
    "title",
    "company",
    "link",
    "location",
    "description",
    "date",
    "experience",
];
