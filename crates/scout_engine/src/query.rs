use scout_core::{ExperienceLevel, RunRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceFilter {
    Relevant,
    Recent,
}

impl RelevanceFilter {
    pub(crate) fn sort_code(self) -> &'static str {
        match self {
            RelevanceFilter::Relevant => "R",
            RelevanceFilter::Recent => "DD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTypeFilter {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

impl JobTypeFilter {
    pub(crate) fn code(self) -> &'static str {
        match self {
            JobTypeFilter::FullTime => "F",
            JobTypeFilter::PartTime => "P",
            JobTypeFilter::Contract => "C",
            JobTypeFilter::Temporary => "T",
            JobTypeFilter::Internship => "I",
        }
    }
}

pub(crate) fn experience_code(level: ExperienceLevel) -> &'static str {
    match level {
        ExperienceLevel::EntryLevel => "2",
        ExperienceLevel::Associate => "3",
        ExperienceLevel::MidSenior => "4",
        ExperienceLevel::Director => "5",
        ExperienceLevel::Executive => "6",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilters {
    pub relevance: RelevanceFilter,
    pub job_types: Vec<JobTypeFilter>,
    pub experience: Vec<ExperienceLevel>,
}

/// What a scrape source is asked to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeQuery {
    pub keyword: String,
    pub locations: Vec<String>,
    pub filters: QueryFilters,
    /// Stop after this many items.
    pub limit: usize,
    pub page_offset: usize,
    pub skip_promoted: bool,
}

impl ScrapeQuery {
    /// Most recent full-time listings at exactly the requested seniority.
    pub fn from_request(request: &RunRequest) -> Self {
        Self {
            keyword: request.keyword.clone(),
            locations: vec![request.location.clone()],
            filters: QueryFilters {
                relevance: RelevanceFilter::Recent,
                job_types: vec![JobTypeFilter::FullTime],
                experience: vec![request.experience_level],
            },
            limit: request.target_count,
            page_offset: 0,
            skip_promoted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_mirrors_request() {
        let request = RunRequest::new("rust", "Oslo", ExperienceLevel::Director, 12);
        let query = ScrapeQuery::from_request(&request);

        assert_eq!(query.keyword, "rust");
        assert_eq!(query.locations, vec!["Oslo".to_string()]);
        assert_eq!(query.limit, 12);
        assert_eq!(query.filters.relevance, RelevanceFilter::Recent);
        assert_eq!(query.filters.job_types, vec![JobTypeFilter::FullTime]);
        assert_eq!(query.filters.experience, vec![ExperienceLevel::Director]);
        assert!(query.skip_promoted);
    }
}
