use std::collections::HashSet;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::listing::{parse_job_cards, parse_posting_details, JobCard, PostingDetails};
use crate::loader::PageLoader;
use crate::query::experience_code;
use crate::source::{EventSink, ScrapeSource};
use crate::{FailureKind, JobPosting, ScrapeError, ScrapeEvent, ScrapeQuery};

const SEARCH_PATH: &str = "jobs-guest/jobs/api/seeMoreJobPostings/search";
const POSTING_PATH: &str = "jobs-guest/jobs/api/jobPosting/";

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub base_url: String,
    /// Pause between consecutive requests to stay under the site's rate limit.
    pub slow_mo: Duration,
    pub fetch_descriptions: bool,
    /// Hard stop on paging per location, in case the site keeps returning cards.
    pub max_pages: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com/".to_string(),
            slow_mo: Duration::from_secs(2),
            fetch_descriptions: true,
            max_pages: 40,
        }
    }
}

/// Pages through the public job search and emits one item per listing.
pub struct JobSearchSource<L> {
    loader: L,
    settings: SearchSettings,
}

impl<L: PageLoader> JobSearchSource<L> {
    pub fn new(loader: L, settings: SearchSettings) -> Self {
        Self { loader, settings }
    }

    pub fn search_url(
        &self,
        query: &ScrapeQuery,
        location: &str,
        start: usize,
    ) -> Result<Url, ScrapeError> {
        let mut url = self.endpoint(SEARCH_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("keywords", &query.keyword);
            if !location.is_empty() {
                pairs.append_pair("location", location);
            }
            if !query.filters.experience.is_empty() {
                let codes: Vec<_> = query
                    .filters
                    .experience
                    .iter()
                    .map(|level| experience_code(*level))
                    .collect();
                pairs.append_pair("f_E", &codes.join(","));
            }
            if !query.filters.job_types.is_empty() {
                let codes: Vec<_> = query.filters.job_types.iter().map(|t| t.code()).collect();
                pairs.append_pair("f_JT", &codes.join(","));
            }
            pairs.append_pair("sortBy", query.filters.relevance.sort_code());
            pairs.append_pair("start", &start.to_string());
        }
        Ok(url)
    }

    pub fn posting_url(&self, job_id: &str) -> Result<Url, ScrapeError> {
        self.endpoint(&format!("{POSTING_PATH}{job_id}"))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ScrapeError> {
        let mut base = self.settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|base| base.join(path))
            .map_err(|err| ScrapeError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// Sleeps `slow_mo`. Returns `false` if the run was cancelled meanwhile.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.settings.slow_mo.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(self.settings.slow_mo) => true,
        }
    }

    async fn load(&self, url: &Url, cancel: &CancellationToken) -> Result<String, ScrapeError> {
        tokio::select! {
            () = cancel.cancelled() => Err(ScrapeError::new(FailureKind::Cancelled, url.to_string())),
            result = self.loader.load(url) => result,
        }
    }

    async fn collect(&self, query: &ScrapeQuery, sink: &dyn EventSink, cancel: &CancellationToken) {
        let mut emitted = 0;
        let mut requests = 0usize;
        let mut seen = HashSet::new();

        for location in &query.locations {
            let mut start = query.page_offset;
            for page in 0..self.settings.max_pages {
                if emitted >= query.limit || cancel.is_cancelled() {
                    return;
                }
                if requests > 0 && !self.pause(cancel).await {
                    return;
                }
                requests += 1;

                let cards = match self.search_page(query, location, start, cancel).await {
                    Ok(cards) => cards,
                    Err(err) if err.kind == FailureKind::Cancelled => return,
                    Err(err) => {
                        sink.emit(ScrapeEvent::Error(err)).await;
                        break;
                    }
                };
                if cards.is_empty() {
                    engine_info!("No more listings for {:?} after page {}", location, page);
                    break;
                }
                start += cards.len();

                for card in cards {
                    if emitted >= query.limit || cancel.is_cancelled() {
                        return;
                    }
                    if query.skip_promoted && card.promoted {
                        engine_debug!("Skipping promoted listing {}", card.link);
                        continue;
                    }
                    if !card.job_id.is_empty() && !seen.insert(card.job_id.clone()) {
                        continue;
                    }

                    let details = if self.settings.fetch_descriptions {
                        if !self.pause(cancel).await {
                            return;
                        }
                        requests += 1;
                        match self.posting_details(&card, cancel).await {
                            Ok(details) => details,
                            Err(err) if err.kind == FailureKind::Cancelled => return,
                            Err(err) => {
                                sink.emit(ScrapeEvent::Error(err)).await;
                                continue;
                            }
                        }
                    } else {
                        PostingDetails::default()
                    };

                    if !sink.emit(ScrapeEvent::Item(into_posting(card, details))).await {
                        return;
                    }
                    emitted += 1;
                }
            }
        }
    }

    async fn search_page(
        &self,
        query: &ScrapeQuery,
        location: &str,
        start: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobCard>, ScrapeError> {
        let url = self.search_url(query, location, start)?;
        engine_debug!("Loading search page {}", url);
        let html = self.load(&url, cancel).await?;
        Ok(parse_job_cards(&html))
    }

    async fn posting_details(
        &self,
        card: &JobCard,
        cancel: &CancellationToken,
    ) -> Result<PostingDetails, ScrapeError> {
        if card.job_id.is_empty() {
            return Err(ScrapeError::new(
                FailureKind::Parse,
                format!("no job id for {}", card.link),
            ));
        }
        let url = self.posting_url(&card.job_id)?;
        let html = self.load(&url, cancel).await?;
        Ok(parse_posting_details(&html))
    }
}

fn into_posting(card: JobCard, details: PostingDetails) -> JobPosting {
    JobPosting {
        job_id: card.job_id,
        title: card.title,
        company: card.company,
        link: card.link,
        place: card.place,
        description: details.description,
        date: card.date,
        seniority: details.seniority,
    }
}

#[async_trait::async_trait]
impl<L: PageLoader> ScrapeSource for JobSearchSource<L> {
    async fn run(&self, query: ScrapeQuery, sink: &dyn EventSink, cancel: CancellationToken) {
        match self.loader.open().await {
            Ok(()) => self.collect(&query, sink, &cancel).await,
            Err(err) => {
                sink.emit(ScrapeEvent::Error(err)).await;
            }
        }
        self.loader.close().await;
        sink.emit(ScrapeEvent::End).await;
    }
}
