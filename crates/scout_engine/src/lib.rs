//! Scout engine: runs scrapes in the background, reports progress, exports results
//! and provisions the browser driver.
mod buffer;
mod coordinator;
mod driver;
mod export;
mod listing;
mod loader;
mod persist;
mod query;
mod reporter;
mod search;
mod source;
mod types;
mod webdriver;

pub use buffer::ResultBuffer;
pub use coordinator::{CoordinatorError, CoordinatorSettings, RunHandle, ScrapeCoordinator};
pub use driver::{
    DriverProvisioner, DriverSettings, InstallManifest, Platform, ProvisionError,
    DEFAULT_DOWNLOAD_BASE, DEFAULT_METADATA_URL,
};
pub use export::{decode_csv, encode_csv, write_csv, ExportError, DEFAULT_EXPORT_FILE_NAME};
pub use listing::{parse_job_cards, parse_posting_details, JobCard, PostingDetails};
pub use loader::{HttpPageLoader, LoaderSettings, PageLoader};
pub use persist::{ensure_output_dir, replace_dir, AtomicFileWriter, PersistError};
pub use query::{JobTypeFilter, QueryFilters, RelevanceFilter, ScrapeQuery};
pub use reporter::{
    poll_until_complete, NullRenderer, ProgressRenderer, ReporterSettings, RunFailure, RunReport,
};
pub use search::{JobSearchSource, SearchSettings};
pub use source::{ChannelEventSink, EventSink, ScrapeSource};
pub use types::{FailureKind, JobPosting, ScrapeError, ScrapeEvent};
pub use webdriver::{
    BrowserSettings, ChromeDriverService, WebDriverClient, WebDriverPageLoader, WebDriverSession,
};
