use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use engine_logging::engine_info;
use scout_engine::{
    BrowserSettings, CoordinatorSettings, DriverSettings, LoaderSettings, ReporterSettings,
    SearchSettings,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "scout.ron";

/// How pages are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Plain HTTP requests against the guest endpoints.
    #[default]
    Http,
    /// A headless Chrome driven through chromedriver.
    Browser,
}

/// Settings read from `scout.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tick_ms: u64,
    /// `None` waits for the source indefinitely.
    pub max_wait_secs: Option<u64>,
    pub channel_capacity: usize,
    pub slow_mo_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    pub driver_startup_secs: u64,
    pub fetch_descriptions: bool,
    pub headless: bool,
    pub loader: LoaderKind,
    pub base_url: String,
    pub driver_dir: PathBuf,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let reporter = ReporterSettings::default();
        let search = SearchSettings::default();
        let loader = LoaderSettings::default();
        Self {
            tick_ms: duration_ms(reporter.tick),
            max_wait_secs: reporter.max_wait.map(|wait| wait.as_secs()),
            channel_capacity: CoordinatorSettings::default().channel_capacity,
            slow_mo_ms: duration_ms(search.slow_mo),
            connect_timeout_secs: loader.connect_timeout.as_secs(),
            request_timeout_secs: loader.request_timeout.as_secs(),
            page_load_timeout_secs: BrowserSettings::default().page_load_timeout.as_secs(),
            driver_startup_secs: 30,
            fetch_descriptions: search.fetch_descriptions,
            headless: true,
            loader: LoaderKind::default(),
            base_url: search.base_url,
            driver_dir: PathBuf::from("drivers"),
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("scout.log"),
        }
    }
}

impl AppConfig {
    pub fn reporter_settings(&self) -> ReporterSettings {
        ReporterSettings {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            max_wait: self.max_wait_secs.map(Duration::from_secs),
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            channel_capacity: self.channel_capacity,
            ..CoordinatorSettings::default()
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            base_url: self.base_url.clone(),
            slow_mo: Duration::from_millis(self.slow_mo_ms),
            fetch_descriptions: self.fetch_descriptions,
            ..SearchSettings::default()
        }
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..LoaderSettings::default()
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            headless: self.headless,
            page_load_timeout: Duration::from_secs(self.page_load_timeout_secs),
            ..BrowserSettings::default()
        }
    }

    pub fn driver_settings(&self) -> anyhow::Result<DriverSettings> {
        let mut settings = DriverSettings::for_current_platform(self.driver_dir.clone())?;
        settings.request_timeout = Duration::from_secs(self.request_timeout_secs.max(60));
        Ok(settings)
    }

    pub fn driver_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.driver_startup_secs)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Reads the config at `path`. A missing file yields the defaults; a file
/// that exists but cannot be read or parsed is an error.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()));
        }
    };

    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Pretty RON for a config, e.g. to seed a new `scout.ron`.
pub fn render_config(config: &AppConfig) -> anyhow::Result<String> {
    let pretty = ron::ser::PrettyConfig::new();
    ron::ser::to_string_pretty(config, pretty).context("failed to serialize config")
}
