//! Just enough of the W3C WebDriver protocol to load pages through a
//! chromedriver-controlled headless Chrome.

use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use url::Url;

use crate::loader::PageLoader;
use crate::types::map_reqwest_error;
use crate::{FailureKind, ScrapeError};

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub page_load_timeout: Duration,
    /// Extra Chrome command-line switches.
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout: Duration::from_secs(40),
            args: Vec::new(),
        }
    }
}

impl BrowserSettings {
    fn capabilities(&self) -> serde_json::Value {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.args.iter().cloned());
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    ready: bool,
}

/// HTTP client for one WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base: Url,
}

impl WebDriverClient {
    pub fn new(base: Url, request_timeout: Duration) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ScrapeError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn is_ready(&self) -> Result<bool, ScrapeError> {
        let status: Status = self.send(self.http.get(self.url("status")?)).await?;
        Ok(status.ready)
    }

    pub async fn new_session(&self, settings: &BrowserSettings) -> Result<WebDriverSession, ScrapeError> {
        let request = self
            .http
            .post(self.url("session")?)
            .json(&settings.capabilities());
        let session: NewSession = self.send(request).await?;
        engine_info!("Opened WebDriver session {}", session.session_id);

        let session = WebDriverSession {
            client: self.clone(),
            id: session.session_id,
        };
        session
            .set_page_load_timeout(settings.page_load_timeout)
            .await?;
        Ok(session)
    }

    fn url(&self, path: &str) -> Result<Url, ScrapeError> {
        self.base
            .join(path)
            .map_err(|err| ScrapeError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ScrapeError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<Envelope<WireError>>(&body) {
                Ok(Envelope { value }) => format!("{}: {}", value.error, value.message),
                Err(_) => format!("http status {status}"),
            };
            return Err(ScrapeError::new(FailureKind::Driver, message));
        }

        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.value)
            .map_err(|err| ScrapeError::new(FailureKind::Driver, format!("bad response: {err}")))
    }
}

#[derive(Debug)]
pub struct WebDriverSession {
    client: WebDriverClient,
    id: String,
}

impl WebDriverSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn set_page_load_timeout(&self, timeout: Duration) -> Result<(), ScrapeError> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let request = self
            .client
            .http
            .post(self.url("timeouts")?)
            .json(&json!({ "pageLoad": millis }));
        self.client.send::<serde_json::Value>(request).await.map(drop)
    }

    pub async fn navigate(&self, target: &Url) -> Result<(), ScrapeError> {
        let request = self
            .client
            .http
            .post(self.url("url")?)
            .json(&json!({ "url": target.as_str() }));
        self.client.send::<serde_json::Value>(request).await.map(drop)
    }

    pub async fn page_source(&self) -> Result<String, ScrapeError> {
        let request = self.client.http.get(self.url("source")?);
        self.client.send(request).await
    }

    pub async fn delete(self) -> Result<(), ScrapeError> {
        let url = self
            .client
            .url(&format!("session/{}", self.id))?;
        self.client
            .send::<serde_json::Value>(self.client.http.delete(url))
            .await
            .map(drop)
    }

    fn url(&self, command: &str) -> Result<Url, ScrapeError> {
        self.client.url(&format!("session/{}/{}", self.id, command))
    }
}

/// A chromedriver child process listening on a free local port.
pub struct ChromeDriverService {
    _child: Child,
    client: WebDriverClient,
}

impl ChromeDriverService {
    /// Spawns `driver_path` and waits until its `/status` reports ready.
    pub async fn start(driver_path: &Path, startup_timeout: Duration) -> Result<Self, ScrapeError> {
        let port = free_port()?;
        let child = Command::new(driver_path)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                ScrapeError::new(
                    FailureKind::Driver,
                    format!("failed to start {}: {err}", driver_path.display()),
                )
            })?;

        let base = Url::parse(&format!("http://127.0.0.1:{port}/"))
            .map_err(|err| ScrapeError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = WebDriverClient::new(base, Duration::from_secs(60))?;

        let deadline = Instant::now() + startup_timeout;
        loop {
            match client.is_ready().await {
                Ok(true) => break,
                Ok(false) => engine_debug!("chromedriver on port {} not ready yet", port),
                Err(err) => engine_debug!("chromedriver on port {} not reachable: {}", port, err),
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::new(
                    FailureKind::Timeout,
                    format!("chromedriver did not become ready within {startup_timeout:?}"),
                ));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        engine_info!("chromedriver ready on port {}", port);

        Ok(Self {
            _child: child,
            client,
        })
    }

    pub fn client(&self) -> &WebDriverClient {
        &self.client
    }
}

fn free_port() -> Result<u16, ScrapeError> {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .map_err(|err| ScrapeError::new(FailureKind::Driver, format!("no free port: {err}")))
}

/// Loads pages in a browser session opened per run.
pub struct WebDriverPageLoader {
    client: WebDriverClient,
    settings: BrowserSettings,
    session: Mutex<Option<WebDriverSession>>,
    // Keeps the driver process alive.
    _service: Option<ChromeDriverService>,
}

impl WebDriverPageLoader {
    /// Uses an already running WebDriver server.
    pub fn new(client: WebDriverClient, settings: BrowserSettings) -> Self {
        Self {
            client,
            settings,
            session: Mutex::new(None),
            _service: None,
        }
    }

    /// Owns `service`; the driver process lives as long as the loader.
    pub fn with_service(service: ChromeDriverService, settings: BrowserSettings) -> Self {
        Self {
            client: service.client().clone(),
            settings,
            session: Mutex::new(None),
            _service: Some(service),
        }
    }
}

#[async_trait::async_trait]
impl PageLoader for WebDriverPageLoader {
    async fn open(&self) -> Result<(), ScrapeError> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.client.new_session(&self.settings).await?);
        }
        Ok(())
    }

    async fn load(&self, url: &Url) -> Result<String, ScrapeError> {
        let session = self.session.lock().await;
        let Some(session) = session.as_ref() else {
            return Err(ScrapeError::new(FailureKind::Driver, "no browser session"));
        };
        session.navigate(url).await?;
        session.page_source().await
    }

    async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            let id = session.id().to_string();
            if let Err(err) = session.delete().await {
                engine_warn!("Failed to close WebDriver session {}: {}", id, err);
            }
        }
    }
}
