//! Browser-driver bootstrap: makes sure a chromedriver binary matching the
//! latest known-good Chrome-for-Testing release is installed locally.
//!
//! Installation is all-or-nothing. The archive is downloaded to a temporary
//! file, checked, unpacked into a temporary staging directory and only then
//! renamed into place; every temporary is removed when it goes out of scope.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::persist::{ensure_output_dir, replace_dir, AtomicFileWriter, PersistError};

pub const DEFAULT_METADATA_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/last-known-good-versions.json";
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://storage.googleapis.com/chrome-for-testing-public";
const MANIFEST_FILE_NAME: &str = "install.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux64,
    MacX64,
    MacArm64,
    Win32,
    Win64,
}

impl Platform {
    /// The build matching the running OS and architecture, if one is published.
    pub fn current() -> Option<Self> {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("linux", "x86_64") => Some(Platform::Linux64),
            ("macos", "x86_64") => Some(Platform::MacX64),
            ("macos", "aarch64") => Some(Platform::MacArm64),
            ("windows", "x86") => Some(Platform::Win32),
            ("windows", "x86_64") => Some(Platform::Win64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux64 => "linux64",
            Platform::MacX64 => "mac-x64",
            Platform::MacArm64 => "mac-arm64",
            Platform::Win32 => "win32",
            Platform::Win64 => "win64",
        }
    }

    fn binary_name(self) -> &'static str {
        match self {
            Platform::Win32 | Platform::Win64 => "chromedriver.exe",
            _ => "chromedriver",
        }
    }

    fn dir_name(self) -> String {
        format!("chromedriver-{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub install_dir: PathBuf,
    pub metadata_url: String,
    pub download_base: String,
    /// Release channel in the version metadata, e.g. `Stable`.
    pub channel: String,
    pub platform: Platform,
    pub request_timeout: Duration,
}

impl DriverSettings {
    /// Defaults for the running platform, installing under `install_dir`.
    pub fn for_current_platform(install_dir: impl Into<PathBuf>) -> Result<Self, ProvisionError> {
        let platform = Platform::current().ok_or_else(|| ProvisionError::UnsupportedPlatform {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        })?;
        Ok(Self {
            install_dir: install_dir.into(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
            channel: "Stable".to_string(),
            platform,
            request_timeout: Duration::from_secs(120),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("no chromedriver build published for {os}/{arch}")]
    UnsupportedPlatform {
        os: &'static str,
        arch: &'static str,
    },
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("{url} returned http status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("version metadata has no {0:?} channel")]
    MissingChannel(String),
    #[error("invalid version metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("driver archive is unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("driver archive does not contain {0}")]
    MissingBinary(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("install directory unusable: {0}")]
    Persist(#[from] PersistError),
    #[error("extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Deserialize)]
struct KnownGoodVersions {
    channels: HashMap<String, ChannelRelease>,
}

#[derive(Debug, Deserialize)]
struct ChannelRelease {
    version: String,
}

/// Written next to the installed binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub version: String,
    pub platform: String,
    pub archive_sha256: String,
    pub source_url: String,
}

pub struct DriverProvisioner {
    settings: DriverSettings,
    client: reqwest::Client,
}

impl DriverProvisioner {
    pub fn new(settings: DriverSettings) -> Result<Self, ProvisionError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ProvisionError::Network {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// `<install_dir>/chromedriver-<platform>/chromedriver[.exe]`
    pub fn driver_path(&self) -> PathBuf {
        self.install_root().join(self.settings.platform.binary_name())
    }

    fn install_root(&self) -> PathBuf {
        self.settings.install_dir.join(self.settings.platform.dir_name())
    }

    fn archive_entry(&self) -> String {
        format!(
            "{}/{}",
            self.settings.platform.dir_name(),
            self.settings.platform.binary_name()
        )
    }

    pub fn archive_url(&self, version: &str) -> String {
        format!(
            "{}/{}/{}/{}.zip",
            self.settings.download_base.trim_end_matches('/'),
            version,
            self.settings.platform.as_str(),
            self.settings.platform.dir_name()
        )
    }

    /// Returns the installed binary, downloading it first if it is missing.
    /// Makes no network calls when the binary is already there.
    pub async fn ensure_driver_present(&self) -> Result<PathBuf, ProvisionError> {
        let target = self.driver_path();
        if target.is_file() {
            engine_debug!("chromedriver already present at {:?}", target);
            return Ok(target);
        }

        let install_dir = self.settings.install_dir.clone();
        ensure_output_dir(&install_dir)?;

        let version = self.latest_version().await?;
        let url = self.archive_url(&version);
        engine_info!("Downloading chromedriver {} from {}", version, url);
        let (archive, sha256) = self.download(&url).await?;

        let staging = tempfile::Builder::new()
            .prefix(".chromedriver-staging")
            .tempdir_in(&install_dir)?;
        let staging_path = staging.path().to_path_buf();
        let entry = self.archive_entry();
        tokio::task::spawn_blocking(move || unpack_verified(archive, &staging_path, &entry))
            .await
            .map_err(|err| ProvisionError::Task(err.to_string()))??;

        let staged_root = staging.path().join(self.settings.platform.dir_name());
        set_executable(&staged_root.join(self.settings.platform.binary_name()))?;
        replace_dir(&staged_root, &self.install_root())?;

        let manifest = InstallManifest {
            version,
            platform: self.settings.platform.as_str().to_string(),
            archive_sha256: sha256,
            source_url: url,
        };
        if let Err(err) = self.write_manifest(&manifest) {
            engine_warn!("chromedriver installed but manifest not written: {}", err);
        }

        engine_info!("chromedriver installed at {:?}", target);
        Ok(target)
    }

    /// The manifest of the current install, if any.
    pub fn installed_manifest(&self) -> Option<InstallManifest> {
        let content = std::fs::read(self.install_root().join(MANIFEST_FILE_NAME)).ok()?;
        serde_json::from_slice(&content).ok()
    }

    async fn latest_version(&self) -> Result<String, ProvisionError> {
        let url = self.settings.metadata_url.clone();
        let response = self.get(&url).await?;
        let body = response.bytes().await.map_err(|err| ProvisionError::Network {
            url: url.clone(),
            message: err.to_string(),
        })?;
        let metadata: KnownGoodVersions = serde_json::from_slice(&body)?;
        metadata
            .channels
            .get(&self.settings.channel)
            .map(|release| release.version.clone())
            .ok_or_else(|| ProvisionError::MissingChannel(self.settings.channel.clone()))
    }

    /// Streams `url` into a temp file in the install dir; returns it rewound with its sha256.
    async fn download(&self, url: &str) -> Result<(NamedTempFile, String), ProvisionError> {
        let response = self.get(url).await?;
        let mut file = tempfile::Builder::new()
            .prefix(".chromedriver-download")
            .suffix(".zip")
            .tempfile_in(&self.settings.install_dir)?;
        let mut hasher = Sha256::new();
        let mut total = 0u64;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk.map_err(|err| ProvisionError::Network {
                url: url.to_string(),
                message: err.to_string(),
            })?;
            hasher.update(&chunk);
            file.write_all(&chunk)?;
            total += chunk.len() as u64;
        }
        file.flush()?;
        file.as_file_mut().seek(SeekFrom::Start(0))?;
        engine_debug!("Downloaded {} bytes from {}", total, url);

        Ok((file, hex(&hasher.finalize())))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProvisionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProvisionError::Network {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn write_manifest(&self, manifest: &InstallManifest) -> Result<(), ProvisionError> {
        let content = serde_json::to_string_pretty(manifest)?;
        AtomicFileWriter::new(self.install_root()).write(MANIFEST_FILE_NAME, content)?;
        Ok(())
    }
}

/// Checks that `entry` is in the archive before extracting anything.
fn unpack_verified(archive: NamedTempFile, staging: &Path, entry: &str) -> Result<(), ProvisionError> {
    let file: File = archive.reopen()?;
    let mut zip = zip::ZipArchive::new(file)?;
    let has_binary = zip
        .by_name(entry)
        .map(|file| file.is_file())
        .unwrap_or(false);
    if !has_binary {
        return Err(ProvisionError::MissingBinary(entry.to_string()));
    }
    zip.extract(staging)?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn hex(digest: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(platform: Platform) -> DriverSettings {
        DriverSettings {
            install_dir: PathBuf::from("drivers"),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            download_base: format!("{DEFAULT_DOWNLOAD_BASE}/"),
            channel: "Stable".to_string(),
            platform,
            request_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn archive_url_follows_release_layout() {
        let provisioner = DriverProvisioner::new(settings(Platform::Linux64)).unwrap();
        assert_eq!(
            provisioner.archive_url("120.0.6099.109"),
            "https://storage.googleapis.com/chrome-for-testing-public/120.0.6099.109/linux64/chromedriver-linux64.zip"
        );
        assert_eq!(
            provisioner.driver_path(),
            PathBuf::from("drivers/chromedriver-linux64/chromedriver")
        );
    }

    #[test]
    fn windows_binary_has_exe_suffix() {
        let provisioner = DriverProvisioner::new(settings(Platform::Win64)).unwrap();
        assert_eq!(provisioner.archive_entry(), "chromedriver-win64/chromedriver.exe");
    }
}
