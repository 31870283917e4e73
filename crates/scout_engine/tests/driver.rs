use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scout_engine::{DriverProvisioner, DriverSettings, Platform, ProvisionError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

const VERSION: &str = "125.0.6422.141";
const ARCHIVE_PATH: &str = "/dl/125.0.6422.141/linux64/chromedriver-linux64.zip";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn metadata() -> serde_json::Value {
    serde_json::json!({
        "timestamp": "2024-06-10T22:09:12.310Z",
        "channels": {
            "Stable": { "channel": "Stable", "version": VERSION, "revision": "1287751" },
            "Beta": { "channel": "Beta", "version": "126.0.6478.55", "revision": "1300313" }
        }
    })
}

fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn settings(server: &MockServer, install_dir: &Path) -> DriverSettings {
    DriverSettings {
        install_dir: install_dir.to_path_buf(),
        metadata_url: format!("{}/metadata.json", server.uri()),
        download_base: format!("{}/dl", server.uri()),
        channel: "Stable".to_string(),
        platform: Platform::Linux64,
        request_timeout: Duration::from_secs(5),
    }
}

async fn mount_metadata(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/metadata.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata()))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_archive(server: &MockServer, body: Vec<u8>, expected: u64) {
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/zip"))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_once_then_reuses_installed_binary() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 1).await;
    mount_archive(
        &server,
        archive(&[
            ("chromedriver-linux64/chromedriver", b"#!/bin/sh\n"),
            ("chromedriver-linux64/LICENSE.chromedriver", b"license"),
        ]),
        1,
    )
    .await;

    let temp = TempDir::new().unwrap();
    let provisioner = DriverProvisioner::new(settings(&server, temp.path())).unwrap();

    let first = provisioner.ensure_driver_present().await.unwrap();
    let second = provisioner.ensure_driver_present().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        temp.path().join("chromedriver-linux64").join("chromedriver")
    );
    assert_eq!(fs::read(&first).unwrap(), b"#!/bin/sh\n");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&first).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

#[tokio::test]
async fn existing_binary_means_no_network_calls() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 0).await;

    let temp = TempDir::new().unwrap();
    let installed = temp.path().join("chromedriver-linux64");
    fs::create_dir_all(&installed).unwrap();
    fs::write(installed.join("chromedriver"), "present").unwrap();

    let provisioner = DriverProvisioner::new(settings(&server, temp.path())).unwrap();
    let path = provisioner.ensure_driver_present().await.unwrap();

    assert_eq!(fs::read_to_string(path).unwrap(), "present");
}

#[tokio::test]
async fn manifest_records_version_and_digest() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 1).await;
    mount_archive(
        &server,
        archive(&[("chromedriver-linux64/chromedriver", b"bin")]),
        1,
    )
    .await;

    let temp = TempDir::new().unwrap();
    let provisioner = DriverProvisioner::new(settings(&server, temp.path())).unwrap();
    assert!(provisioner.installed_manifest().is_none());

    provisioner.ensure_driver_present().await.unwrap();

    let manifest = provisioner.installed_manifest().unwrap();
    assert_eq!(manifest.version, VERSION);
    assert_eq!(manifest.platform, "linux64");
    assert_eq!(manifest.archive_sha256.len(), 64);
    assert!(manifest.source_url.ends_with(ARCHIVE_PATH));
}

#[tokio::test]
async fn archive_without_binary_leaves_nothing_behind() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 1).await;
    mount_archive(
        &server,
        archive(&[("chromedriver-linux64/README", b"nothing to see")]),
        1,
    )
    .await;

    let temp = TempDir::new().unwrap();
    let provisioner = DriverProvisioner::new(settings(&server, temp.path())).unwrap();

    let err = provisioner.ensure_driver_present().await.unwrap_err();

    assert!(matches!(err, ProvisionError::MissingBinary(_)), "{err}");
    assert!(!provisioner.driver_path().exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn corrupt_archive_is_rejected() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 1).await;
    mount_archive(&server, b"definitely not a zip".to_vec(), 1).await;

    let temp = TempDir::new().unwrap();
    let provisioner = DriverProvisioner::new(settings(&server, temp.path())).unwrap();

    let err = provisioner.ensure_driver_present().await.unwrap_err();

    assert!(matches!(err, ProvisionError::Archive(_)), "{err}");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_download_is_an_http_error() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let provisioner = DriverProvisioner::new(settings(&server, temp.path())).unwrap();

    let err = provisioner.ensure_driver_present().await.unwrap_err();

    assert!(matches!(err, ProvisionError::HttpStatus { status: 404, .. }), "{err}");
    assert!(!provisioner.driver_path().exists());
}

#[tokio::test]
async fn unknown_channel_is_reported() {
    init_logging();
    let server = MockServer::start().await;
    mount_metadata(&server, 1).await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings(&server, temp.path());
    settings.channel = "Canary".to_string();
    let provisioner = DriverProvisioner::new(settings).unwrap();

    let err = provisioner.ensure_driver_present().await.unwrap_err();

    assert!(matches!(err, ProvisionError::MissingChannel(ref name) if name == "Canary"));
}
