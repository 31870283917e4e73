use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn};
use log::LevelFilter;
use scout_engine::{
    poll_until_complete, write_csv, AtomicFileWriter, ChromeDriverService, DriverProvisioner,
    HttpPageLoader, JobSearchSource, RunReport, ScrapeCoordinator, ScrapeSource,
    WebDriverPageLoader, DEFAULT_EXPORT_FILE_NAME,
};
use tokio::runtime::Runtime;

use super::cli::{Cli, Command, RunArgs};
use super::config::{load_config, render_config, AppConfig, LoaderKind};
use super::logging::{self, LogDestination};
use super::ui::constants::TABLE_WIDTH;
use super::ui::layout::format_table;
use super::ui::render::TerminalRenderer;

pub fn run_app() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let level = cli.log_level.map_or(LevelFilter::Info, LevelFilter::from);
    // Init must work even when the existing file no longer parses.
    if let Command::Init { force } = cli.command {
        logging::initialize(LogDestination::Both, level, &AppConfig::default().log_file);
        write_default_config(&cli.config, force)?;
        return Ok(ExitCode::SUCCESS);
    }
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Run(args) => {
            logging::initialize(LogDestination::File, level, &config.log_file);
            run_scrape(&args, &config)
        }
        Command::Driver => {
            logging::initialize(LogDestination::Both, level, &config.log_file);
            let runtime = build_runtime()?;
            let path = provision_driver(&runtime, &config)?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn provision_driver(runtime: &Runtime, config: &AppConfig) -> anyhow::Result<PathBuf> {
    let provisioner = DriverProvisioner::new(config.driver_settings()?)?;
    runtime
        .block_on(provisioner.ensure_driver_present())
        .context("failed to provision chromedriver")
}

fn build_source(
    runtime: &Runtime,
    config: &AppConfig,
    loader: LoaderKind,
) -> anyhow::Result<Arc<dyn ScrapeSource>> {
    let search = config.search_settings();
    match loader {
        LoaderKind::Http => {
            let loader = HttpPageLoader::new(config.loader_settings())
                .context("failed to build http client")?;
            Ok(Arc::new(JobSearchSource::new(loader, search)))
        }
        LoaderKind::Browser => {
            let driver = provision_driver(runtime, config)?;
            let service = runtime
                .block_on(ChromeDriverService::start(
                    &driver,
                    config.driver_startup_timeout(),
                ))
                .context("failed to start chromedriver")?;
            let loader = WebDriverPageLoader::with_service(service, config.browser_settings());
            Ok(Arc::new(JobSearchSource::new(loader, search)))
        }
    }
}

fn run_scrape(args: &RunArgs, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let runtime = build_runtime()?;
    let loader = args.loader.unwrap_or(config.loader);
    let source = build_source(&runtime, config, loader)?;

    let coordinator = ScrapeCoordinator::new(
        source,
        runtime.handle().clone(),
        config.coordinator_settings(),
    );
    let run = coordinator
        .start_run(args.request())
        .context("run not started")?;

    let on_interrupt = run.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("Interrupted; cancelling run {}", on_interrupt.run_id());
            on_interrupt.request_cancel();
        }
    });

    let mut renderer = TerminalRenderer::new(args.count);
    renderer.println(format!(
        "Searching {:?} in {:?} at {} for {} listings ({:?} loader)",
        args.keyword,
        args.location,
        args.experience,
        args.count,
        loader
    ));
    let outcome = poll_until_complete(&run, &config.reporter_settings(), &mut renderer);

    let (report, failure) = match outcome {
        Ok(report) => (report, None),
        Err(failure) => {
            let message = failure.to_string();
            (failure.into_report(), Some(message))
        }
    };
    print_summary(&report);

    if !args.no_export && !report.rows.is_empty() {
        let (dir, file_name) = export_target(args.output.as_deref(), &config.export_dir);
        let path = write_csv(&dir, &file_name, &report.rows)
            .with_context(|| format!("failed to export to {}", dir.join(&file_name).display()))?;
        println!("Saved {} rows to {}", report.rows.len(), path.display());
    }

    match failure {
        None => {
            engine_info!("Run {} complete", run.run_id());
            Ok(ExitCode::SUCCESS)
        }
        Some(message) => {
            eprintln!("Run did not complete: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(report: &RunReport) {
    if !report.rows.is_empty() {
        println!("{}", format_table(&report.rows, TABLE_WIDTH));
    }
    if !report.errors.is_empty() {
        eprintln!("{} listings could not be read:", report.errors.len());
        for error in &report.errors {
            eprintln!("  - {error}");
        }
    }
    println!(
        "Collected {} of {} listings in {:.1}s",
        report.rows.len(),
        report.target_count,
        report.elapsed.as_secs_f64()
    );
}

/// Splits `--output` into directory and file name; falls back to the export dir.
fn export_target(output: Option<&Path>, export_dir: &Path) -> (PathBuf, String) {
    let Some(output) = output else {
        return (export_dir.to_path_buf(), DEFAULT_EXPORT_FILE_NAME.to_string());
    };
    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXPORT_FILE_NAME.to_string());
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => export_dir.to_path_buf(),
    };
    (dir, file_name)
}

fn write_default_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let content = render_config(&AppConfig::default())?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("config path has no file name")?;
    let written = AtomicFileWriter::new(dir).write(&file_name, content)?;
    engine_info!("Wrote default config to {:?}", written);
    println!("{}", written.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn export_target_defaults_to_export_dir() {
        let (dir, name) = export_target(None, Path::new("out"));
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(name, "linkedin_job_offers.csv");
    }

    #[test]
    fn bare_output_name_lands_in_export_dir() {
        let (dir, name) = export_target(Some(Path::new("rust.csv")), Path::new("out"));
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(name, "rust.csv");
    }

    #[test]
    fn output_with_directory_wins() {
        let (dir, name) = export_target(Some(Path::new("/tmp/jobs/rust.csv")), Path::new("out"));
        assert_eq!(dir, PathBuf::from("/tmp/jobs"));
        assert_eq!(name, "rust.csv");
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("scout.ron");

        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
