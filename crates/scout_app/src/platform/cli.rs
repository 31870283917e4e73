use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use scout_core::{ExperienceLevel, RunRequest};

use super::config::{LoaderKind, DEFAULT_CONFIG_FILE};

pub const MIN_COUNT: usize = 5;
pub const MAX_COUNT: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "scout", version, about = "Collect job listings into a CSV file")]
pub struct Cli {
    /// Config file; missing means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    #[arg(long, value_name = "LEVEL", value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape listings for a keyword and export them
    Run(RunArgs),
    /// Download the browser driver if needed and print its path
    Driver,
    /// Write a config file with every setting at its default
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(long, short = 'k')]
    pub keyword: String,

    #[arg(long, short = 'l', default_value = "")]
    pub location: String,

    /// ENTRY_LEVEL, ASSOCIATE, MID_SENIOR, DIRECTOR or EXECUTIVE
    #[arg(long, short = 'e', value_name = "LEVEL", default_value = "ENTRY_LEVEL")]
    pub experience: ExperienceLevel,

    /// Number of listings to collect (5-100)
    #[arg(long, short = 'n', default_value_t = 10, value_parser = parse_count)]
    pub count: usize,

    #[arg(long, value_enum)]
    pub loader: Option<LoaderKind>,

    /// Export file; defaults to linkedin_job_offers.csv in the export dir
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub no_export: bool,
}

impl RunArgs {
    pub fn request(&self) -> RunRequest {
        RunRequest::new(
            self.keyword.clone(),
            self.location.clone(),
            self.experience,
            self.count,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn parse_count(value: &str) -> Result<usize, String> {
    let count: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
        return Err(format!("must be between {MIN_COUNT} and {MAX_COUNT}"));
    }
    Ok(count)
}
