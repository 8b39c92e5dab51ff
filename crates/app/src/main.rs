use std::env;
use std::fmt;
use std::sync::Arc;

use services::config::API_TOKEN_ENV;
use services::{ApiConfig, Clock, DraftService, HttpCourseworkApi, QuizService};
use storage::repository::Storage;
use tracing_subscriber::{EnvFilter, fmt as log_fmt};
use tutor_core::model::AssignmentId;

mod runner;

const DB_URL_ENV: &str = "TUTOR_DB_URL";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingAssignment,
    UnknownArg(String),
    InvalidAssignment { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingAssignment => write!(f, "--assignment is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAssignment { raw } => write!(f, "invalid --assignment value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take    --assignment <id> [--api <url>] [--token <token>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- discard --assignment <id> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://drafts.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_API_URL, TUTOR_API_TOKEN, TUTOR_API_TIMEOUT_SECS, TUTOR_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Discard,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "discard" => Some(Self::Discard),
            _ => None,
        }
    }
}

struct Args {
    assignment: AssignmentId,
    api_url: Option<String>,
    token: Option<String>,
    db_url: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut assignment = None;
        let mut api_url = None;
        let mut token = None;
        let mut db_url = env::var(DB_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| "sqlite://drafts.sqlite3".into(), normalize_sqlite_url);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--assignment" => {
                    let value = require_value(args, "--assignment")?;
                    let id = AssignmentId::new(value.as_str())
                        .map_err(|_| ArgsError::InvalidAssignment { raw: value.clone() })?;
                    assignment = Some(id);
                }
                "--api" => api_url = Some(require_value(args, "--api")?),
                "--token" => token = Some(require_value(args, "--token")?),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            assignment: assignment.ok_or(ArgsError::MissingAssignment)?,
            api_url,
            token,
            db_url,
        })
    }

    fn api_config(&self) -> Result<ApiConfig, services::ConfigError> {
        match &self.api_url {
            Some(url) => {
                let token = self.token.clone().or_else(|| env::var(API_TOKEN_ENV).ok());
                ApiConfig::new(url, token)
            }
            None => {
                let mut config = ApiConfig::from_env()?;
                if let Some(token) = self.token.clone().filter(|t| !t.trim().is_empty()) {
                    config.token = Some(token);
                }
                Ok(config)
            }
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = log_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("failed to init tracing: {err}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Drafts live in SQLite; open + migrate here so services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let drafts = DraftService::new(Arc::clone(&storage.local)).with_clock(Clock::system());

    match cmd {
        Command::Discard => {
            if drafts.clear(&parsed.assignment).await? {
                println!("Draft for {} discarded.", parsed.assignment);
            } else {
                println!("No draft saved for {}.", parsed.assignment);
            }
            Ok(())
        }
        Command::Take => {
            let purged = drafts.purge_expired().await?;
            if purged > 0 {
                tracing::info!(purged, "removed stale drafts");
            }
            let api = HttpCourseworkApi::new(parsed.api_config()?)?;
            let service = Arc::new(QuizService::new(Arc::new(api), drafts));
            runner::take(service, &parsed.assignment).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
