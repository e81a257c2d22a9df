use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use services::Clock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{ArgsError, require_value};

pub const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Process-wide settings: environment first, then global flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub now: Option<DateTime<FixedOffset>>,
    pub log_filter: String,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            db_url: std::env::var("STUDY_DB_URL")
                .ok()
                .map_or_else(|| normalize_sqlite_url(DEFAULT_DB_URL.into()), normalize_sqlite_url),
            now: None,
            log_filter: std::env::var("STUDY_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        }
    }

    /// Consume leading global flags (`--db`, `--now`) and return the rest.
    pub fn apply_global_flags(
        mut self,
        args: Vec<String>,
    ) -> Result<(Self, Vec<String>), ArgsError> {
        let mut iter = args.into_iter().peekable();
        while let Some(flag) = iter.peek().cloned() {
            match flag.as_str() {
                "--db" => {
                    iter.next();
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidValue {
                            flag: "--db",
                            raw: value,
                        });
                    }
                    self.db_url = normalize_sqlite_url(value);
                }
                "--now" => {
                    iter.next();
                    let value = require_value(&mut iter, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value).map_err(|_| {
                        ArgsError::InvalidValue {
                            flag: "--now",
                            raw: value.clone(),
                        }
                    })?;
                    self.now = Some(parsed);
                }
                _ => break,
            }
        }
        Ok((self, iter.collect()))
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.now.map_or_else(Clock::system, Clock::fixed)
    }
}

/// Install the stderr `tracing` subscriber. Invalid filters fall back to the default.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidValue {
            flag: "--db",
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidValue {
            flag: "--db",
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            db_url: "sqlite::memory:".into(),
            now: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn global_flags_are_consumed_before_command() {
        let (config, rest) = base()
            .apply_global_flags(argv(&[
                "--now",
                "2024-03-01T21:00:00+05:30",
                "--db",
                "/tmp/study.db",
                "report",
                "day",
            ]))
            .unwrap();
        assert_eq!(config.db_url, "sqlite:///tmp/study.db");
        assert!(config.clock().is_fixed());
        assert_eq!(config.clock().today().to_string(), "2024-03-01");
        assert_eq!(rest, argv(&["report", "day"]));
    }

    #[test]
    fn bad_now_is_rejected() {
        assert!(matches!(
            base().apply_global_flags(argv(&["--now", "yesterday"])),
            Err(ArgsError::InvalidValue { flag: "--now", .. })
        ));
    }

    #[test]
    fn memory_and_absolute_urls_are_kept() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:/var/lib/study.db".into()),
            "sqlite:///var/lib/study.db"
        );
    }
}
