#![forbid(unsafe_code)]

//! Log subscriber setup.
//!
//! The terminal UI owns stdout and stderr while it runs, so its logs go to
//! `OPVIEW_LOG_FILE` or nowhere. Headless runs log to stderr.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const ENV_LOG: &str = "OPVIEW_LOG";
pub const ENV_LOG_FORMAT: &str = "OPVIEW_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "OPVIEW_LOG_FILE";
const ENV_RUST_LOG: &str = "RUST_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Discard,
}

/// Subscriber settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub json: bool,
    pub target: LogTarget,
}

impl LogSettings {
    /// Resolve settings. `headless` forces stderr output.
    pub fn from_env_with<F>(headless: bool, get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let directive = get_env(ENV_LOG)
            .or_else(|| get_env(ENV_RUST_LOG))
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string());
        let json = get_env(ENV_LOG_FORMAT).is_some_and(|value| value.eq_ignore_ascii_case("json"));
        let target = if headless {
            LogTarget::Stderr
        } else {
            match get_env(ENV_LOG_FILE) {
                Some(path) if !path.trim().is_empty() => LogTarget::File(PathBuf::from(path)),
                _ => LogTarget::Discard,
            }
        };
        Self {
            directive,
            json,
            target,
        }
    }

    /// Install the global subscriber. A second call is a no-op.
    pub fn init(&self) -> io::Result<()> {
        let writer = match &self.target {
            LogTarget::Discard => return Ok(()),
            LogTarget::Stderr => BoxMakeWriter::new(io::stderr),
            LogTarget::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                BoxMakeWriter::new(Mutex::new(file))
            }
        };
        let filter = EnvFilter::try_new(&self.directive)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(self.target == LogTarget::Stderr && !self.json);
        let installed = if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if installed.is_err() {
            tracing::debug!("log subscriber already installed");
        }
        Ok(())
    }
}
