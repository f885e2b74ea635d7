#![forbid(unsafe_code)]

//! Command-line argument parsing.
//!
//! Parsed by hand, with `OPVIEW_*` environment variables as defaults that
//! explicit flags override.

use std::env;
use std::path::PathBuf;
use std::process;

use opview_core::Facet;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_DB: &str = "OPVIEW_DB";
pub const ENV_QUERY: &str = "OPVIEW_QUERY";

const HELP_TEXT: &str = "\
opview: browse instruction latency/throughput catalogs in the terminal

USAGE:
    opview --db=PATH [OPTIONS]

OPTIONS:
    --db=PATH           Dataset file (JSON array, or {metadata, records})
    --query=Q           Initial search query
    --facet=NAME        Enable a facet; repeatable
    --print             Print the filtered rows as JSON lines and exit
    --detail=N          Print the detail view of filtered row N as JSON and exit
    --help, -h          Show this help message
    --version, -V       Show version

FACETS:
    intrinsics-only     Only instructions with an intrinsic
    baseline-only       Only general/advsimd/float/fpsimd instructions
    no-extensions       Hide armv8.N extension instructions
    with-armv8.N        Keep armv8.N instructions while no-extensions is on

KEYBINDINGS:
    type / Backspace    Edit the query
    Esc                 Clear the query
    F1 / F2 / F3        Toggle intrinsics-only / baseline-only / no-extensions
    F4                  Cycle the armv8.N level kept by no-extensions
    Up / Down           Move the selection
    PageUp / PageDown   Move the selection by a screen
    Home / End          Jump to the first / last row
    Mouse wheel         Scroll
    Enter               Expand or collapse the selected instruction
    Ctrl+C              Quit

ENVIRONMENT VARIABLES:
    OPVIEW_DB                 Default for --db
    OPVIEW_QUERY              Default for --query
    OPVIEW_ROW_HEIGHT         Estimated row height in lines (default: 1)
    OPVIEW_INITIAL_SCREENS    Screens rendered up front (default: 5)
    OPVIEW_LOOKAHEAD_SCREENS  Screens from the bottom that trigger growth (default: 2)
    OPVIEW_BATCH_SIZE         Rows added per growth step (default: 20)
    OPVIEW_LOG                Log filter, e.g. 'opview_core=debug' (falls back to RUST_LOG)
    OPVIEW_LOG_FORMAT         'json' for JSON log lines
    OPVIEW_LOG_FILE           Log destination while the terminal UI runs";

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Opts {
    /// Dataset file.
    pub db: PathBuf,
    /// Initial search query.
    pub query: String,
    /// Facets enabled at startup, in the order given.
    pub facets: Vec<Facet>,
    /// Headless: print filtered rows as JSONL.
    pub print: bool,
    /// Headless: print the detail view of this filtered position.
    pub detail: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
    MissingDataset,
}

impl Opts {
    /// Parse command-line arguments and environment variables, exiting on
    /// `--help`, `--version`, or bad input.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("opview {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
            Err(ParseError::MissingDataset) => {
                eprintln!("No dataset given. Pass --db=PATH or set {ENV_DB}.");
                process::exit(1);
            }
        }
    }

    /// True when the run prints and exits instead of opening the terminal UI.
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.print || self.detail.is_some()
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        let mut db: Option<PathBuf> = None;

        if let Some(val) = get_env(ENV_DB)
            && !val.trim().is_empty()
        {
            db = Some(PathBuf::from(val));
        }
        if let Some(val) = get_env(ENV_QUERY) {
            opts.query = val;
        }

        for arg in args {
            match arg.as_ref() {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--print" => opts.print = true,
                other => {
                    if let Some(val) = other.strip_prefix("--db=") {
                        if val.trim().is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--db",
                                value: val.to_string(),
                            });
                        }
                        db = Some(PathBuf::from(val));
                    } else if let Some(val) = other.strip_prefix("--query=") {
                        opts.query = val.to_string();
                    } else if let Some(val) = other.strip_prefix("--facet=") {
                        let facet = val.parse::<Facet>().map_err(|_| ParseError::InvalidValue {
                            flag: "--facet",
                            value: val.to_string(),
                        })?;
                        if !opts.facets.contains(&facet) {
                            opts.facets.push(facet);
                        }
                    } else if let Some(val) = other.strip_prefix("--detail=") {
                        let position = val.parse().map_err(|_| ParseError::InvalidValue {
                            flag: "--detail",
                            value: val.to_string(),
                        })?;
                        opts.detail = Some(position);
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        opts.db = db.ok_or(ParseError::MissingDataset)?;
        Ok(opts)
    }
}
