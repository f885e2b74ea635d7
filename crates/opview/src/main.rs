#![forbid(unsafe_code)]

//! opview binary entry point.

mod app;
mod cli;
mod headless;
mod logging;
mod paint;
mod theme;

use std::io;
use std::process::ExitCode;

use opview_core::{Dataset, FacetSelection, WindowConfig};

fn main() -> ExitCode {
    let opts = cli::Opts::parse();

    let settings = logging::LogSettings::from_env_with(opts.is_headless(), |key| {
        std::env::var(key).ok()
    });
    if let Err(err) = settings.init() {
        eprintln!("opview: cannot open log output: {err}");
        return ExitCode::FAILURE;
    }

    let dataset = match Dataset::from_path(&opts.db) {
        Ok(dataset) => dataset,
        Err(err) => {
            tracing::error!(path = %opts.db.display(), error = %err, "dataset load failed");
            eprintln!("opview: {err}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(path = %opts.db.display(), records = dataset.len(), "dataset loaded");

    let facets: FacetSelection = opts.facets.iter().copied().collect();

    if opts.is_headless() {
        let mut session = headless::session(dataset, &opts.query, facets);
        let mut out = io::stdout().lock();
        let result = match opts.detail {
            Some(position) => headless::print_detail(&mut session, position, &mut out),
            None => headless::print_rows(&session, &mut out).map(|_| ()),
        };
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("opview: {err}");
                ExitCode::FAILURE
            }
        };
    }

    // One terminal line per collapsed row unless overridden.
    let config = WindowConfig::default().with_row_height(1).with_env_overrides();
    match app::run(dataset, config, opts.query, facets) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("opview: terminal error: {err}");
            ExitCode::FAILURE
        }
    }
}
