use std::io;

use nodeweave_util_error::{Whatever, WhateverResult};
use snafu::{FromString as _, ResultExt as _};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Log to stderr, so stdout carries only command output
///
/// `RUST_LOG` takes precedence; `verbose` turns on debug logs of the read
/// path (failovers, stale serving).
pub fn init_logging(verbose: bool) -> WhateverResult<()> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if verbose {
        filter = filter.add_directive(
            "nodeweave=debug"
                .parse()
                .whatever_context("Invalid log directive")?,
        );
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|_| Whatever::without_source("Failed to initialize logging".to_string()))?;

    Ok(())
}
