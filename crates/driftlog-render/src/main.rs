//! Line-oriented event renderer for the Driftlog pipeline.
//!
//! Reads one encoded event per line from stdin, adds configured tags,
//! drops events carrying a drop tag, and writes one rendered line per
//! event to stdout. Logs go to stderr.
//!
//! # Architecture
//!
//! ```text
//! stdin --> input codec --> tag / drop --> output codec | mapping --> stdout
//! ```
//!
//! The configuration file path comes from the first argument or
//! `DRIFTLOG_CONFIG`; without either, defaults plus environment overrides
//! are used.

mod config;
mod error;
mod renderer;

use std::io::{BufWriter, stdin, stdout};
use std::path::PathBuf;

use anyhow::Context;
use driftlog_event::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RenderConfig;
use crate::renderer::Renderer;

/// Application entry point.
///
/// Initializes logging, loads configuration, installs the JSON backend,
/// then renders stdin to stdout until end of input.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or stdin/stdout
/// fail.
fn main() -> anyhow::Result<()> {
    // Initialize structured logging on stderr so stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("driftlog-render starting");

    let config = match config_path() {
        Some(path) => RenderConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let mut config = RenderConfig::default();
            config.apply_env_overrides()?;
            config
        }
    };

    let backend = json::install(config.json.backend);
    info!(
        json_backend = %backend,
        input_codec = %config.input.codec,
        output_codec = %config.output.codec,
        mapped = config.output.mapping.is_some(),
        tags = ?config.tags,
        drop_tags = ?config.drop_tags,
        "configuration loaded"
    );

    let renderer = Renderer::from_config(&config);
    let stats = renderer.run(stdin().lock(), BufWriter::new(stdout().lock()))?;

    info!(
        read = stats.read,
        written = stats.written,
        dropped = stats.dropped,
        failed = stats.failed,
        "input exhausted"
    );
    Ok(())
}

/// Config file path from the first argument or `DRIFTLOG_CONFIG`.
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("DRIFTLOG_CONFIG"))
        .map(PathBuf::from)
}
