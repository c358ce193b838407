pub mod classify;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod filter;
pub mod logging;
pub mod params;
pub mod parser;
pub mod patterns;
pub mod render;
pub mod stream;

use anyhow::Context;
use std::io::{self, IsTerminal};

pub use classify::{Bucket, DataAccessKind, LineClassifier, classify_data_access};
pub use cli::{ColorMode, OutputFormat, cli_parse};
pub use config::{LensConfig, load_config};
pub use correlator::{
    CorrelationBuffer, CorrelatorStats, Diagnostic, DiagnosticKind, Emission, RequestCorrelator,
    RequestRecord,
};
pub use filter::{RecordFilter, RecordView};
pub use params::{ParamsError, parse_params};
pub use parser::{Entry, TaggedLine, parse_line};

pub fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    logging::init_logging(cli.verbose, cli.quiet)?;
    cli.color.apply();

    let mut config = load_config(cli.config.as_deref()).context("failed to load config")?;
    cli.apply_to(&mut config);
    tracing::debug!(
        capacity = config.engine.capacity,
        keep_status = config.engine.keep_status_threshold,
        config = ?cli.config,
        "configuration loaded"
    );

    let mut correlator = RequestCorrelator::from_config(&config);
    let invalid = filter::warn_invalid_rules(correlator.filter());
    if invalid > 0 {
        tracing::info!(invalid, "continuing with never-matching filter rules");
    }

    let input = cli.input();
    if input == stream::Input::Stdin && io::stdin().is_terminal() {
        tracing::warn!("reading from a terminal; pipe a log in or pass a file path");
    }

    let token = stream::CancellationToken::new();
    stream::install_signal_handler(&token)?;
    let rx = stream::spawn_reader(input, token.clone())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    stream::run_stream(rx, &mut correlator, cli.format, &mut out, &token)?;

    if cli.stats {
        eprintln!(
            "{}",
            render::format_stats_table(correlator.stats(), correlator.pending())
        );
    }

    Ok(())
}
