//! Streaming front end: a reader thread feeding raw lines over a channel and
//! the consuming loop that drives the correlator and writes its output.
//!
//! The consuming loop waits with a timeout so a cancellation request (Ctrl-C
//! or a closed output pipe) is noticed even while the input is idle, for
//! example when following a quiet log file.

use crate::cli::OutputFormat;
use crate::correlator::{Emission, RequestCorrelator};
use crate::render::render_emission;
use anyhow::Context;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// How long the reader sleeps at end of file when following, and how long
/// the consumer waits for a line before re-checking cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    /// A log file; with `follow` the reader keeps polling at end of file.
    File { path: PathBuf, follow: bool },
}

/// Shared flag that asks the reader and the consuming loop to stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancels `token` on SIGINT/SIGTERM.
pub fn install_signal_handler(token: &CancellationToken) -> anyhow::Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        info!("shutdown requested");
        token.cancel();
    })
    .context("failed to install signal handler")
}

/// Opens `input` and starts a reader thread sending one line per message.
///
/// Opening happens on the calling thread so a missing file is reported
/// before any output is produced.
pub fn spawn_reader(
    input: Input,
    token: CancellationToken,
) -> anyhow::Result<Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel();
    let builder = thread::Builder::new().name("line-reader".to_string());

    match input {
        Input::Stdin => {
            builder
                .spawn(move || pump(io::stdin().lock(), false, &tx, &token))
                .context("failed to start reader thread")?;
        }
        Input::File { path, follow } => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open input file '{}'", path.display()))?;
            builder
                .spawn(move || pump(BufReader::new(file), follow, &tx, &token))
                .context("failed to start reader thread")?;
        }
    }

    Ok(rx)
}

/// Decodes one raw line, replacing invalid UTF-8 and dropping the line ending.
fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

fn pump<R: BufRead>(
    mut reader: R,
    follow: bool,
    tx: &Sender<io::Result<String>>,
    token: &CancellationToken,
) {
    let mut buf = Vec::new();
    loop {
        if token.is_cancelled() {
            return;
        }
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) if follow => thread::sleep(POLL_INTERVAL),
            Ok(0) => return,
            // A partial last line is completed by a later write when following.
            Ok(_) if follow && !buf.ends_with(b"\n") => thread::sleep(POLL_INTERVAL),
            Ok(_) => {
                let line = decode_line(&buf);
                buf.clear();
                if tx.send(Ok(line)).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

fn write_emission<W: Write>(
    out: &mut W,
    emission: &Emission,
    format: OutputFormat,
) -> io::Result<()> {
    let rendered = render_emission(emission, format)?;
    match (format, emission) {
        (OutputFormat::Json, _) => writeln!(out, "{rendered}")?,
        (OutputFormat::Text, Emission::Record(_)) => writeln!(out, "{rendered}")?,
        (OutputFormat::Text, Emission::Diagnostic(_)) => write!(out, "{rendered}")?,
    }
    out.flush()
}

/// Drives `correlator` with lines from `rx` until the input ends or `token`
/// is cancelled, writing every emission to `out` as soon as it is produced.
pub fn run_stream<W: Write>(
    rx: Receiver<io::Result<String>>,
    correlator: &mut RequestCorrelator,
    format: OutputFormat,
    out: &mut W,
    token: &CancellationToken,
) -> anyhow::Result<()> {
    loop {
        if token.is_cancelled() {
            break;
        }
        let line = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line.context("failed to read input")?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let Some(emission) = correlator.process_line(&line) else {
            continue;
        };
        match write_emission(out, &emission, format) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("output closed, stopping");
                token.cancel();
                return Ok(());
            }
            Err(e) => return Err(e).context("failed to write output"),
        }
    }

    debug!(
        pending = correlator.pending(),
        lines = correlator.stats().lines_read,
        "input finished"
    );
    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            Err(e).context("failed to flush output")
        }
        _ => Ok(()),
    }
}
