//! CLI runner shared by the `filepack` binary and the integration tests:
//! argument parsing, logging setup, the resolve → pack pipeline and the
//! mapping of errors to exit codes.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{self, Args};
use crate::error::{ErrorKind, PackError};
use crate::file_list::FileList;
use crate::pack::{self, PackSummary, Packer};
use crate::progress::PackProgress;

/// Environment variable holding the log filter (`tracing_subscriber::EnvFilter` syntax).
pub const LOG_ENV: &str = "FILEPACK_LOG";

/// Installs the stderr log subscriber. Defaults to `warn` when `FILEPACK_LOG` is unset.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Public entry used by `main`: parses `std::env::args` and runs.
pub fn run_cli_app() -> ExitCode {
    run_with_args(std::env::args_os())
}

/// Parses `args`, runs the pipeline and returns the process exit code.
pub fn run_with_args<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match cli::parse_from(args) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(ErrorKind::ArgError.exit_code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging();

    match run(&args) {
        Ok(summary) => {
            println!(
                "Packed {} entries into '{}' ({} -> {} bytes)",
                summary.entries,
                args.output.display(),
                summary.bytes_in,
                summary.bytes_out
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Resolves the input and packs it into the output archive.
pub fn run(args: &Args) -> Result<PackSummary, PackError> {
    let options = args.pack_options()?;
    options.validate()?;
    pack::prepare_output(&args.output)?;

    let files = FileList::resolve(&args.input)?;
    info!("resolved {} entries from '{}'", files.len(), args.input.display());
    if args.check_sources {
        files.check_sources()?;
    }

    let mut packer = Packer::new(options);
    if args.progress {
        packer = packer.with_progress(create_cli_progress_callback("pack"));
    }
    packer.pack(&files, &args.output)
}

// --- utils for CLI progress -------------------------------------------------

fn create_cli_progress_callback(operation: &str) -> impl FnMut(&PackProgress) {
    let operation = operation.to_uppercase();
    let mut last_update: Option<Instant> = None;
    let mut prev_len = 0usize;

    move |state: &PackProgress| {
        let now = Instant::now();
        // Redraw at most every 100ms, but always draw the final state
        let due = last_update.map_or(true, |t| now.duration_since(t) >= Duration::from_millis(100));
        if !due && !state.is_complete() {
            return;
        }
        last_update = Some(now);

        let term_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(80);
        let percent = state.progress_percent();
        let eta = if state.is_complete() {
            "--".to_string()
        } else {
            format_eta(state.estimated_time_remaining())
        };

        let mut bar_width: usize = 40;
        let line = loop {
            let filled = ((percent / 100.0) * bar_width as f32) as usize;
            let bar = format!("[{}{}]", "█".repeat(filled), "░".repeat(bar_width - filled));
            let line = format!(
                "[{}] {} {:.1}% | {}/{} entries | {:.1} MB/s | ETA: {}",
                operation,
                bar,
                percent,
                state.processed_entries,
                state.total_entries,
                state.speed_mbps(),
                eta
            );
            if line.chars().count() <= term_width || bar_width <= 10 {
                break line;
            }
            bar_width -= 5;
        };

        // Pad over leftovers of a longer previous line
        let len = line.chars().count();
        let padding = " ".repeat(prev_len.saturating_sub(len));
        prev_len = len;
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r{}{}", line, padding);
        if state.is_complete() {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs_f32();
    if secs > 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}
