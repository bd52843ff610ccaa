//! CLI binary for mocr.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`
//! and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mocr::{process_batch, BatchConfig, BatchProgress};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a per-file progress bar plus one log line per
/// processed file. The batch is sequential, so no out-of-order handling is
/// needed here.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Create a callback whose bar length is set by `on_batch_start`.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl BatchProgress for CliProgress {
    fn on_batch_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} PDF files…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total_files: usize, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_file_complete(&self, file_name: &str, markdown_bytes: usize) {
        self.bar.println(format!(
            "  {} {:<32}  {}",
            green("✓"),
            file_name,
            dim(&format!("{markdown_bytes} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, file_name: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<32}  {}", red("✗"), file_name, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, converted: usize, failed: usize) {
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} files converted successfully",
                green("✔"),
                bold(&converted.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                if converted == 0 { red("✘") } else { cyan("⚠") },
                bold(&converted.to_string()),
                converted + failed,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./in to Markdown in ./out
  mocr

  # Test the pipeline without network calls or an API key
  mocr --dry-run

  # Custom directories
  mocr --in ~/scans --out ~/notes

  # Machine-readable batch report
  mocr --json > report.json

EXIT STATUS:
  0  the batch ran to completion, even if individual files failed
     validation or conversion (see the summary / --json report)
  1  fatal setup error: missing input directory, unwritable output
     directory, or no API credential outside --dry-run

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY    API credential for the Mistral OCR service
  MOCR_IN            Default for --in
  MOCR_OUT           Default for --out
  MOCR_MODEL         Default for --model
  MOCR_API_TIMEOUT   Default for --api-timeout
  MOCR_NO_PROGRESS   Set to disable the progress bar (--no-progress)
  MOCR_VERBOSE       Set to enable DEBUG logs (--verbose)
  MOCR_QUIET         Set to suppress non-error output (--quiet)

LIMITS:
  Files over 50 MiB or 1000 pages are skipped with a per-file error;
  the rest of the batch still runs.
"#;

/// Batch-convert PDF files to Markdown with the Mistral OCR API.
#[derive(Parser, Debug)]
#[command(
    name = "mocr",
    version,
    about = "Batch-convert PDF files to Markdown with the Mistral OCR API",
    long_about = "Reads every PDF in the input directory, submits it to the Mistral OCR \
service, and writes the returned Markdown to the output directory — one .md per PDF, \
named after the source file. Use --dry-run to exercise the pipeline offline.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Simulate processing: no API key needed, no network calls; writes a
    /// deterministic placeholder per valid file.
    #[arg(long)]
    dry_run: bool,

    /// Input directory scanned for *.pdf files.
    #[arg(long = "in", value_name = "DIR", env = "MOCR_IN", default_value = "./in")]
    input: PathBuf,

    /// Output directory for the generated .md files (created if absent).
    #[arg(
        long = "out",
        value_name = "DIR",
        env = "MOCR_OUT",
        default_value = "./out"
    )]
    output: PathBuf,

    /// OCR model identifier.
    #[arg(long, env = "MOCR_MODEL", default_value = "mistral-ocr-latest")]
    model: String,

    /// Per-document API timeout in seconds.
    #[arg(long, env = "MOCR_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "MOCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MOCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = BatchConfig::builder()
        .input_dir(cli.input.clone())
        .output_dir(cli.output.clone())
        .dry_run(cli.dry_run)
        .model(cli.model.clone())
        .api_timeout_secs(cli.api_timeout);

    if show_progress {
        builder = builder.progress(CliProgress::new() as Arc<dyn BatchProgress>);
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Run batch ────────────────────────────────────────────────────────
    // Per-file failures live inside the output; only setup errors are Err.
    let output = process_batch(&config).await.context("Batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        // Plain summary when the progress callback did not already print one.
        eprintln!(
            "Converted {}/{} files in {}ms",
            output.stats.converted, output.stats.discovered, output.stats.total_duration_ms
        );
        for r in output.results.iter().filter(|r| !r.is_success()) {
            if let Some(ref e) = r.error {
                eprintln!("  {} {}: {}", red("✗"), r.file_name, e);
            }
        }
    }

    // Completion is exit 0 regardless of per-file failures; the report and
    // summary carry the detail.
    Ok(())
}
