//! CLI binary for edgequake-ocrbatch.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BatchConfig` and prints the batch summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ocrbatch::{run, BatchConfig, BatchProgressCallback, BatchReport, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over the items of the batch, with a log line
/// per page and per item printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently in flight.
    page_started: Mutex<Instant>,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` reports the item count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for PDFs and images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(Instant::now()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    /// Time since the previous page (or item start), restarting the clock.
    fn page_elapsed(&self) -> String {
        let mut started = self
            .page_started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let secs = started.elapsed().as_secs_f64();
        *started = Instant::now();
        dim(&format!("{secs:.1}s"))
    }

    fn restart_clock(&self) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Instant::now();
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, documents: usize, images: usize) {
        self.activate_bar(documents + images);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {documents} PDF(s) and {images} image(s)"))
        ));
    }

    fn on_item_start(&self, name: &str) {
        self.bar.set_message(name.to_string());
        self.restart_clock();
    }

    fn on_item_skipped(&self, name: &str) {
        self.bar
            .println(format!("{} {}  {}", dim("↷"), name, dim("already processed")));
        self.bar.inc(1);
    }

    fn on_document_open(&self, name: &str, total_pages: usize) {
        self.bar.set_message(format!("{name} (0/{total_pages})"));
    }

    fn on_page_complete(&self, document: &str, page_num: usize, total: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            self.page_elapsed(),
        ));
        self.bar.set_message(format!("{document} ({page_num}/{total})"));
    }

    fn on_page_reused(&self, document: &str, page_num: usize, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            dim("↷"),
            page_num,
            total,
            dim("reused"),
        ));
        self.bar.set_message(format!("{document} ({page_num}/{total})"));
    }

    fn on_page_error(&self, _document: &str, page_num: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            self.page_elapsed(),
        ));
    }

    fn on_item_complete(&self, name: &str, ok: bool) {
        let mark = if ok { green("✔") } else { red("✘") };
        self.bar.println(format!("{mark} {}", bold(name)));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR everything in the current directory
  ocrbatch

  # Another folder, artifacts written elsewhere
  ocrbatch --dir scans --output-dir ocr-out

  # Use a specific model
  ocrbatch --provider gemini --model gemini-1.5-pro-latest

  # Faster pacing for a provider with generous limits
  ocrbatch --page-delay-secs 0 --item-delay-secs 0

  # Machine-readable summary
  ocrbatch --json --no-progress > report.json

OUTPUT LAYOUT (relative to --output-dir, default --dir):
  <stem>/<stem>_page_<n>.md    one file per PDF page (n is 1-based)
  <stem>_complete.md           all pages of a PDF, separated by ---
  image_ocr/<stem>.md          one file per standalone image

  Existing files are treated as done: re-running only processes what is
  missing. Delete a file to have it regenerated.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
"#;

/// OCR a folder of PDFs and images using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "ocrbatch",
    version,
    about = "Resumable batch OCR of PDF and image folders using Vision LLMs",
    long_about = "Transcribe every PDF page and every image in a folder to Markdown using a \
Vision Language Model. Work is sequential, paced and retried, and every output file doubles as \
a completion marker so an interrupted run resumes where it stopped.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder scanned (non-recursively) for PDFs and images.
    #[arg(short, long, env = "OCRBATCH_DIR", default_value = ".")]
    dir: PathBuf,

    /// Root for all output files. Defaults to --dir.
    #[arg(short, long, env = "OCRBATCH_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// LLM model ID (e.g. gemini-1.5-pro-latest, gpt-4.1).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Attempts per page or image before giving up on it.
    #[arg(long, env = "OCRBATCH_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Seconds to wait between two attempts of the same unit.
    #[arg(long, env = "OCRBATCH_RETRY_DELAY_SECS", default_value_t = 5)]
    retry_delay_secs: u64,

    /// Seconds to wait after each page sent to the model.
    #[arg(long, env = "OCRBATCH_PAGE_DELAY_SECS", default_value_t = 2)]
    page_delay_secs: u64,

    /// Seconds to wait between two documents or images.
    #[arg(long, env = "OCRBATCH_ITEM_DELAY_SECS", default_value_t = 2)]
    item_delay_secs: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "OCRBATCH_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Scale applied to each PDF page's native size when rasterising.
    #[arg(long, env = "OCRBATCH_RENDER_SCALE", default_value_t = 2.0)]
    render_scale: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCRBATCH_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "OCRBATCH_PROMPT")]
    prompt: Option<PathBuf>,

    /// Keep only the text between the ''' sentinel lines of each reply.
    #[arg(long, env = "OCRBATCH_STRIP_SENTINELS")]
    strip_sentinels: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "OCRBATCH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCRBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCRBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCRBATCH_QUIET")]
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
    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let config = build_config(
        &cli,
        progress
            .as_ref()
            .map(|cb| Arc::clone(cb) as ProgressCallback),
    )
    .await?;

    // ── Run batch ────────────────────────────────────────────────────────
    let started = Instant::now();
    let result = run(&config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let report = result.context("Batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, started.elapsed());
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .working_dir(&cli.dir)
        .max_attempts(cli.max_attempts)
        .retry_delay(Duration::from_secs(cli.retry_delay_secs))
        .page_delay(Duration::from_secs(cli.page_delay_secs))
        .item_delay(Duration::from_secs(cli.item_delay_secs))
        .api_timeout_secs(cli.api_timeout)
        .render_scale(cli.render_scale)
        .strip_sentinels(cli.strip_sentinels);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &BatchReport, elapsed: Duration) {
    if report.nothing_found {
        eprintln!("{} No PDF or image files found; nothing to do", dim("·"));
        return;
    }

    let mark = if report.all_done() { green("✔") } else { cyan("⚠") };
    eprintln!(
        "{}  {}/{} PDFs  {}/{} images  in {:.1}s",
        mark,
        report.documents_completed + report.documents_skipped,
        report.documents_found,
        report.images_completed + report.images_skipped,
        report.images_found,
        elapsed.as_secs_f64(),
    );
    eprintln!(
        "   {} service calls  /  {} pages reused  /  {} skipped",
        dim(&report.service_calls.to_string()),
        dim(&report.pages_reused.to_string()),
        dim(&(report.documents_skipped + report.images_skipped).to_string()),
    );

    let failures = report.documents_incomplete
        + report.documents_unpersisted
        + report.documents_failed
        + report.images_failed;
    if failures > 0 || report.pages_failed > 0 {
        eprintln!(
            "   {} item(s) and {} page(s) produced nothing; re-run to retry them",
            red(&failures.to_string()),
            red(&report.pages_failed.to_string()),
        );
    }
}
