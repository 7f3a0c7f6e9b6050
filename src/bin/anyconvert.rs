//! CLI binary for anyconvert.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `OrchestratorConfig`, runs the wizard steps end-to-end, and prints
//! results.

use anyconvert::{
    ConversionSummary, Item, ItemPatch, ItemStatus, ItemStore, Orchestrator, OrchestratorConfig,
    StoreObserver, WizardStep,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
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

// ── Progress rendering via store subscription ────────────────────────────────

/// Store observer that renders per-item progress with [indicatif]. Items
/// settle out-of-order in concurrent runs; each terminal transition prints
/// its own line above the bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos}/{len} items  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl StoreObserver for CliProgress {
    fn on_item_updated(&self, item: &Item) {
        match item.status {
            ItemStatus::Converting => {
                self.bar.set_message(item.name.clone());
            }
            ItemStatus::Converted => {
                self.bar
                    .println(format!("  {} {}", green("✓"), item.name));
                self.bar.inc(1);
            }
            ItemStatus::Error => {
                self.bar.println(format!(
                    "  {} {}  {}",
                    red("✗"),
                    item.name,
                    dim("conversion failed")
                ));
                self.bar.inc(1);
            }
            _ => {}
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert two files to PDF and download the results
  anyconvert run report.docx scan.jpg --to pdf -o ./converted

  # Convert a website to PDF
  anyconvert run https://example.com --to pdf -o ./converted

  # Check a pending operation
  anyconvert status op_12345

  # Download an artifact by id
  anyconvert download file_9 -o ./converted

  # List what the service can convert
  anyconvert formats

ENVIRONMENT VARIABLES:
  ANYCONVERT_API_URL   Base URL of the conversion service
  ANYCONVERT_USER_ID   User id forwarded on upload/convert requests
  ANYCONVERT_STORE     Path of the wizard store snapshot
"#;

/// Convert files and websites through a remote conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "anyconvert",
    version,
    about = "Convert files and websites through a remote conversion service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Base URL of the conversion service.
    #[arg(
        long,
        global = true,
        env = "ANYCONVERT_API_URL",
        default_value = "http://localhost:3000/api"
    )]
    api_url: String,

    /// User id forwarded on upload and convert requests.
    #[arg(long, global = true, env = "ANYCONVERT_USER_ID")]
    user_id: Option<String>,

    /// Path of the wizard store snapshot. Omit for an in-memory store.
    #[arg(long, global = true, env = "ANYCONVERT_STORE")]
    store: Option<PathBuf>,

    /// Number of items converted concurrently.
    #[arg(short, long, global = true, default_value_t = 4)]
    concurrency: usize,

    /// Overall polling deadline per operation in seconds.
    #[arg(long, global = true, default_value_t = 120)]
    poll_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload inputs, convert them, and download the results.
    Run {
        /// Local file paths and/or website URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Target format for every input (pdf, docx, txt, …).
        #[arg(long = "to")]
        target_format: String,

        /// Directory the converted artifacts are written into.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Request graph visualization data for each item.
        #[arg(long)]
        graph: bool,
    },
    /// Print the current status of an operation.
    Status {
        operation_id: String,

        /// Query the website-bundling status endpoint instead.
        #[arg(long)]
        website: bool,
    },
    /// Download an artifact by file id.
    Download {
        file_id: String,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List the service's supported conversions.
    Formats,
    /// Clear the wizard store and return to the upload step.
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = OrchestratorConfig::builder()
        .base_url(&cli.api_url)
        .concurrency(cli.concurrency)
        .poll_timeout_secs(cli.poll_timeout);
    let config = match &cli.user_id {
        Some(id) => config.user_id(id),
        None => config,
    }
    .build()?;

    let store = match &cli.store {
        Some(path) => ItemStore::open(path)?,
        None => ItemStore::in_memory(),
    };
    let orchestrator = Orchestrator::new(config, store)?;

    match cli.command {
        Command::Run {
            inputs,
            target_format,
            output_dir,
            graph,
        } => run_wizard(&orchestrator, inputs, &target_format, &output_dir, graph, cli.quiet).await,
        Command::Status {
            operation_id,
            website,
        } => {
            let operation = if website {
                orchestrator.client().website_status(&operation_id).await
            } else {
                orchestrator.client().operation_status(&operation_id).await
            }
            .with_context(|| format!("Failed to fetch status of '{operation_id}'"))?;
            println!("{}", serde_json::to_string_pretty(&operation)?);
            Ok(())
        }
        Command::Download {
            file_id,
            output_dir,
        } => {
            // A bare id download reuses the item fallback path: no result
            // file id, so the item's own id is fetched.
            let item = Item::file(file_id.clone(), file_id.clone(), 0);
            let path = orchestrator.download_to(&item, &output_dir).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Formats => {
            let formats = orchestrator
                .client()
                .supported_conversions()
                .await
                .context("Failed to fetch supported conversions")?;
            let mut sources: Vec<_> = formats.iter().collect();
            sources.sort_by_key(|(k, _)| k.as_str());
            for (source, targets) in sources {
                println!("{:<16} → {}", source, targets.join(", "));
            }
            Ok(())
        }
        Command::Reset => {
            orchestrator.store().reset();
            eprintln!("{} store cleared", green("✔"));
            Ok(())
        }
    }
}

/// The full wizard: upload → select format → convert → download.
async fn run_wizard(
    orchestrator: &Orchestrator,
    inputs: Vec<String>,
    target_format: &str,
    output_dir: &PathBuf,
    graph: bool,
    quiet: bool,
) -> Result<()> {
    let store = orchestrator.store();

    // ── Upload step ──────────────────────────────────────────────────────
    let (urls, files): (Vec<_>, Vec<_>) = inputs
        .into_iter()
        .partition(|i| i.starts_with("http://") || i.starts_with("https://"));

    let file_paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    for result in orchestrator.upload_files(&file_paths).await {
        // A failed upload aborts the run; partial batches surprise more
        // than they help in a one-shot CLI.
        result?;
    }
    for url in urls {
        orchestrator.add_website(url);
    }
    store.set_step(WizardStep::SelectFormat);

    // ── Format-select step ───────────────────────────────────────────────
    for item in store.items() {
        store.update(
            &item.id,
            ItemPatch {
                target_format: Some(target_format.to_string()),
                generate_graph: graph.then_some(true),
                ..Default::default()
            },
        );
    }

    // ── Convert step ─────────────────────────────────────────────────────
    let progress = (!quiet).then(|| {
        let p = CliProgress::new(store.len());
        store.subscribe(p.clone());
        p
    });

    let summary = orchestrator.convert_all().await;
    store.set_step(WizardStep::Download);
    if let Some(ref p) = progress {
        p.finish();
    }
    report_summary(&summary, quiet);

    // ── Download step ────────────────────────────────────────────────────
    for item in store.items() {
        if item.status == ItemStatus::Converted {
            let path = orchestrator.download_to(&item, output_dir).await?;
            if !quiet {
                println!("{}", path.display());
            }
        }
    }

    if summary.failed_items > 0 {
        anyhow::bail!("{} of {} items failed", summary.failed_items, summary.total_items);
    }
    Ok(())
}

fn report_summary(summary: &ConversionSummary, quiet: bool) {
    if quiet {
        return;
    }
    if summary.failed_items == 0 {
        eprintln!(
            "{} {} items converted in {:.1}s",
            green("✔"),
            bold(&summary.converted_items.to_string()),
            summary.duration_ms as f64 / 1000.0
        );
    } else {
        eprintln!(
            "{} {}/{} items converted  ({} failed)",
            red("✘"),
            bold(&summary.converted_items.to_string()),
            summary.total_items,
            red(&summary.failed_items.to_string()),
        );
        for outcome in &summary.outcomes {
            if let Some(ref e) = outcome.error {
                eprintln!("    {}: {}", outcome.name, e);
            }
        }
    }
}
