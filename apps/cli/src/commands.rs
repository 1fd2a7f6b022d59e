//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use markstream_markdown::BoundedRenderer;
use markstream_shared::{
    AppConfig, MarkstreamError, RenderConfig, init_config, load_config, validate_config,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::stream::{self, FragmentSink, NoProgress, OutputFormat, StreamReporter, StreamSummary};

/// Chunks buffered between the producer task and the renderer.
const CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// markstream: render streamed Markdown to HTML incrementally.
#[derive(Parser)]
#[command(
    name = "markstream",
    version,
    about = "Render Markdown to HTML fragment by fragment, as it streams in.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Stream a Markdown file (or stdin) through the renderer.
    Render(RenderArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `markstream render`.
#[derive(clap::Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render. Reads stdin when omitted.
    pub file: Option<PathBuf>,

    /// Characters per simulated upstream chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Milliseconds to wait between chunks.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Characters before an unterminated line is rendered anyway.
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Maximum list nesting depth before the input is rejected.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Output format.
    #[arg(long, value_enum, default_value = "html")]
    pub format: OutputFormat,

    /// Show a progress spinner on stderr.
    #[arg(long)]
    pub progress: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries HTML.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "markstream=info",
        1 => "markstream=debug",
        _ => "markstream=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render(args) => cmd_render(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Apply CLI overrides on top of the loaded config file.
fn merge_overrides(mut config: AppConfig, args: &RenderArgs) -> AppConfig {
    if let Some(n) = args.chunk_size {
        config.stream.chunk_size = n;
    }
    if let Some(ms) = args.delay_ms {
        config.stream.delay_ms = ms;
    }
    if let Some(n) = args.threshold {
        config.renderer.line_flush_threshold = n;
    }
    if let Some(n) = args.max_depth {
        config.limits.max_list_depth = n;
    }
    config
}

async fn read_file(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MarkstreamError::io(path, e))?;
    Ok(text)
}

async fn cmd_render(args: RenderArgs) -> Result<()> {
    let config = merge_overrides(load_config()?, &args);
    validate_config(&config)?;

    let render_config = RenderConfig::from(&config);
    let chunk_size = config.stream.chunk_size;
    let delay = Duration::from_millis(config.stream.delay_ms);

    let source = args
        .file
        .as_deref()
        .map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string());
    info!(
        %source,
        chunk_size,
        threshold = render_config.line_flush_threshold,
        max_depth = render_config.max_list_depth,
        "rendering markdown stream"
    );

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let producer = match args.file.as_deref() {
        // A file is already complete: replay it as a simulated token stream.
        Some(path) => {
            let text = read_file(path).await?;
            let chunks = stream::split_chunks(&text, chunk_size);
            tokio::spawn(stream::produce(chunks, delay, tx))
        }
        // Stdin may be a live generator: forward it as it arrives.
        None => tokio::spawn(stream::produce_reader(
            tokio::io::stdin(),
            chunk_size,
            delay,
            tx,
        )),
    };

    let reporter: Box<dyn StreamReporter> = if args.progress {
        Box::new(CliProgress::new())
    } else {
        Box::new(NoProgress)
    };

    let mut renderer = BoundedRenderer::new(&render_config);
    let mut sink = FragmentSink::new(std::io::stdout().lock(), args.format);

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available: never cancel.
            std::future::pending::<()>().await;
        }
    };

    let result = stream::drive(rx, &mut renderer, &mut sink, reporter.as_ref(), cancel).await;
    producer.abort();

    let summary = result?;
    info!(
        chunks = summary.chunks,
        fragments = summary.fragments,
        cancelled = summary.cancelled,
        "stream complete"
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl StreamReporter for CliProgress {
    fn chunk_rendered(&self, chunks: usize, fragments: usize) {
        self.spinner
            .set_message(format!("Rendering [{chunks} chunks, {fragments} fragments]"));
    }

    fn done(&self, summary: &StreamSummary) {
        self.spinner.finish_and_clear();
        if summary.cancelled {
            eprintln!("  Stream cancelled after {} chunks.", summary.chunks);
        }
    }

    fn aborted(&self, summary: &StreamSummary) {
        self.spinner.abandon_with_message(format!(
            "Stream aborted after {} chunks",
            summary.chunks
        ));
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
