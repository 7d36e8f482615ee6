//! CLI binary for md2office.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` / `StorageConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use md2office::{
    extract_spreadsheet, generate_doc, generate_excel, generate_excel_from_json, parse_markdown,
    render_docx, render_xlsx, write_artifact, ConversionConfig, DocRequest, ExcelRequest,
    GeneratedFile, HttpImageFetcher, HttpStore, StorageConfig,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Render a Markdown file to a local .docx
  md2office doc notes.md -o notes.docx

  # Render and upload; prints the download URL
  md2office doc notes.md --title "周报"

  # Service-style request payload from stdin
  echo '{"filename":"周报","content":"# 标题"}' | md2office doc - --request --json

  # First table of a Markdown file → .xlsx
  md2office excel sales.md -o sales.xlsx

  # Spreadsheet from a {title, data, metadata} JSON payload
  md2office excel-json payload.json -o report.xlsx

  # Dump the parsed Markdown tree
  md2office ast notes.md

ENVIRONMENT VARIABLES:
  MD2OFFICE_BUCKET        Bucket name (default difyfordoc-1323080521)
  MD2OFFICE_REGION        Bucket region (default ap-guangzhou)
  MD2OFFICE_UPLOAD_URL    Base URL uploads are PUT to
  MD2OFFICE_PUBLIC_URL    Base URL of returned download links
  MD2OFFICE_UPLOAD_TOKEN  Bearer token sent with uploads
  RUST_LOG                Overrides --verbose / --quiet log filtering
"##;

/// Render Markdown to Word and Excel files.
#[derive(Parser, Debug)]
#[command(
    name = "md2office",
    version,
    about = "Render Markdown to Word (.docx) and Excel (.xlsx) files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the full result as JSON instead of just the URL or path.
    #[arg(long, global = true, env = "MD2OFFICE_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MD2OFFICE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "MD2OFFICE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render Markdown into a .docx document.
    Doc {
        #[command(flatten)]
        io: IoArgs,

        /// Per-image download timeout in seconds.
        #[arg(long, env = "MD2OFFICE_IMAGE_TIMEOUT", default_value_t = 10)]
        image_timeout: u64,

        /// Maximum image width in centimetres.
        #[arg(long, env = "MD2OFFICE_IMAGE_MAX_WIDTH", default_value_t = 15.0)]
        image_max_width: f64,
    },
    /// Turn the first Markdown table into an .xlsx workbook.
    Excel {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Build an .xlsx from a {title, data, metadata} JSON payload.
    ExcelJson {
        /// JSON payload file, or `-` for stdin.
        payload: String,

        /// Where to write the workbook.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the parsed Markdown tree as JSON.
    Ast {
        /// Markdown file, or `-` for stdin.
        input: String,
    },
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Markdown file, or `-` for stdin.
    input: String,

    /// Treat the input as a {"filename", "content"} JSON request.
    #[arg(long)]
    request: bool,

    /// Document title; defaults to the input file name.
    #[arg(short, long)]
    title: Option<String>,

    /// Write the artifact here instead of uploading it.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl IoArgs {
    /// Load the input as a `(filename, content)` pair.
    fn load(&self) -> Result<(Option<String>, Option<String>)> {
        let text = read_input(&self.input)?;
        if self.request {
            let value: serde_json::Value =
                serde_json::from_str(&text).context("Request is not valid JSON")?;
            let field = |k: &str| value.get(k).and_then(|v| v.as_str()).map(str::to_string);
            let filename = self.title.clone().or_else(|| field("filename"));
            return Ok((filename, field("content")));
        }
        let filename = self.title.clone().or_else(|| {
            Path::new(&self.input)
                .file_stem()
                .filter(|_| self.input != "-")
                .map(|s| s.to_string_lossy().to_string())
        });
        Ok((filename, Some(text)))
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("md2office");
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.json && !matches!(cli.command, Command::Ast { .. });
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

    match &cli.command {
        Command::Doc {
            io,
            image_timeout,
            image_max_width,
        } => {
            let config = ConversionConfig::builder()
                .image_timeout_secs(*image_timeout)
                .image_max_width_cm(*image_max_width)
                .build()
                .context("Invalid configuration")?;
            let (filename, content) = io.load()?;
            let request = DocRequest { filename, content };
            let bar = spinner(show_progress, "Rendering document…");

            if let Some(path) = &io.output {
                let valid = request.validate()?;
                let fetcher = HttpImageFetcher::new(config.image_timeout_secs)
                    .context("Failed to build HTTP client")?;
                let bytes = render_docx(valid.content, &valid.title, &config, &fetcher)
                    .await
                    .context("Rendering failed")?;
                write_artifact(&bytes, path).await?;
                finish_local(&cli, bar, path, bytes.len());
            } else {
                let store = HttpStore::new(StorageConfig::from_env())?;
                let out = generate_doc(&request, &config, &store)
                    .await
                    .context("Document generation failed")?;
                finish_upload(&cli, bar, &out)?;
            }
        }
        Command::Excel { io } => {
            let (filename, content) = io.load()?;
            let request = ExcelRequest { filename, content };
            let bar = spinner(show_progress, "Building workbook…");

            if let Some(path) = &io.output {
                let valid = request.validate()?;
                let input = extract_spreadsheet(valid.content, &valid.title)?;
                let bytes = render_xlsx(&input)?;
                write_artifact(&bytes, path).await?;
                finish_local(&cli, bar, path, bytes.len());
            } else {
                let store = HttpStore::new(StorageConfig::from_env())?;
                let out = generate_excel(&request, &store)
                    .await
                    .context("Spreadsheet generation failed")?;
                finish_upload(&cli, bar, &out)?;
            }
        }
        Command::ExcelJson { payload, output } => {
            let text = read_input(payload)?;
            let value: serde_json::Value =
                serde_json::from_str(&text).context("Payload is not valid JSON")?;
            let bar = spinner(show_progress, "Building workbook…");
            let bytes = generate_excel_from_json(&value)?;
            write_artifact(&bytes, output).await?;
            finish_local(&cli, bar, output, bytes.len());
        }
        Command::Ast { input } => {
            let nodes = parse_markdown(&read_input(input)?);
            println!(
                "{}",
                serde_json::to_string_pretty(&nodes).context("Failed to serialise tree")?
            );
        }
    }

    Ok(())
}

fn finish_local(cli: &Cli, bar: Option<ProgressBar>, path: &Path, len: usize) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "path": path.display().to_string(), "bytes": len })
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {}",
            green("✔"),
            bold(&path.display().to_string()),
            dim(&format!("{len} bytes"))
        );
    }
}

fn finish_upload(cli: &Cli, bar: Option<ProgressBar>, out: &GeneratedFile) -> Result<()> {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    if out.file_url.is_empty() {
        bail!("Upload returned no URL for {}", out.filename);
    }
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(out).context("Failed to serialise result")?
        );
    } else {
        if !cli.quiet {
            eprintln!("{}  {}  {}", green("✔"), out.message, bold(&out.filename));
        }
        println!("{}", out.file_url);
    }
    Ok(())
}
