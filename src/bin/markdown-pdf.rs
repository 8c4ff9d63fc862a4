//! markdown-pdf CLI - convert markdown documents to PDF
//!
//! Thin command-line host around [`markdown_pdf::Converter`].

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use markdown_pdf::{
    Converter, Margins, Orientation, PageSize, RenderOutcome, Settings, Theme, ToolLocator,
};

/// Convert markdown to themed PDF through wkhtmltopdf
#[derive(Parser, Debug)]
#[command(name = "markdown-pdf", version, about)]
struct Cli {
    /// Markdown file, or markdown text with --text
    input: String,

    /// Output PDF file
    #[arg(short, long)]
    output: PathBuf,

    /// Treat INPUT as markdown text instead of a file path
    #[arg(long)]
    text: bool,

    /// Load settings from a TOML, JSON or YAML file
    #[arg(short, long, env = "MARKDOWN_PDF_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    #[arg(long, value_enum)]
    page_size: Option<PageSizeArg>,

    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Margin in millimeters for all four sides
    #[arg(long, value_name = "MM")]
    margin: Option<u32>,

    #[arg(long, value_name = "MM")]
    margin_left: Option<u32>,

    #[arg(long, value_name = "MM")]
    margin_right: Option<u32>,

    #[arg(long, value_name = "MM")]
    margin_top: Option<u32>,

    #[arg(long, value_name = "MM")]
    margin_bottom: Option<u32>,

    /// Stylesheet to use instead of the theme's
    #[arg(long, value_name = "FILE")]
    css: Option<PathBuf>,

    /// HTML template to use instead of the theme's
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Base directory for relative images and links
    #[arg(long, value_name = "DIR")]
    asset_dir: Option<PathBuf>,

    /// Path to the wkhtmltopdf executable
    #[arg(long, value_name = "FILE", env = "WKHTMLTOPDF")]
    renderer: Option<PathBuf>,

    /// Extra directory to search for wkhtmltopdf before PATH
    #[arg(long, value_name = "DIR")]
    tool_dir: Vec<PathBuf>,

    /// Extra renderer option placed before the input page (repeatable)
    #[arg(long, value_name = "ARG", allow_hyphen_values = true)]
    global_option: Vec<String>,

    /// Extra renderer option placed after the input page (repeatable)
    #[arg(long, value_name = "ARG", allow_hyphen_values = true)]
    page_option: Vec<String>,

    /// Pass --enable-local-file-access to the renderer
    #[arg(long)]
    local_file_access: bool,

    /// Renderer timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable pipe tables
    #[arg(long)]
    tables: bool,

    /// Enable all advanced markdown extensions
    #[arg(long)]
    advanced: bool,

    /// Keep scratch files and log their paths
    #[arg(long)]
    debug: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ThemeArg {
    Default,
    Github,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PageSizeArg {
    Letter,
    A4,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red());
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> Result<bool> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = build_settings(&cli)?;
    let locator = cli
        .tool_dir
        .iter()
        .fold(ToolLocator::new(), |locator, dir| locator.with_search_dir(dir));
    let outcome = Converter::new()
        .with_locator(locator)
        .run(&settings)
        .context("Failed to convert markdown")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        report(&outcome, &cli.output);
    }

    Ok(outcome.is_success())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::new(),
    };

    if cli.text {
        settings.markdown_text = Some(cli.input.clone());
        settings.markdown_file = None;
    } else {
        if cli.input.trim().is_empty() {
            bail!("no input file given");
        }
        settings.markdown_file = Some(PathBuf::from(&cli.input));
        settings.markdown_text = None;
    }
    settings.output_file = Some(cli.output.clone());

    if let Some(theme) = cli.theme {
        settings.theme = match theme {
            ThemeArg::Default => Theme::Default,
            ThemeArg::Github => Theme::Github,
        };
    }
    if let Some(size) = cli.page_size {
        settings.pdf.page_size = match size {
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::A4 => PageSize::A4,
        };
    }
    if let Some(orientation) = cli.orientation {
        settings.pdf.orientation = match orientation {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        };
    }

    if let Some(mm) = cli.margin {
        settings.pdf.margins = Margins::uniform(mm);
    }
    let margins = &mut settings.pdf.margins;
    for (side, value) in [
        (&mut margins.left, cli.margin_left),
        (&mut margins.right, cli.margin_right),
        (&mut margins.top, cli.margin_top),
        (&mut margins.bottom, cli.margin_bottom),
    ] {
        if let Some(value) = value {
            *side = value;
        }
    }

    if let Some(css) = &cli.css {
        settings.css_file = Some(css.clone());
    }
    if let Some(template) = &cli.template {
        settings.html_template_file = Some(template.clone());
    }
    if let Some(dir) = &cli.asset_dir {
        settings.asset_directory = Some(dir.clone());
    }
    if let Some(renderer) = &cli.renderer {
        settings.pdf.renderer_path = Some(renderer.clone());
    }
    settings.pdf.global_options.extend(cli.global_option.iter().cloned());
    settings.pdf.page_options.extend(cli.page_option.iter().cloned());
    if let Some(secs) = cli.timeout {
        settings.pdf.timeout = Duration::from_secs(secs);
    }

    settings.pdf.enable_local_file_access |= cli.local_file_access;
    settings.markdown.pipe_tables |= cli.tables;
    settings.markdown.advanced |= cli.advanced;
    settings.debug |= cli.debug;

    Ok(settings)
}

fn report(outcome: &RenderOutcome, output: &std::path::Path) {
    if outcome.is_success() {
        println!("{} {}", "Created".green().bold(), output.display());
        return;
    }

    eprintln!("{} {outcome}", "Failed:".red().bold());
    if !outcome.output.is_empty() {
        eprintln!("{}", "Renderer output:".yellow());
        for line in outcome.output.lines() {
            eprintln!("  {line}");
        }
    }
}
