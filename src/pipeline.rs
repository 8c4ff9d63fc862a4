//! Conversion pipeline.
//!
//! One run moves through a fixed sequence:
//!
//! 1. validate the request and clear the destination
//! 2. render markdown to an HTML fragment
//! 3. resolve the theme and compose the final page
//! 4. write the page into a per-run scratch directory
//! 5. run the renderer
//! 6. remove the scratch directory, or keep it and log it in debug mode
//!
//! A failing step skips the rest, but step 6 always runs. Environmental
//! failures come back as a [`RenderOutcome`]; caller mistakes come back as
//! [`Error`].

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::config::{Settings, absolutize};
use crate::error::{Error, Result};
use crate::outcome::{RenderOutcome, RenderStatus};
use crate::render_html;
use crate::render_pdf::PdfRenderer;
use crate::template::{compose, with_trailing_separator};
use crate::theme::{ResolvedTheme, resolve_theme};
use crate::tool::ToolLocator;

const SCRATCH_PREFIX: &str = "markdown-pdf-";
const SCRATCH_HTML: &str = "convert.html";

/// Runs conversions. Holds no per-run state, so one converter can serve
/// concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    locator: ToolLocator,
    working_dir: Option<PathBuf>,
}

impl Converter {
    /// A converter that discovers the renderer on `PATH` and resolves relative
    /// paths against the process working directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locator(mut self, locator: ToolLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Resolve relative paths against `dir` unless the settings name their
    /// own working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Run one conversion.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSettings`] when `settings` is `None`
    /// - [`Error::ConflictingInput`] when both markdown text and a markdown
    ///   file are set
    ///
    /// Everything else, including a missing output path, is reported through
    /// the returned [`RenderOutcome`] and logged.
    pub fn run<'a>(&self, settings: impl Into<Option<&'a Settings>>) -> Result<RenderOutcome> {
        let settings = settings.into().ok_or(Error::MissingSettings)?;
        if settings.markdown_text.is_some() && settings.markdown_file.is_some() {
            return Err(Error::ConflictingInput);
        }

        let outcome = match self.convert(settings) {
            Ok(outcome) | Err(outcome) => outcome,
        };

        if !outcome.is_success() {
            error!(
                target = "markdown_pdf::pipeline",
                op = "pipeline::run",
                status = ?outcome.status,
                exit_code = outcome.exit_code,
                "{}",
                outcome
            );
            if !outcome.output.is_empty() {
                error!(target = "markdown_pdf::pipeline", "{}", outcome.output);
            }
        }

        Ok(outcome)
    }

    /// The run proper. `Err` carries an early failure outcome so `?` can
    /// short-circuit; the scratch guard cleans up on every return.
    fn convert(&self, settings: &Settings) -> std::result::Result<RenderOutcome, RenderOutcome> {
        let working_dir = self.working_dir(settings)?;
        let request = validate(settings, &working_dir)?;

        match &request.source {
            Source::Text(text) => info!(
                target = "markdown_pdf::pipeline",
                "Transforming markdown text {}... to '{}'...",
                text.chars().take(20).collect::<String>(),
                request.output_file.display()
            ),
            Source::File(path) => info!(
                target = "markdown_pdf::pipeline",
                "Transforming '{}' to '{}'...",
                path.display(),
                request.output_file.display()
            ),
        }

        let markdown = match &request.source {
            Source::Text(text) => text.clone(),
            Source::File(path) => fs::read_to_string(path).map_err(|err| {
                io_failure(format!("failed to read markdown file '{}': {err}", path.display()))
            })?,
        };
        let body_html = render_html::to_html(&markdown, &settings.markdown);

        let scratch_root = settings
            .scratch_directory
            .as_deref()
            .map(|dir| absolutize(dir, &working_dir))
            .unwrap_or_else(env::temp_dir);
        let scratch = Scratch::create(&scratch_root, settings.debug)?;

        let theme = resolve_theme(settings, scratch.path(), &working_dir).map_err(|err| {
            io_failure(format!("failed to prepare theme {}: {err}", settings.theme))
        })?;
        let template = fs::read_to_string(&theme.html_template_file).map_err(|err| {
            io_failure(format!(
                "Html template file '{}' could not be read: {err}",
                theme.html_template_file.display()
            ))
        })?;

        debug!(
            target = "markdown_pdf::pipeline",
            "Use document base directory: {}",
            with_trailing_separator(&request.asset_dir)
        );
        let page = compose(&body_html, &template, &theme.css_file, &request.asset_dir);

        let html_file = scratch.path().join(SCRATCH_HTML);
        fs::write(&html_file, page).map_err(|err| {
            io_failure(format!(
                "failed to write scratch html '{}': {err}",
                html_file.display()
            ))
        })?;

        let renderer = PdfRenderer::new(self.locator.clone(), &working_dir);
        let outcome = renderer.invoke(&html_file, &request.output_file, &settings.pdf);
        Ok(note_missing_resources(outcome, &theme))
    }

    fn working_dir(&self, settings: &Settings) -> std::result::Result<PathBuf, RenderOutcome> {
        let configured = settings.working_directory.as_deref().or(self.working_dir.as_deref());
        resolve_working_dir(configured)
            .map_err(|err| io_failure(format!("failed to read working directory: {err}")))
    }
}

/// The configured working directory, made absolute against the process
/// working directory. Every path handed to the renderer derives from it.
fn resolve_working_dir(configured: Option<&Path>) -> io::Result<PathBuf> {
    match configured {
        Some(dir) if dir.is_absolute() => Ok(dir.to_path_buf()),
        Some(dir) => Ok(env::current_dir()?.join(dir)),
        None => env::current_dir(),
    }
}

/// Name missing theme files in a failed outcome; they are the likely cause.
fn note_missing_resources(mut outcome: RenderOutcome, theme: &ResolvedTheme) -> RenderOutcome {
    if outcome.is_success() || theme.is_complete() {
        return outcome;
    }

    let missing = theme
        .missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    outcome.message = Some(match outcome.message.take() {
        Some(message) => format!("{message} ({missing})"),
        None => missing,
    });
    outcome
}

enum Source {
    Text(String),
    File(PathBuf),
}

/// A validated request with every path resolved.
struct Request {
    source: Source,
    output_file: PathBuf,
    asset_dir: PathBuf,
}

/// Check the request shape and clear the destination. Nothing is written
/// unless every check passes.
fn validate(settings: &Settings, working_dir: &Path) -> std::result::Result<Request, RenderOutcome> {
    let output_file = match settings.output_file.as_deref() {
        Some(path) if !path.as_os_str().is_empty() => absolutize(path, working_dir),
        _ => {
            return Err(validation_failed(
                "No output file given. Please set the output file in the settings!",
            ));
        }
    };

    let source = match (&settings.markdown_text, &settings.markdown_file) {
        (Some(text), None) => Source::Text(text.clone()),
        (None, Some(path)) => {
            let path = absolutize(path, working_dir);
            if !path.is_file() {
                return Err(validation_failed(format!(
                    "Markdown file '{}' does not exist!",
                    path.display()
                )));
            }
            Source::File(path)
        }
        _ => {
            return Err(validation_failed(
                "No markdown input given. Please set either the markdown text or the markdown file!",
            ));
        }
    };

    let asset_dir = match (&settings.asset_directory, &source) {
        (Some(dir), _) => absolutize(dir, working_dir),
        (None, Source::File(path)) => parent_or(path, working_dir),
        (None, Source::Text(_)) => parent_or(&output_file, working_dir),
    };

    if output_file.exists() {
        if let Err(err) = fs::remove_file(&output_file) {
            debug!(
                target = "markdown_pdf::pipeline",
                path = %output_file.display(),
                error = %err,
                "Existing output file could not be removed"
            );
            return Err(validation_failed(format!(
                "Please close the output file first: {}",
                output_file.display()
            )));
        }
    }

    Ok(Request {
        source,
        output_file,
        asset_dir,
    })
}

fn parent_or(path: &Path, fallback: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf())
}

fn validation_failed(message: impl Into<String>) -> RenderOutcome {
    RenderOutcome::failure(RenderStatus::ValidationFailed, message)
}

fn io_failure(message: impl Into<String>) -> RenderOutcome {
    RenderOutcome::failure(RenderStatus::IoFailure, message)
}

/// Per-run scratch directory. Removed on drop unless `debug` is set, in which
/// case it is kept and its contents are logged.
struct Scratch {
    dir: Option<TempDir>,
    path: PathBuf,
    debug: bool,
}

impl Scratch {
    fn create(root: &Path, debug: bool) -> std::result::Result<Self, RenderOutcome> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .map_err(|err| {
                io_failure(format!(
                    "failed to create scratch directory in '{}': {err}",
                    root.display()
                ))
            })?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
            debug,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        if self.debug {
            let path = dir.keep();
            let mut files: Vec<PathBuf> = fs::read_dir(&path)
                .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
                .unwrap_or_default();
            files.sort();
            for file in files {
                if file.file_name().is_some_and(|n| n == SCRATCH_HTML) {
                    info!(
                        target = "markdown_pdf::pipeline",
                        "Html file written to '{}'",
                        file.display()
                    );
                } else {
                    info!(
                        target = "markdown_pdf::pipeline",
                        "Scratch file kept at '{}'",
                        file.display()
                    );
                }
            }
            return;
        }

        if let Err(err) = dir.close() {
            warn!(
                target = "markdown_pdf::pipeline",
                path = %self.path.display(),
                error = %err,
                "Failed to remove scratch directory"
            );
        }
    }
}
