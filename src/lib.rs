//! `markdown-pdf`: convert markdown documents to paginated PDF.
//!
//! Markdown is rendered to HTML, wrapped in a themed page template and handed
//! to the external `wkhtmltopdf` renderer, which lays out and prints the PDF.
//!
//! # Quick start
//!
//! ```no_run
//! use markdown_pdf::{Settings, Theme};
//!
//! let settings = Settings::new().theme(Theme::Github).use_advanced_markdown_tables();
//! let outcome = markdown_pdf::markdown_to_pdf("# Hello\n\nSample text", "hello.pdf", settings)?;
//! if !outcome.is_success() {
//!     eprintln!("{outcome}\n{}", outcome.output);
//! }
//! # Ok::<(), markdown_pdf::Error>(())
//! ```

pub mod arguments;
pub mod config;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod render_html;
pub mod render_pdf;
pub mod template;
pub mod theme;
pub mod tool;

pub use config::{
    DEFAULT_TIMEOUT, Margins, MarkdownExtensions, Orientation, PageSize, PdfSettings, Settings,
    Theme,
};
pub use error::*;
pub use outcome::{RenderOutcome, RenderStatus};
pub use pipeline::Converter;
pub use render_pdf::PdfRenderer;
pub use theme::{ResolvedTheme, ThemeBundle, resolve_theme};
pub use tool::{TOOL_NAME, ToolLocator};

use std::path::PathBuf;

/// Convert inline markdown text to a PDF at `output_file`.
///
/// Input and output fields already present in `settings` are replaced.
/// Relative image references resolve against the output file's directory
/// unless `settings.asset_directory` is set.
pub fn markdown_to_pdf(
    markdown_text: impl Into<String>,
    output_file: impl Into<PathBuf>,
    settings: Settings,
) -> Result<RenderOutcome> {
    let settings = Settings {
        markdown_text: Some(markdown_text.into()),
        markdown_file: None,
        output_file: Some(output_file.into()),
        ..settings
    };
    Converter::new().run(&settings)
}

/// Convert a markdown file to a PDF at `output_file`.
///
/// A missing markdown file is reported as
/// [`RenderStatus::ValidationFailed`]. Relative image references resolve
/// against the markdown file's directory unless `settings.asset_directory` is
/// set.
pub fn markdown_file_to_pdf(
    markdown_file: impl Into<PathBuf>,
    output_file: impl Into<PathBuf>,
    settings: Settings,
) -> Result<RenderOutcome> {
    let settings = Settings {
        markdown_text: None,
        markdown_file: Some(markdown_file.into()),
        output_file: Some(output_file.into()),
        ..settings
    };
    Converter::new().run(&settings)
}
