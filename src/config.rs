//! Conversion settings.
//!
//! [`Settings`] carries everything a single conversion needs: the request
//! itself (input text or file, output file), page geometry handed to the
//! renderer, theme selection and file overrides, and markdown extension flags.
//! Settings are plain data; the converter validates them at run time.
//!
//! # Example
//!
//! ```
//! use markdown_pdf::{Margins, Orientation, Settings, Theme};
//!
//! let settings = Settings::new()
//!     .markdown_text("# Release notes")
//!     .output_file("out/notes.pdf")
//!     .theme(Theme::Github)
//!     .orientation(Orientation::Landscape)
//!     .margins(Margins::uniform(15));
//!
//! assert_eq!(settings.pdf.margins.top, 15);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hard wall-clock budget for one renderer run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Paper sizes understood by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    #[serde(alias = "letter")]
    Letter,
    #[default]
    #[serde(alias = "a4")]
    A4,
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageSize::Letter => "Letter",
            PageSize::A4 => "A4",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    #[serde(alias = "portrait")]
    Portrait,
    #[serde(alias = "landscape")]
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        })
    }
}

/// Page margins in millimeters. A zero side leaves the renderer default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Margins {
    /// Same margin on all four sides.
    pub fn uniform(mm: u32) -> Self {
        Self {
            left: mm,
            right: mm,
            top: mm,
            bottom: mm,
        }
    }
}

/// Built-in document themes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    #[serde(alias = "default")]
    Default,
    #[serde(alias = "github")]
    Github,
}

impl Theme {
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Default => "Default",
            Theme::Github => "Github",
        }
    }

    pub fn all() -> &'static [Theme] {
        &[Theme::Default, Theme::Github]
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Markdown extensions enabled for the markdown-to-HTML step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownExtensions {
    /// GitHub-style pipe tables.
    pub pipe_tables: bool,
    /// Tables, footnotes, strikethrough, task lists, smart punctuation and
    /// heading attributes.
    pub advanced: bool,
}

/// Settings handed to the external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub image_dpi: u32,
    /// JPEG quality, 0 to 100.
    pub image_quality: u8,
    pub margins: Margins,
    /// Explicit renderer executable. Skips discovery when set.
    pub renderer_path: Option<PathBuf>,
    /// Extra options placed before the input page.
    pub global_options: Vec<String>,
    /// Extra options placed after the input page.
    pub page_options: Vec<String>,
    /// Prepends `--enable-local-file-access`, which renderer builds from 0.12.6
    /// on require before they load local stylesheets and images.
    pub enable_local_file_access: bool,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            image_dpi: 300,
            image_quality: 100,
            margins: Margins::default(),
            renderer_path: None,
            global_options: Vec::new(),
            page_options: Vec::new(),
            enable_local_file_access: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything one conversion needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inline markdown source. Mutually exclusive with `markdown_file`.
    pub markdown_text: Option<String>,
    /// Markdown source file. Mutually exclusive with `markdown_text`.
    pub markdown_file: Option<PathBuf>,
    /// Destination PDF.
    pub output_file: Option<PathBuf>,
    pub theme: Theme,
    /// Stylesheet override. Takes precedence over the theme's stylesheet.
    pub css_file: Option<PathBuf>,
    /// HTML template override. Takes precedence over the theme's template.
    pub html_template_file: Option<PathBuf>,
    /// Base directory for relative images and links in the markdown.
    /// Defaults to the markdown file's directory, or the output file's
    /// directory for inline text.
    pub asset_directory: Option<PathBuf>,
    /// Directory relative paths are resolved against. Defaults to the
    /// process working directory.
    pub working_directory: Option<PathBuf>,
    /// Parent of the per-run scratch directory. Defaults to the system temp
    /// directory.
    pub scratch_directory: Option<PathBuf>,
    /// Keep scratch files and log their paths instead of deleting them.
    pub debug: bool,
    pub markdown: MarkdownExtensions,
    pub pdf: PdfSettings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a `.toml`, `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let invalid = |message: String| Error::InvalidSettings {
            path: path.to_path_buf(),
            message,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| invalid(e.to_string())),
            Some("json") => serde_json::from_str(&contents).map_err(|e| invalid(e.to_string())),
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&contents).map_err(|e| invalid(e.to_string()))
            }
            other => Err(invalid(format!(
                "unsupported settings format {:?}; expected toml, json or yaml",
                other.unwrap_or("")
            ))),
        }
    }

    // -- Request ----------------------------------------------------------

    pub fn markdown_text(mut self, text: impl Into<String>) -> Self {
        self.markdown_text = Some(text.into());
        self
    }

    pub fn markdown_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.markdown_file = Some(path.into());
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    // -- Theme ------------------------------------------------------------

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn css_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.css_file = Some(path.into());
        self
    }

    pub fn html_template_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_template_file = Some(path.into());
        self
    }

    pub fn asset_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.asset_directory = Some(path.into());
        self
    }

    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    pub fn scratch_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_directory = Some(path.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    // -- Markdown ---------------------------------------------------------

    pub fn use_advanced_markdown_tables(mut self) -> Self {
        self.markdown.pipe_tables = true;
        self
    }

    pub fn use_advanced_markdown_extensions(mut self) -> Self {
        self.markdown.advanced = true;
        self
    }

    // -- Renderer ---------------------------------------------------------

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.pdf.page_size = size;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.pdf.orientation = orientation;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.pdf.margins = margins;
        self
    }

    /// Image resolution; values below 1 are raised to 1.
    pub fn image_dpi(mut self, dpi: u32) -> Self {
        self.pdf.image_dpi = dpi.max(1);
        self
    }

    /// Image quality; values above 100 are capped at 100.
    pub fn image_quality(mut self, quality: u8) -> Self {
        self.pdf.image_quality = quality.min(100);
        self
    }

    pub fn renderer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdf.renderer_path = Some(path.into());
        self
    }

    pub fn global_option(mut self, option: impl Into<String>) -> Self {
        self.pdf.global_options.push(option.into());
        self
    }

    pub fn page_option(mut self, option: impl Into<String>) -> Self {
        self.pdf.page_options.push(option.into());
        self
    }

    pub fn enable_local_file_access(mut self, enable: bool) -> Self {
        self.pdf.enable_local_file_access = enable;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.pdf.timeout = timeout;
        self
    }
}

/// Joins `path` onto `base` unless it is already absolute.
pub(crate) fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Serializes a `Duration` as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
