//! Renderer command-line construction.
//!
//! The renderer is sensitive to argument position: global options must come
//! before the `page` object, page options between the input and the output.
//! The order here is fixed and the output is a pure function of its inputs.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

use crate::config::PdfSettings;

/// Pinned page zoom. See [`build_arguments`].
pub const ZOOM: &str = "1.3";
/// Pinned renderer DPI. See [`build_arguments`].
pub const DPI: &str = "300";

/// An ordered argument vector for the renderer. Each entry is passed to the
/// process as one argument; no shell is involved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    args: Vec<OsString>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, flag: &str) -> &mut Self {
        self.args.push(flag.into());
        self
    }

    pub fn option(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.args.push(name.into());
        self.args.push(value.to_string().into());
        self
    }

    pub fn path(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.as_os_str().to_owned());
        self
    }

    /// Append caller-supplied arguments verbatim.
    pub fn verbatim<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn as_slice(&self) -> &[OsString] {
        &self.args
    }

    pub fn into_vec(self) -> Vec<OsString> {
        self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Shell-style rendering for logs. Arguments containing whitespace or quotes
/// are double-quoted.
impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"') {
                write!(f, "\"{}\"", arg.replace('"', "\\\""))?;
            } else {
                f.write_str(&arg)?;
            }
        }
        Ok(())
    }
}

/// Build the renderer argument vector.
///
/// `html_file` and `output_file` should be absolute; they are passed through
/// unchanged. Margin switches are emitted only for sides greater than zero.
pub fn build_arguments(html_file: &Path, output_file: &Path, pdf: &PdfSettings) -> Arguments {
    let mut args = Arguments::new();

    if pdf.enable_local_file_access {
        args.flag("--enable-local-file-access");
    }

    args.option("--image-dpi", pdf.image_dpi.max(1))
        .option("--image-quality", pdf.image_quality.min(100))
        .option("--page-size", pdf.page_size)
        .option("--orientation", pdf.orientation)
        .flag("--print-media-type");

    let margins = pdf.margins;
    for (switch, value) in [
        ("--margin-left", margins.left),
        ("--margin-right", margins.right),
        ("--margin-top", margins.top),
        ("--margin-bottom", margins.bottom),
    ] {
        if value > 0 {
            args.option(switch, format!("{value}mm"));
        }
    }

    // --disable-smart-shrinking fits content to the page but ruins font
    // kerning; zoom 1.3 at 300 dpi gives the same fit with correct kerning.
    args.option("--zoom", ZOOM).option("--dpi", DPI);

    args.verbatim(&pdf.global_options);

    args.flag("page").path(html_file);

    args.verbatim(&pdf.page_options);

    args.path(output_file);

    args
}
