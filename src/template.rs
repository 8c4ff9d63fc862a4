//! HTML template composition.
//!
//! Theme templates carry three placeholders: `{$html}` for the rendered
//! markdown, `{$cssFile}` for the stylesheet path and `{$docPath}` for the
//! asset base directory.
//!
//! # Usage
//!
//! ```
//! use markdown_pdf::template::compose;
//! use std::path::Path;
//!
//! let template = r#"<link href="{$cssFile}"><base href="{$docPath}">{$html}"#;
//! let html = compose("<p>Hi</p>", template, Path::new("/t/a.css"), Path::new("/docs"));
//! assert_eq!(html, r#"<link href="/t/a.css"><base href="/docs/"><p>Hi</p>"#);
//! ```
//!
//! Substituted values are inserted verbatim; no escaping is applied beyond
//! what the markdown renderer produced. Values are never rescanned, so a
//! document that mentions `{$cssFile}` keeps it literally. Templates must not
//! use the tokens for anything but substitution.

use std::path::{MAIN_SEPARATOR, Path};

pub const HTML_TOKEN: &str = "{$html}";
pub const CSS_FILE_TOKEN: &str = "{$cssFile}";
pub const DOC_PATH_TOKEN: &str = "{$docPath}";

/// Substitute the three template placeholders in one pass.
pub fn compose(body_html: &str, template: &str, css_file: &Path, asset_dir: &Path) -> String {
    let css_file = css_file.to_string_lossy();
    let doc_path = with_trailing_separator(asset_dir);

    let mut result = String::with_capacity(template.len() + body_html.len());
    let mut rest = template;

    while let Some(start_pos) = rest.find("{$") {
        result.push_str(&rest[..start_pos]);
        let candidate = &rest[start_pos..];

        let (value, token_len) = if candidate.starts_with(HTML_TOKEN) {
            (body_html, HTML_TOKEN.len())
        } else if candidate.starts_with(CSS_FILE_TOKEN) {
            (&*css_file, CSS_FILE_TOKEN.len())
        } else if candidate.starts_with(DOC_PATH_TOKEN) {
            (doc_path.as_str(), DOC_PATH_TOKEN.len())
        } else {
            // Unknown placeholder, copied through as text
            ("{$", 2)
        };

        result.push_str(value);
        rest = &candidate[token_len..];
    }

    result.push_str(rest);
    result
}

/// Render `dir` as a string ending in the platform path separator.
pub fn with_trailing_separator(dir: &Path) -> String {
    let mut path = dir.to_string_lossy().into_owned();
    if !path.ends_with(MAIN_SEPARATOR) {
        path.push(MAIN_SEPARATOR);
    }
    path
}
