//! Markdown to HTML fragment rendering.
//!
//! Markdown is rendered through `pulldown-cmark`. The output is a body
//! fragment with no `<html>`, `<head>`, or `<body>` wrapper; the theme
//! template supplies those.

use pulldown_cmark::{Options, Parser};

use crate::config::MarkdownExtensions;

/// Map extension flags onto `pulldown-cmark` options.
pub fn parser_options(extensions: &MarkdownExtensions) -> Options {
    let mut options = Options::empty();
    if extensions.pipe_tables {
        options.insert(Options::ENABLE_TABLES);
    }
    if extensions.advanced {
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    }
    options
}

/// Render markdown text to an HTML fragment.
///
/// Raw HTML inside the markdown passes through untouched, so the output is
/// only as safe as the input.
pub fn to_html(markdown: &str, extensions: &MarkdownExtensions) -> String {
    let parser = Parser::new_ext(markdown, parser_options(extensions));
    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "| a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn renders_headings_and_paragraphs() {
        let html = to_html("# Hello World\n\nSample text", &MarkdownExtensions::default());
        assert_eq!(html, "<h1>Hello World</h1>\n<p>Sample text</p>\n");
    }

    #[test]
    fn tables_need_an_extension() {
        let plain = to_html(TABLE, &MarkdownExtensions::default());
        assert!(!plain.contains("<table>"), "got: {plain}");

        let tables = MarkdownExtensions {
            pipe_tables: true,
            ..MarkdownExtensions::default()
        };
        let html = to_html(TABLE, &tables);
        assert!(html.contains("<table>"), "got: {html}");
        assert!(html.contains("<td>2</td>"), "got: {html}");
    }

    #[test]
    fn advanced_extensions_include_tables_and_strikethrough() {
        let advanced = MarkdownExtensions {
            advanced: true,
            ..MarkdownExtensions::default()
        };
        let html = to_html(&format!("~~gone~~\n\n{TABLE}"), &advanced);
        assert!(html.contains("<del>gone</del>"), "got: {html}");
        assert!(html.contains("<table>"), "got: {html}");
    }

    #[test]
    fn advanced_extensions_render_task_lists() {
        let advanced = MarkdownExtensions {
            advanced: true,
            ..MarkdownExtensions::default()
        };
        let html = to_html("- [x] done\n- [ ] todo\n", &advanced);
        assert!(html.contains("checked=\"\""), "got: {html}");
        assert!(html.contains("type=\"checkbox\""), "got: {html}");
    }

    #[test]
    fn relative_images_are_left_relative() {
        let html = to_html("![logo](images/logo.png)", &MarkdownExtensions::default());
        assert!(html.contains("src=\"images/logo.png\""), "got: {html}");
    }
}
