//! Theme resolution.
//!
//! Each [`Theme`] ships as an embedded (stylesheet, template) pair. A run
//! resolves both files independently: an explicit override from [`Settings`]
//! wins, otherwise the bundled resource is extracted into the run's scratch
//! directory so the renderer can load it from disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::config::{Settings, Theme, absolutize};
use crate::error::{Error, Result};

/// The embedded resources of one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeBundle {
    pub css: &'static str,
    pub template: &'static str,
}

const DEFAULT_BUNDLE: ThemeBundle = ThemeBundle {
    css: include_str!("../assets/themes/default/Theme.css"),
    template: include_str!("../assets/themes/default/Theme.html"),
};

const GITHUB_BUNDLE: ThemeBundle = ThemeBundle {
    css: include_str!("../assets/themes/github/Theme.css"),
    template: include_str!("../assets/themes/github/Theme.html"),
};

impl Theme {
    /// The embedded stylesheet and template for this theme.
    pub fn bundle(&self) -> ThemeBundle {
        match self {
            Theme::Default => DEFAULT_BUNDLE,
            Theme::Github => GITHUB_BUNDLE,
        }
    }
}

/// Stylesheet and template paths for one run.
#[derive(Debug)]
pub struct ResolvedTheme {
    /// Absolute stylesheet path.
    pub css_file: PathBuf,
    /// Absolute template path.
    pub html_template_file: PathBuf,
    /// One [`Error::ThemeResourceMissing`] per path that does not exist.
    /// The paths above are still returned so later steps fail with a clear
    /// message.
    pub missing: Vec<Error>,
}

impl ResolvedTheme {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Clone, Copy)]
enum ResourceKind {
    Css,
    Template,
}

impl ResourceKind {
    fn file_name(self, theme: Theme) -> String {
        match self {
            ResourceKind::Css => format!("{}.Theme.css", theme.name()),
            ResourceKind::Template => format!("{}.Theme.html", theme.name()),
        }
    }

    fn contents(self, bundle: &ThemeBundle) -> &'static str {
        match self {
            ResourceKind::Css => bundle.css,
            ResourceKind::Template => bundle.template,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ResourceKind::Css => "CSS file",
            ResourceKind::Template => "Html template file",
        }
    }
}

/// Resolve the stylesheet and template for `settings`.
///
/// Relative overrides are resolved against `working_dir`. Bundled resources
/// are written into `scratch_dir`, which must be absolute.
///
/// # Errors
///
/// Returns [`Error::Io`] if a bundled resource cannot be written. Missing
/// files are not errors here; they are collected in
/// [`ResolvedTheme::missing`].
pub fn resolve_theme(
    settings: &Settings,
    scratch_dir: &Path,
    working_dir: &Path,
) -> Result<ResolvedTheme> {
    let mut missing = Vec::new();

    let css_file = resolve_resource(
        ResourceKind::Css,
        settings.css_file.as_deref(),
        settings.theme,
        scratch_dir,
        working_dir,
        &mut missing,
    )?;
    let html_template_file = resolve_resource(
        ResourceKind::Template,
        settings.html_template_file.as_deref(),
        settings.theme,
        scratch_dir,
        working_dir,
        &mut missing,
    )?;

    Ok(ResolvedTheme {
        css_file,
        html_template_file,
        missing,
    })
}

fn resolve_resource(
    kind: ResourceKind,
    explicit: Option<&Path>,
    theme: Theme,
    scratch_dir: &Path,
    working_dir: &Path,
    missing: &mut Vec<Error>,
) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => absolutize(path, working_dir),
        None => extract(kind, theme, scratch_dir)?,
    };

    if path.is_file() {
        debug!(
            target = "markdown_pdf::theme",
            theme = theme.name(),
            path = %path.display(),
            "Use {}",
            kind.label()
        );
    } else {
        error!(
            target = "markdown_pdf::theme",
            theme = theme.name(),
            path = %path.display(),
            "{} '{}' not found!",
            kind.label(),
            path.display()
        );
        missing.push(Error::ThemeResourceMissing { path: path.clone() });
    }

    Ok(path)
}

fn extract(kind: ResourceKind, theme: Theme, scratch_dir: &Path) -> Result<PathBuf> {
    let path = scratch_dir.join(kind.file_name(theme));
    fs::write(&path, kind.contents(&theme.bundle()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bundled_template_has_all_placeholders() {
        for theme in Theme::all() {
            let bundle = theme.bundle();
            for token in ["{$html}", "{$cssFile}", "{$docPath}"] {
                assert_eq!(
                    bundle.template.matches(token).count(),
                    1,
                    "{theme} template should contain {token} exactly once"
                );
            }
            assert!(!bundle.css.is_empty(), "{theme} stylesheet is empty");
        }
    }

    #[test]
    fn themes_have_distinct_bundles() {
        assert_ne!(Theme::Default.bundle(), Theme::Github.bundle());
    }

    #[test]
    fn extracts_bundled_resources_into_scratch() {
        let scratch = tempfile::tempdir().expect("scratch dir");
        let settings = Settings::new().theme(Theme::Github);

        let resolved = resolve_theme(&settings, scratch.path(), scratch.path()).expect("resolve");

        assert!(resolved.is_complete());
        assert!(resolved.css_file.starts_with(scratch.path()));
        assert!(resolved.html_template_file.starts_with(scratch.path()));
        assert_eq!(
            fs::read_to_string(&resolved.css_file).expect("css"),
            Theme::Github.bundle().css
        );
        assert_eq!(
            fs::read_to_string(&resolved.html_template_file).expect("template"),
            Theme::Github.bundle().template
        );
    }

    #[test]
    fn overrides_are_resolved_independently() {
        let scratch = tempfile::tempdir().expect("scratch dir");
        let work = tempfile::tempdir().expect("work dir");
        fs::write(work.path().join("custom.css"), "body {}").expect("write css");

        let settings = Settings::new().css_file("custom.css");
        let resolved = resolve_theme(&settings, scratch.path(), work.path()).expect("resolve");

        assert!(resolved.is_complete());
        assert_eq!(resolved.css_file, work.path().join("custom.css"));
        assert!(resolved.html_template_file.starts_with(scratch.path()));
        assert!(!scratch.path().join("Default.Theme.css").exists());
    }

    #[test]
    fn missing_override_is_reported_not_fatal() {
        let scratch = tempfile::tempdir().expect("scratch dir");
        let settings = Settings::new().html_template_file("/nonexistent/theme.html");

        let resolved = resolve_theme(&settings, scratch.path(), scratch.path()).expect("resolve");

        assert_eq!(
            resolved.html_template_file,
            PathBuf::from("/nonexistent/theme.html")
        );
        assert_eq!(resolved.missing.len(), 1);
        assert!(matches!(
            &resolved.missing[0],
            Error::ThemeResourceMissing { path } if path == Path::new("/nonexistent/theme.html")
        ));
        assert!(resolved.css_file.is_file());
    }
}
