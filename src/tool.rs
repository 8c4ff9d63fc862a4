//! Renderer executable discovery.
//!
//! Search order: an explicit path from the settings, then the locator's
//! configured directories, then each entry of `PATH`. Search directories are
//! injected by the caller rather than derived from the running binary's
//! location.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::absolutize;
use crate::error::{Error, Result};

/// Name of the external renderer.
pub const TOOL_NAME: &str = "wkhtmltopdf";

/// Locates the renderer executable.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    search_dirs: Vec<PathBuf>,
    path_var: Option<OsString>,
}

impl ToolLocator {
    /// A locator that searches only the process `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `dir` before `PATH`. Directories are searched in insertion order.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Use `path` instead of the process `PATH` variable.
    pub fn with_path_var(mut self, path: impl Into<OsString>) -> Self {
        self.path_var = Some(path.into());
        self
    }

    /// Executable names tried in each directory, platform suffix first.
    pub fn executable_names() -> Vec<String> {
        let mut names = vec![format!("{TOOL_NAME}{}", env::consts::EXE_SUFFIX)];
        if !env::consts::EXE_SUFFIX.is_empty() {
            names.push(TOOL_NAME.to_string());
        }
        names
    }

    /// Resolve the executable to run.
    ///
    /// An explicit path is used as given (made absolute against
    /// `working_dir`) and only has to exist.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] naming every executable name that was tried.
    pub fn locate(&self, explicit: Option<&Path>, working_dir: &Path) -> Result<PathBuf> {
        if let Some(explicit) = explicit {
            let path = absolutize(explicit, working_dir);
            if path.is_file() {
                return Ok(path);
            }
            return Err(Error::ToolNotFound {
                tool: TOOL_NAME.to_string(),
                searched: vec![path.display().to_string()],
            });
        }

        let names = Self::executable_names();
        for dir in self.directories() {
            for name in &names {
                let candidate = absolutize(&dir, working_dir).join(name);
                if is_executable(&candidate) {
                    debug!(
                        target = "markdown_pdf::tool",
                        path = %candidate.display(),
                        "Located renderer executable"
                    );
                    return Ok(candidate);
                }
            }
        }

        Err(Error::ToolNotFound {
            tool: TOOL_NAME.to_string(),
            searched: names,
        })
    }

    fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = self.search_dirs.clone();
        let path_var = self.path_var.clone().or_else(|| env::var_os("PATH"));
        if let Some(path_var) = path_var {
            dirs.extend(env::split_paths(&path_var).filter(|p| !p.as_os_str().is_empty()));
        }
        dirs
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
