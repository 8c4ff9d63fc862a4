//! Result of one conversion run.

use std::fmt;

use serde::Serialize;

/// Terminal classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RenderStatus {
    Success,
    /// Bad or missing input; nothing was written.
    ValidationFailed,
    /// The renderer executable could not be located.
    ToolNotFound,
    /// The renderer exceeded its wall-clock budget and was killed.
    ToolTimedOut,
    /// The renderer ran but exited non-zero.
    ToolNonZeroExit,
    /// A filesystem operation or the process launch failed.
    IoFailure,
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderStatus::Success => "success",
            RenderStatus::ValidationFailed => "validation failed",
            RenderStatus::ToolNotFound => "renderer not found",
            RenderStatus::ToolTimedOut => "renderer timed out",
            RenderStatus::ToolNonZeroExit => "renderer failed",
            RenderStatus::IoFailure => "I/O failure",
        })
    }
}

/// Outcome of one run, with enough context to diagnose a failure without
/// running again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutcome {
    pub status: RenderStatus,
    /// Human-readable description of a failure.
    pub message: Option<String>,
    /// Combined stdout and stderr of the renderer, in arrival order.
    pub output: String,
    /// Renderer exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
}

impl RenderOutcome {
    pub fn success(output: String) -> Self {
        Self {
            status: RenderStatus::Success,
            message: None,
            output,
            exit_code: Some(0),
        }
    }

    pub fn failure(status: RenderStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            output: String::new(),
            exit_code: None,
        }
    }

    pub fn with_output(mut self, output: String) -> Self {
        self.output = output;
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }
}

impl fmt::Display for RenderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(code) = self.exit_code.filter(|_| !self.is_success()) {
            write!(f, " (exit code {code})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
